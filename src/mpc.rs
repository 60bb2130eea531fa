//! The gate-level MPC driver shared by every cipher backend.
//!
//! A circuit is evaluated twice per repetition. The *aux pass* only works on
//! masks: for each AND gate it computes the correction that makes the XOR of
//! all helper bits equal the product of the input masks, and stores it on the
//! tape of the last party. The *online pass* evaluates the circuit on masked
//! values, every party broadcasting one share per AND gate.
use thiserror::Error;

use crate::{
    cipher::CipherOracle,
    params::Params,
    tape::RandomTapes,
    utils::{extend, get_bit, parity, set_bit},
};

/// Errors of the online simulation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The simulated circuit does not map the key to the public key.
    #[error("the simulated output does not match the public key")]
    OutputMismatch,
    /// An input does not have the size required by the cipher.
    #[error("{name} has {actual} bytes, expected {expected}")]
    InvalidInput {
        /// Which input.
        name: &'static str,
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },
}

/// The broadcast messages of all parties of one repetition.
///
/// During verification one party is hidden: its messages are taken from the
/// proof instead of being computed.
#[derive(Debug, Clone)]
pub struct Msgs {
    msgs: Vec<Vec<u8>>,
    pos: usize,
    hidden: Option<usize>,
}

impl Msgs {
    pub(crate) fn new(params: &Params) -> Self {
        Self {
            msgs: vec![vec![0; params.msgs_size()]; params.parties()],
            pos: 0,
            hidden: None,
        }
    }

    /// Messages where `hidden` broadcasts `hidden_msgs`.
    pub(crate) fn with_hidden(params: &Params, hidden: usize, hidden_msgs: &[u8]) -> Self {
        let mut msgs = Self::new(params);
        msgs.msgs[hidden].copy_from_slice(hidden_msgs);
        msgs.hidden = Some(hidden);
        msgs
    }

    /// Broadcasts one share per party and returns the shares as seen by everyone.
    ///
    /// The share of the hidden party is replaced by the one it broadcast.
    ///
    /// # Panics
    ///
    /// Panics if more bits are broadcast than fit into the messages.
    pub fn broadcast(&mut self, word: u64) -> u64 {
        let word = match self.hidden {
            Some(hidden) => {
                let bit = get_bit(&self.msgs[hidden], self.pos) as u64;
                (word & !(1 << hidden)) | bit << hidden
            }
            None => word,
        };
        for (party, msg) in self.msgs.iter_mut().enumerate() {
            set_bit(msg, self.pos, (word >> party) & 1 == 1);
        }
        self.pos += 1;
        word
    }

    /// Number of bits broadcast so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The party whose messages are taken from a proof, if any.
    pub fn hidden(&self) -> Option<usize> {
        self.hidden
    }

    pub(crate) fn party(&self, party: usize) -> &[u8] {
        &self.msgs[party]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.msgs.iter().map(Vec::as_slice)
    }
}

/// Result of an AND gate in the online pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndOutput {
    /// The masked output value.
    pub masked: bool,
    /// The sharing of the output mask.
    pub mask: u64,
}

/// Computes the aux bit of the next AND gate, whose input masks are `mask_a` and `mask_b`.
///
/// Reads the output mask and the helper bits from the tapes and overwrites the
/// helper bit of the last party, so that the helper bits of all parties are a
/// sharing of `mask_a & mask_b`. Returns the output mask.
pub fn aux_and(mask_a: bool, mask_b: bool, tapes: &mut RandomTapes) -> bool {
    let last = tapes.parties() - 1;
    let fresh = tapes.read_word();
    let helper = tapes.read_word() & !(1 << last);
    let aux = (mask_a & mask_b) ^ parity(helper);
    tapes.set_bit(last, tapes.position() - 1, aux);
    parity(fresh)
}

/// Evaluates the next AND gate on the masked inputs `a` and `b`.
///
/// Each party computes its share of `(a ^ λa)(b ^ λb) ^ λout` from its shares of
/// the input masks, its helper bit and its share of the fresh output mask, and
/// broadcasts it.
pub fn online_and(
    a: bool,
    b: bool,
    mask_a: u64,
    mask_b: u64,
    tapes: &mut RandomTapes,
    msgs: &mut Msgs,
) -> AndOutput {
    let fresh = tapes.read_word();
    let helper = tapes.read_word();
    let shares = (extend(a) & mask_b) ^ (extend(b) & mask_a) ^ helper ^ fresh;
    let shares = msgs.broadcast(shares);
    AndOutput {
        masked: parity(shares) ^ (a & b),
        mask: fresh,
    }
}

/// Runs the aux pass on freshly derived tapes and rewinds them.
pub(crate) fn compute_aux_tape(
    cipher: &dyn CipherOracle,
    tapes: &mut RandomTapes,
) -> Result<(), SimulationError> {
    let state_bits = cipher.shape().state_bits;
    let key_mask = tapes.read_shares(state_bits).reconstruct();
    cipher.compute_aux(&key_mask, tapes)?;
    tapes.rewind();
    Ok(())
}

/// Tape position of the aux bit of AND gate `gate`.
fn aux_position(params: &Params, gate: usize) -> usize {
    params.lowmc().state_bits + 2 * gate + 1
}

/// Collects the aux bits from the tape of the last party.
pub(crate) fn aux_bits(tapes: &RandomTapes, params: &Params) -> Vec<u8> {
    let tape = tapes.tape(params.last_party());
    let mut aux = vec![0; params.view_size()];
    for gate in 0..params.lowmc().and_gates() {
        set_bit(&mut aux, gate, get_bit(tape, aux_position(params, gate)));
    }
    aux
}

/// Writes aux bits into the tape of the last party.
pub(crate) fn set_aux_bits(tapes: &mut RandomTapes, aux: &[u8], params: &Params) {
    let last = params.last_party();
    for gate in 0..params.lowmc().and_gates() {
        tapes.set_bit(last, aux_position(params, gate), get_bit(aux, gate));
    }
}
