//! LowMC with a full S-box layer, evaluated in the clear and inside the MPC simulation.
//!
//! The round matrices and constants are derived from the instance shape with
//! the BLAKE3 XOF, resampling each matrix until it is invertible.

mod gf2;

use gf2::{Gf2Matrix, Gf2Vector};
use tracing::debug;

use crate::{
    cipher::{CipherOracle, OnlineInput},
    mpc::{Msgs, SimulationError, aux_and, online_and},
    params::{LowMcShape, ParamsError},
    tape::{RandomTapes, Shares},
    utils::{parity, set_bit},
};

const DERIVATION_CONTEXT: &str = "picnic-kkw 2026-01-01 LowMC round constants";

#[derive(Debug, Clone)]
struct Round {
    linear: Gf2Matrix,
    key: Gf2Matrix,
    constant: Gf2Vector,
}

/// A LowMC instance.
///
/// Encryption computes `s = p ^ K0(k)` and then, for every round, applies the
/// S-box layer, the linear layer, the round constant and the round key.
#[derive(Debug, Clone)]
pub struct LowMc {
    shape: LowMcShape,
    key0: Gf2Matrix,
    rounds: Vec<Round>,
}

impl LowMc {
    /// Validates `shape` and derives its instance.
    pub fn new(shape: LowMcShape) -> Result<Self, ParamsError> {
        shape.validate()?;
        Ok(Self::derive(shape))
    }

    /// Derives the instance for an already validated shape.
    pub(crate) fn derive(shape: LowMcShape) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(DERIVATION_CONTEXT);
        hasher.update(&(shape.state_bits as u32).to_le_bytes());
        hasher.update(&(shape.sboxes as u32).to_le_bytes());
        hasher.update(&(shape.rounds as u32).to_le_bytes());
        let mut xof = hasher.finalize_xof();

        let n = shape.state_bits;
        let key0 = invertible_matrix(&mut xof, n);
        let rounds = (0..shape.rounds)
            .map(|_| Round {
                linear: invertible_matrix(&mut xof, n),
                key: invertible_matrix(&mut xof, n),
                constant: random_vector(&mut xof, n),
            })
            .collect();
        debug!(?shape, "derived LowMC instance");
        Self {
            shape,
            key0,
            rounds,
        }
    }

    fn sbox_layer(&self, state: &mut Gf2Vector) {
        for sbox in 0..self.shape.sboxes {
            let (ia, ib, ic) = (3 * sbox, 3 * sbox + 1, 3 * sbox + 2);
            let (a, b, c) = (state.get(ia), state.get(ib), state.get(ic));
            state.set(ia, a ^ (b & c));
            state.set(ib, a ^ b ^ (c & a));
            state.set(ic, a ^ b ^ c ^ (a & b));
        }
    }

    fn sbox_layer_aux(&self, masks: &mut Gf2Vector, tapes: &mut RandomTapes) {
        for sbox in 0..self.shape.sboxes {
            let (ia, ib, ic) = (3 * sbox, 3 * sbox + 1, 3 * sbox + 2);
            let (a, b, c) = (masks.get(ia), masks.get(ib), masks.get(ic));
            let ab = aux_and(a, b, tapes);
            let bc = aux_and(b, c, tapes);
            let ca = aux_and(c, a, tapes);
            masks.set(ia, a ^ bc);
            masks.set(ib, a ^ b ^ ca);
            masks.set(ic, a ^ b ^ c ^ ab);
        }
    }

    fn sbox_layer_online(
        &self,
        state: &mut Gf2Vector,
        masks: &mut [Gf2Vector],
        tapes: &mut RandomTapes,
        msgs: &mut Msgs,
    ) {
        for sbox in 0..self.shape.sboxes {
            let (ia, ib, ic) = (3 * sbox, 3 * sbox + 1, 3 * sbox + 2);
            let (a, b, c) = (state.get(ia), state.get(ib), state.get(ic));
            let (ma, mb, mc) = (gather(masks, ia), gather(masks, ib), gather(masks, ic));
            let ab = online_and(a, b, ma, mb, tapes, msgs);
            let bc = online_and(b, c, mb, mc, tapes, msgs);
            let ca = online_and(c, a, mc, ma, tapes, msgs);
            state.set(ia, a ^ bc.masked);
            state.set(ib, a ^ b ^ ca.masked);
            state.set(ic, a ^ b ^ c ^ ab.masked);
            scatter(masks, ia, ma ^ bc.mask);
            scatter(masks, ib, ma ^ mb ^ ca.mask);
            scatter(masks, ic, ma ^ mb ^ mc ^ ab.mask);
        }
    }
}

impl CipherOracle for LowMc {
    fn shape(&self) -> LowMcShape {
        self.shape
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SimulationError> {
        let n = self.shape.state_bits;
        check_size("key", key.len(), n / 8)?;
        check_size("plaintext", plaintext.len(), n / 8)?;
        let key = Gf2Vector::from_bytes(key, n);
        let mut state = Gf2Vector::from_bytes(plaintext, n) ^ self.key0.mul(&key);
        for round in &self.rounds {
            self.sbox_layer(&mut state);
            state = round.linear.mul(&state) ^ round.constant ^ round.key.mul(&key);
        }
        Ok(state.to_bytes(n))
    }

    fn compute_aux(&self, key_mask: &[u8], tapes: &mut RandomTapes) -> Result<(), SimulationError> {
        let n = self.shape.state_bits;
        check_size("key mask", key_mask.len(), n / 8)?;
        let key = Gf2Vector::from_bytes(key_mask, n);
        let mut masks = self.key0.mul(&key);
        for round in &self.rounds {
            self.sbox_layer_aux(&mut masks, tapes);
            masks = round.linear.mul(&masks) ^ round.key.mul(&key);
        }
        Ok(())
    }

    fn simulate_online(
        &self,
        input: OnlineInput<'_>,
        tapes: &mut RandomTapes,
        msgs: &mut Msgs,
    ) -> Result<(), SimulationError> {
        let n = self.shape.state_bits;
        check_size("masked key", input.masked_key.len(), n / 8)?;
        check_size("plaintext", input.plaintext.len(), n / 8)?;
        check_size("ciphertext", input.ciphertext.len(), n / 8)?;
        check_size("key mask", input.key_mask.len(), n)?;

        let masked_key = Gf2Vector::from_bytes(input.masked_key, n);
        let key_masks = party_vectors(input.key_mask, tapes.parties());
        let mut state = Gf2Vector::from_bytes(input.plaintext, n) ^ self.key0.mul(&masked_key);
        let mut masks: Vec<Gf2Vector> = key_masks.iter().map(|k| self.key0.mul(k)).collect();
        for round in &self.rounds {
            self.sbox_layer_online(&mut state, &mut masks, tapes, msgs);
            state = round.linear.mul(&state) ^ round.constant ^ round.key.mul(&masked_key);
            for (mask, key_mask) in masks.iter_mut().zip(&key_masks) {
                *mask = round.linear.mul(mask) ^ round.key.mul(key_mask);
            }
        }

        let mut output = vec![0; n / 8];
        for i in 0..n {
            let shares = msgs.broadcast(gather(&masks, i));
            set_bit(&mut output, i, state.get(i) ^ parity(shares));
        }
        if output != input.ciphertext {
            return Err(SimulationError::OutputMismatch);
        }
        Ok(())
    }
}

fn check_size(name: &'static str, actual: usize, expected: usize) -> Result<(), SimulationError> {
    if actual != expected {
        return Err(SimulationError::InvalidInput {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Splits word-wise sharings into one mask vector per party.
fn party_vectors(shares: &Shares, parties: usize) -> Vec<Gf2Vector> {
    (0..parties)
        .map(|party| {
            let mut v = Gf2Vector::ZERO;
            for (i, &word) in shares.words().iter().enumerate() {
                v.set(i, (word >> party) & 1 == 1);
            }
            v
        })
        .collect()
}

/// Packs the shares of wire `i` into a word.
fn gather(masks: &[Gf2Vector], i: usize) -> u64 {
    masks
        .iter()
        .enumerate()
        .fold(0, |word, (party, mask)| word | (mask.get(i) as u64) << party)
}

fn scatter(masks: &mut [Gf2Vector], i: usize, word: u64) {
    for (party, mask) in masks.iter_mut().enumerate() {
        mask.set(i, (word >> party) & 1 == 1);
    }
}

fn random_vector(xof: &mut blake3::OutputReader, bits: usize) -> Gf2Vector {
    let mut bytes = [0; 32];
    xof.fill(&mut bytes);
    let words: [u64; 4] = bytemuck::cast(bytes);
    let mut v = Gf2Vector::from_words(words.map(u64::from_le));
    v.truncate(bits);
    v
}

fn invertible_matrix(xof: &mut blake3::OutputReader, n: usize) -> Gf2Matrix {
    loop {
        let m = Gf2Matrix::from_rows((0..n).map(|_| random_vector(xof, n)).collect());
        if m.is_invertible() {
            return m;
        }
    }
}
