//! Per-party random tapes, read in lockstep one bit per party.
use crate::{
    hash::{HashContext, HashContextX4},
    params::{Params, Salt},
    utils::{get_bit, parity, set_bit},
};

/// Bit sharings of a sequence of wires, one word per wire.
///
/// Bit `j` of a word is the share of party `j`; the shared value is the parity of the word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shares(Vec<u64>);

impl Shares {
    /// One word per wire.
    pub fn words(&self) -> &[u64] {
        &self.0
    }

    /// Number of wires.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no wires.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The shared values, packed into bytes in the usual bit order.
    pub fn reconstruct(&self) -> Vec<u8> {
        let mut out = vec![0; self.0.len().div_ceil(8)];
        for (i, &word) in self.0.iter().enumerate() {
            set_bit(&mut out, i, parity(word));
        }
        out
    }
}

/// The random tapes of all parties of one repetition, with a shared read cursor.
///
/// Each tape is laid out as the `n` key mask bits followed by a pair of bits per
/// AND gate: the mask of the gate output, then the helper bit that the last
/// party overwrites with the aux bit.
#[derive(Debug, Clone)]
pub struct RandomTapes {
    tapes: Vec<Vec<u8>>,
    pos: usize,
}

impl RandomTapes {
    /// Derives the tapes as `H(seed || salt || repetition || party)`.
    ///
    /// Parties without a seed (the hidden party during verification) get an
    /// all-zero tape.
    pub(crate) fn new(
        seeds: &[Option<&[u8]>],
        salt: &Salt,
        repetition: usize,
        params: &Params,
    ) -> Self {
        let tape_size = params.tape_size();
        let mut tapes = vec![vec![0; tape_size]; seeds.len()];
        let repetition = repetition as u16;
        for (batch, (seeds, tapes)) in seeds.chunks(4).zip(tapes.chunks_mut(4)).enumerate() {
            if let ([s0, s1, s2, s3], [t0, t1, t2, t3]) = (seeds, &mut *tapes) {
                let first = (4 * batch) as u16;
                let mut ctx = HashContextX4::new();
                ctx.update([
                    s0.unwrap_or_default(),
                    s1.unwrap_or_default(),
                    s2.unwrap_or_default(),
                    s3.unwrap_or_default(),
                ])
                .update_all(salt)
                .update_u16([repetition; 4])
                .update_u16([first, first + 1, first + 2, first + 3]);
                ctx.squeeze([&mut t0[..], &mut t1[..], &mut t2[..], &mut t3[..]]);
            } else {
                // only reachable for party counts that are not a multiple of 4
                for (j, (seed, tape)) in seeds.iter().zip(tapes.iter_mut()).enumerate() {
                    let mut ctx = HashContext::new();
                    ctx.update(seed.unwrap_or_default())
                        .update(salt)
                        .update_u16(repetition)
                        .update_u16((4 * batch + j) as u16);
                    ctx.squeeze(tape);
                }
            }
        }
        let mut tapes = Self { tapes, pos: 0 };
        for (party, seed) in seeds.iter().enumerate() {
            if seed.is_none() {
                tapes.clear_party(party);
            }
        }
        tapes
    }

    #[cfg(test)]
    pub(crate) fn from_tapes(tapes: Vec<Vec<u8>>) -> Self {
        Self { tapes, pos: 0 }
    }

    /// Number of parties.
    pub fn parties(&self) -> usize {
        self.tapes.len()
    }

    /// Current position of the read cursor, in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reads the next bit of every tape.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is past the end of the tapes.
    pub fn read_word(&mut self) -> u64 {
        let pos = self.pos;
        self.pos += 1;
        self.tapes
            .iter()
            .enumerate()
            .fold(0, |word, (party, tape)| word | (get_bit(tape, pos) as u64) << party)
    }

    /// Reads the sharings of the next `count` wires.
    pub fn read_shares(&mut self, count: usize) -> Shares {
        Shares((0..count).map(|_| self.read_word()).collect())
    }

    /// Overwrites bit `pos` of the tape of `party`.
    pub fn set_bit(&mut self, party: usize, pos: usize, bit: bool) {
        set_bit(&mut self.tapes[party], pos, bit);
    }

    /// Moves the read cursor back to the start.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub(crate) fn clear_party(&mut self, party: usize) {
        self.tapes[party].fill(0);
    }

    pub(crate) fn tape(&self, party: usize) -> &[u8] {
        &self.tapes[party]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;

    #[test]
    fn words_pack_one_bit_per_party() {
        let mut tapes = RandomTapes::from_tapes(vec![
            vec![0b1000_0000],
            vec![0b1100_0000],
            vec![0b0100_0000],
            vec![0b0000_0000],
        ]);
        assert_eq!(0b0011, tapes.read_word());
        assert_eq!(0b0110, tapes.read_word());
        assert_eq!(2, tapes.position());
        tapes.rewind();
        let shares = tapes.read_shares(3);
        assert_eq!(&[0b0011, 0b0110, 0], shares.words());
        assert_eq!(vec![0b0000_0000], shares.reconstruct());
    }

    #[test]
    fn batched_tapes_match_single_hashes() {
        let params = ParameterSet::L1.params();
        let seeds: Vec<Vec<u8>> = (0..16).map(|i| vec![i; 16]).collect();
        let seeds: Vec<Option<&[u8]>> = seeds.iter().map(|s| Some(s.as_slice())).collect();
        let salt = [5; 32];
        let tapes = RandomTapes::new(&seeds, &salt, 9, &params);
        for (j, seed) in seeds.iter().enumerate() {
            let mut ctx = HashContext::new();
            ctx.update(seed.unwrap())
                .update(&salt)
                .update_u16(9)
                .update_u16(j as u16);
            assert_eq!(ctx.finalize(params.tape_size()), tapes.tape(j));
        }
    }

    #[test]
    fn hidden_party_has_zero_tape() {
        let params = ParameterSet::L1.params();
        let seed = [1; 16];
        let mut seeds: Vec<Option<&[u8]>> = vec![Some(&seed[..]); 16];
        seeds[6] = None;
        let tapes = RandomTapes::new(&seeds, &[0; 32], 0, &params);
        assert!(tapes.tape(6).iter().all(|&b| b == 0));
        assert!(tapes.tape(5).iter().any(|&b| b != 0));
    }
}
