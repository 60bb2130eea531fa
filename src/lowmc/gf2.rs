//! Vectors and matrices over GF(2) with up to 256 columns.
use std::ops::{BitXor, BitXorAssign};

use wide::u64x4;

use crate::utils::{get_bit, set_bit};

/// A bit vector of at most 256 bits. Bit `i` lives in word `i / 64` at position `i % 64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Gf2Vector([u64; 4]);

impl Gf2Vector {
    pub(crate) const ZERO: Self = Self([0; 4]);

    pub(crate) fn from_words(words: [u64; 4]) -> Self {
        Self(words)
    }

    /// Reads the first `bits` bits of a byte string.
    pub(crate) fn from_bytes(bytes: &[u8], bits: usize) -> Self {
        let mut v = Self::ZERO;
        for i in 0..bits {
            if get_bit(bytes, i) {
                v.set(i, true);
            }
        }
        v
    }

    pub(crate) fn to_bytes(self, bits: usize) -> Vec<u8> {
        let mut out = vec![0; bits.div_ceil(8)];
        for i in 0..bits {
            set_bit(&mut out, i, self.get(i));
        }
        out
    }

    pub(crate) fn words(&self) -> &[u64; 4] {
        &self.0
    }

    fn words_mut(&mut self) -> &mut [u64; 4] {
        &mut self.0
    }

    fn simd(self) -> u64x4 {
        bytemuck::cast(self.0)
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> bool {
        (self.words()[i / 64] >> (i % 64)) & 1 == 1
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, bit: bool) {
        let word = &mut self.words_mut()[i / 64];
        *word = (*word & !(1 << (i % 64))) | (bit as u64) << (i % 64);
    }

    /// Clears all bits at positions `>= bits`.
    pub(crate) fn truncate(&mut self, bits: usize) {
        for (w, word) in self.words_mut().iter_mut().enumerate() {
            let start = w * 64;
            if bits <= start {
                *word = 0;
            } else if bits < start + 64 {
                *word &= (1 << (bits - start)) - 1;
            }
        }
    }
}

impl BitXor for Gf2Vector {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(bytemuck::cast(self.simd() ^ rhs.simd()))
    }
}

impl BitXorAssign for Gf2Vector {
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

/// A square matrix, stored as one row vector per input bit.
///
/// Multiplication is from the left, `v * M`, i.e. the XOR of the rows selected by `v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Gf2Matrix {
    rows: Vec<Gf2Vector>,
}

impl Gf2Matrix {
    pub(crate) fn from_rows(rows: Vec<Gf2Vector>) -> Self {
        Self { rows }
    }

    pub(crate) fn mul(&self, v: &Gf2Vector) -> Gf2Vector {
        let mut acc = Gf2Vector::ZERO;
        for (w, &word) in v.words().iter().enumerate() {
            let mut word = word;
            while word != 0 {
                let i = w * 64 + word.trailing_zeros() as usize;
                acc ^= self.rows[i];
                word &= word - 1;
            }
        }
        acc
    }

    /// Checks for full rank with Gaussian elimination.
    pub(crate) fn is_invertible(&self) -> bool {
        let n = self.rows.len();
        let mut rows: Vec<[u64; 4]> = self.rows.iter().map(|r| *r.words()).collect();
        for col in 0..n {
            let (w, bit) = (col / 64, 1_u64 << (col % 64));
            let Some(pivot) = (col..n).find(|&r| rows[r][w] & bit != 0) else {
                return false;
            };
            rows.swap(col, pivot);
            let pivot_row = rows[col];
            for row in rows.iter_mut().skip(col + 1) {
                if row[w] & bit != 0 {
                    for (a, b) in row.iter_mut().zip(pivot_row) {
                        *a ^= b;
                    }
                }
            }
        }
        true
    }
}
