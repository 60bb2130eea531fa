//! The hash function used as random oracle, commitment scheme and PRF.
//!
//! All hashing goes through BLAKE3 in XOF mode, so that any output length
//! requested by a parameter set can be squeezed from a single context. Domain
//! separation is done by an optional prefix byte that is absorbed before any
//! other input.

/// Prefix for expanding a seed tree node into its children.
pub(crate) const PREFIX_SEED_TREE: u8 = 1;
/// Prefix for re-hashing the challenge digest once its chunks are exhausted.
pub(crate) const PREFIX_CHALLENGE: u8 = 1;
/// Prefix for inner nodes of the Merkle tree over the view commitments.
pub(crate) const PREFIX_MERKLE: u8 = 3;

/// An incremental hash computation.
#[derive(Clone, Default)]
pub(crate) struct HashContext(blake3::Hasher);

impl HashContext {
    /// A context without domain prefix.
    pub(crate) fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    /// A context that starts by absorbing `prefix`.
    pub(crate) fn with_prefix(prefix: u8) -> Self {
        let mut ctx = Self::new();
        ctx.update(&[prefix]);
        ctx
    }

    pub(crate) fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    /// Absorbs `value` as two little-endian bytes.
    pub(crate) fn update_u16(&mut self, value: u16) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    /// Fills `out` with the output stream of the context.
    pub(crate) fn squeeze(&self, out: &mut [u8]) {
        self.0.finalize_xof().fill(out);
    }

    /// Returns the first `len` bytes of the output stream.
    pub(crate) fn finalize(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        self.squeeze(&mut out);
        out
    }
}

/// Four independent hash computations that are always updated in lockstep.
///
/// The result of every lane is identical to running a single [`HashContext`]
/// over the same inputs.
#[derive(Clone, Default)]
pub(crate) struct HashContextX4([HashContext; 4]);

impl HashContextX4 {
    pub(crate) fn new() -> Self {
        Self(Default::default())
    }

    /// Absorbs one (potentially different) input per lane.
    pub(crate) fn update(&mut self, data: [&[u8]; 4]) -> &mut Self {
        for (ctx, data) in self.0.iter_mut().zip(data) {
            ctx.update(data);
        }
        self
    }

    /// Absorbs the same input into every lane.
    pub(crate) fn update_all(&mut self, data: &[u8]) -> &mut Self {
        self.update([data; 4])
    }

    /// Absorbs one little-endian `u16` per lane.
    pub(crate) fn update_u16(&mut self, values: [u16; 4]) -> &mut Self {
        for (ctx, value) in self.0.iter_mut().zip(values) {
            ctx.update_u16(value);
        }
        self
    }

    pub(crate) fn squeeze(&self, out: [&mut [u8]; 4]) {
        for (ctx, out) in self.0.iter().zip(out) {
            ctx.squeeze(out);
        }
    }
}
