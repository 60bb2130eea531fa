//! Fiat-Shamir challenge: which repetitions are opened and which party stays hidden in each.
use thiserror::Error;

use crate::{
    hash::{HashContext, PREFIX_CHALLENGE},
    params::{Params, Salt},
    utils::{ceil_log2, get_bit},
};

/// Upper bound on the number of passes over the digest chain that may end
/// without completing an index list.
///
/// Far above anything that occurs for sound parameters, but keeps the
/// derivation total for degenerate ones.
pub(crate) const MAX_REHASHES: usize = 1024;

/// Errors when deriving a challenge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// The digest chain did not produce enough valid indices.
    #[error("a challenge index list was still incomplete after {MAX_REHASHES} passes")]
    Exhausted,
}

/// The opened repetitions `C` and the hidden party `P[i]` of repetition `C[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub(crate) rounds: Vec<u16>,
    pub(crate) parties: Vec<u16>,
}

impl Challenge {
    /// The opened repetitions, in the order in which they were derived.
    pub fn rounds(&self) -> &[u16] {
        &self.rounds
    }

    /// The hidden party of each opened repetition.
    pub fn parties(&self) -> &[u16] {
        &self.parties
    }

    /// The hidden party of repetition `round`, if it is opened.
    pub(crate) fn hidden_party(&self, round: usize) -> Option<usize> {
        self.rounds
            .iter()
            .position(|&r| usize::from(r) == round)
            .map(|i| usize::from(self.parties[i]))
    }

    /// The repetitions that are not opened, in ascending order.
    pub(crate) fn unopened_rounds(&self, total: usize) -> Vec<u16> {
        (0..total as u16).filter(|r| !self.rounds.contains(r)).collect()
    }
}

/// Everything the challenge is bound to.
pub(crate) struct Transcript<'a> {
    pub(crate) round_commitments: &'a [Vec<u8>],
    pub(crate) views_root: &'a [u8],
    pub(crate) salt: &'a Salt,
    pub(crate) public_key: &'a [u8],
    pub(crate) plaintext: &'a [u8],
    pub(crate) message: &'a [u8],
}

pub(crate) fn derive_challenge(
    transcript: &Transcript<'_>,
    params: &Params,
) -> Result<Challenge, ChallengeError> {
    let mut ctx = HashContext::new();
    for ch in transcript.round_commitments {
        ctx.update(ch);
    }
    ctx.update(transcript.views_root)
        .update(transcript.salt)
        .update(transcript.public_key)
        .update(transcript.plaintext)
        .update(transcript.message);
    let digest = ctx.finalize(params.digest_size());
    challenge_from_digest(digest, params).map(|(challenge, _)| challenge)
}

/// Expands a digest into a challenge, also returning the number of re-hashes used.
pub(crate) fn challenge_from_digest(
    digest: Vec<u8>,
    params: &Params,
) -> Result<(Challenge, usize), ChallengeError> {
    let mut chain = DigestChain::new(digest, MAX_REHASHES);
    let opened = params.opened_rounds();
    let rounds = chain.sample(opened, params.rounds(), true)?;
    let parties = chain.sample(opened, params.parties(), false)?;
    Ok((Challenge { rounds, parties }, chain.rehashes))
}

struct DigestChain {
    digest: Vec<u8>,
    rehashes: usize,
    max_incomplete_passes: usize,
}

impl DigestChain {
    fn new(digest: Vec<u8>, max_incomplete_passes: usize) -> Self {
        Self {
            digest,
            rehashes: 0,
            max_incomplete_passes,
        }
    }

    /// Collects `count` indices below `bound` from chunks of the digest,
    /// re-hashing the digest after every pass.
    ///
    /// The bound on incomplete passes applies to each list separately.
    fn sample(
        &mut self,
        count: usize,
        bound: usize,
        unique: bool,
    ) -> Result<Vec<u16>, ChallengeError> {
        let width = ceil_log2(bound) as usize;
        let mut out = Vec::with_capacity(count);
        let mut incomplete_passes = 0;
        loop {
            for chunk in chunks(&self.digest, width) {
                if out.len() == count {
                    break;
                }
                if usize::from(chunk) < bound && !(unique && out.contains(&chunk)) {
                    out.push(chunk);
                }
            }
            self.rehash();
            if out.len() == count {
                return Ok(out);
            }
            incomplete_passes += 1;
            if incomplete_passes == self.max_incomplete_passes {
                return Err(ChallengeError::Exhausted);
            }
        }
    }

    fn rehash(&mut self) {
        let mut ctx = HashContext::with_prefix(PREFIX_CHALLENGE);
        ctx.update(&self.digest);
        ctx.squeeze(&mut self.digest);
        self.rehashes += 1;
    }
}

/// Splits a byte string into `width`-bit chunks; bit `j` of a chunk has weight `2^j`.
fn chunks(bytes: &[u8], width: usize) -> impl Iterator<Item = u16> + '_ {
    let count = if width == 0 { 0 } else { bytes.len() * 8 / width };
    (0..count).map(move |i| {
        (0..width).fold(0_u16, |chunk, j| {
            chunk | (get_bit(bytes, i * width + j) as u16) << j
        })
    })
}
