//! Signatures and their byte encoding.
//!
//! An encoded signature is laid out as follows, all integers little-endian:
//!
//! | field       | size                                   |
//! |-------------|----------------------------------------|
//! | `C`         | `2τ`, the opened repetitions           |
//! | `P`         | `2τ`, the hidden party per repetition  |
//! | salt        | 32                                     |
//! | `iSeedInfo` | seeds revealing all unopened repetitions |
//! | `cvInfo`    | Merkle nodes for the opened repetitions |
//! | proofs      | one per opened repetition, ascending   |
//!
//! Each proof consists of the seed tree opening hiding `P[i]`, the aux bits
//! (only if the hidden party is not the last one), the masked key, the
//! broadcast messages of the hidden party and its seed commitment.
//!
//! Every length is a function of the parameters and the challenge, so
//! decoding rejects any input whose length is not exactly the expected one.
use thiserror::Error;

use crate::{
    challenge::Challenge,
    merkle::{MerkleError, MerkleTree},
    params::{Params, SALT_SIZE, Salt},
    seed_tree::{SeedTree, SeedTreeError},
    utils::{ceil_log2, padding_bits_zero},
};

/// Errors when decoding a signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input is too short to contain the challenge and the salt.
    #[error("the signature is too short to hold the challenge and salt")]
    Truncated,
    /// An opened repetition index is out of range.
    #[error("opened repetition {0} is out of range")]
    RoundOutOfRange(u16),
    /// An opened repetition index occurs twice.
    #[error("opened repetition {0} occurs more than once")]
    DuplicateRound(u16),
    /// A hidden party index is out of range.
    #[error("hidden party {0} is out of range")]
    PartyOutOfRange(u16),
    /// The input is not exactly as long as implied by its challenge.
    #[error("the signature has {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Length implied by the challenge.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unused bits at the end of the aux bits or the broadcast messages are set.
    #[error("non-zero padding bits in the {0} of the proof for repetition {1}")]
    NonZeroPadding(&'static str, u16),
    /// The seed tree opening cannot be sized.
    #[error(transparent)]
    SeedTree(#[from] SeedTreeError),
    /// The Merkle opening cannot be sized.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

/// The opened view of one repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub(crate) seed_info: Vec<u8>,
    /// Present iff the hidden party is not the last one.
    pub(crate) aux: Option<Vec<u8>>,
    pub(crate) masked_key: Vec<u8>,
    pub(crate) msgs: Vec<u8>,
    pub(crate) commitment: Vec<u8>,
}

/// A signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub(crate) challenge: Challenge,
    pub(crate) salt: Salt,
    pub(crate) iseed_info: Vec<u8>,
    pub(crate) cv_info: Vec<u8>,
    /// One proof per opened repetition, in ascending order of the repetition.
    pub(crate) proofs: Vec<Proof>,
}

impl Signature {
    /// The opened repetitions and hidden parties.
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// The salt of all hashes of this signature.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// The proof of repetition `round` and its hidden party, if the repetition is opened.
    pub(crate) fn proof(&self, round: usize) -> Option<(&Proof, usize)> {
        let hidden = self.challenge.hidden_party(round)?;
        let index = self
            .challenge
            .rounds
            .iter()
            .filter(|&&r| usize::from(r) < round)
            .count();
        self.proofs.get(index).map(|proof| (proof, hidden))
    }

    /// Encodes the signature.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        for &c in &self.challenge.rounds {
            out.extend_from_slice(&c.to_le_bytes());
        }
        for &p in &self.challenge.parties {
            out.extend_from_slice(&p.to_le_bytes());
        }
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iseed_info);
        out.extend_from_slice(&self.cv_info);
        for proof in &self.proofs {
            out.extend_from_slice(&proof.seed_info);
            if let Some(aux) = &proof.aux {
                out.extend_from_slice(aux);
            }
            out.extend_from_slice(&proof.masked_key);
            out.extend_from_slice(&proof.msgs);
            out.extend_from_slice(&proof.commitment);
        }
        out
    }

    /// Decodes and structurally validates a signature.
    pub fn decode(bytes: &[u8], params: &Params) -> Result<Self, DecodeError> {
        let opened = params.opened_rounds();
        let mut reader = Reader(bytes);
        let header = reader
            .take(4 * opened + SALT_SIZE)
            .ok_or(DecodeError::Truncated)?;
        let (rounds, rest) = header.split_at(2 * opened);
        let (parties, salt) = rest.split_at(2 * opened);
        let challenge = Challenge {
            rounds: read_u16s(rounds),
            parties: read_u16s(parties),
        };
        validate_challenge(&challenge, params)?;

        let expected = signature_size(&challenge, params)?;
        if bytes.len() != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let mismatch = || DecodeError::LengthMismatch {
            expected,
            actual: bytes.len(),
        };

        let mut salt_bytes = [0; SALT_SIZE];
        salt_bytes.copy_from_slice(salt);
        let iseed_len =
            SeedTree::revealed_size(params.rounds(), params.seed_size(), &challenge.rounds)?;
        let iseed_info = reader.take(iseed_len).ok_or_else(mismatch)?.to_vec();
        let missing = challenge.unopened_rounds(params.rounds());
        let cv_len = MerkleTree::opening_size(params.rounds(), &missing, params.digest_size())?;
        let cv_info = reader.take(cv_len).ok_or_else(mismatch)?.to_vec();

        let mut opened_rounds: Vec<(u16, u16)> = challenge
            .rounds
            .iter()
            .copied()
            .zip(challenge.parties.iter().copied())
            .collect();
        opened_rounds.sort_unstable();
        let mut proofs = Vec::with_capacity(opened);
        for (round, hidden) in opened_rounds {
            let seed_len =
                SeedTree::revealed_size(params.parties(), params.seed_size(), &[hidden])?;
            let seed_info = reader.take(seed_len).ok_or_else(mismatch)?.to_vec();
            let aux = if usize::from(hidden) != params.last_party() {
                let aux = reader.take(params.view_size()).ok_or_else(mismatch)?;
                if !padding_bits_zero(aux, params.lowmc().and_gates()) {
                    return Err(DecodeError::NonZeroPadding("aux bits", round));
                }
                Some(aux.to_vec())
            } else {
                None
            };
            let masked_key = reader.take(params.input_size()).ok_or_else(mismatch)?.to_vec();
            let msgs = reader.take(params.msgs_size()).ok_or_else(mismatch)?;
            if !padding_bits_zero(msgs, params.msgs_bits()) {
                return Err(DecodeError::NonZeroPadding("messages", round));
            }
            let msgs = msgs.to_vec();
            let commitment = reader.take(params.digest_size()).ok_or_else(mismatch)?.to_vec();
            proofs.push(Proof {
                seed_info,
                aux,
                masked_key,
                msgs,
                commitment,
            });
        }

        Ok(Self {
            challenge,
            salt: salt_bytes,
            iseed_info,
            cv_info,
            proofs,
        })
    }
}

/// The exact length of an encoded signature with the given challenge.
pub fn signature_size(challenge: &Challenge, params: &Params) -> Result<usize, DecodeError> {
    validate_challenge(challenge, params)?;
    let mut size = 4 * params.opened_rounds() + SALT_SIZE;
    size += SeedTree::revealed_size(params.rounds(), params.seed_size(), &challenge.rounds)?;
    let missing = challenge.unopened_rounds(params.rounds());
    size += MerkleTree::opening_size(params.rounds(), &missing, params.digest_size())?;
    for &hidden in &challenge.parties {
        size += SeedTree::revealed_size(params.parties(), params.seed_size(), &[hidden])?;
        if usize::from(hidden) != params.last_party() {
            size += params.view_size();
        }
        size += params.input_size() + params.msgs_size() + params.digest_size();
    }
    Ok(size)
}

/// An upper bound on the length of any encoded signature.
pub fn max_signature_size(params: &Params) -> usize {
    let (rounds, opened) = (params.rounds(), params.opened_rounds());
    let depth = ceil_log2(rounds) as usize;
    // every revealed node is the sibling of a node on the path to a hidden
    // (resp. known) leaf, and there can be no more of them than such leaves
    let iseed_nodes = (opened * depth).min(rounds - opened);
    let cv_nodes = (opened * depth).min(rounds - opened);
    let party_nodes = ceil_log2(params.parties()) as usize;
    4 * opened
        + SALT_SIZE
        + iseed_nodes * params.seed_size()
        + cv_nodes * params.digest_size()
        + opened
            * (party_nodes * params.seed_size()
                + params.view_size()
                + params.input_size()
                + params.msgs_size()
                + params.digest_size())
}

fn validate_challenge(challenge: &Challenge, params: &Params) -> Result<(), DecodeError> {
    for (i, &round) in challenge.rounds.iter().enumerate() {
        if usize::from(round) >= params.rounds() {
            return Err(DecodeError::RoundOutOfRange(round));
        }
        if challenge.rounds[..i].contains(&round) {
            return Err(DecodeError::DuplicateRound(round));
        }
    }
    if let Some(&party) = challenge
        .parties
        .iter()
        .find(|&&p| usize::from(p) >= params.parties())
    {
        return Err(DecodeError::PartyOutOfRange(party));
    }
    Ok(())
}

fn read_u16s(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect()
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.0.len() < len {
            return None;
        }
        let (head, tail) = self.0.split_at(len);
        self.0 = tail;
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{LowMcShape, ParameterSet};

    fn toy_params() -> Params {
        let lowmc = LowMcShape {
            state_bits: 32,
            sboxes: 2,
            rounds: 3,
        };
        Params::new(lowmc, 8, 3, 4, 16, 32).unwrap()
    }

    /// An all-zero signature that opens repetitions `0..parties.len()`.
    fn zero_signature(params: &Params, parties: Vec<u16>) -> Signature {
        let challenge = Challenge {
            rounds: (0..parties.len() as u16).collect(),
            parties,
        };
        let iseed_len =
            SeedTree::revealed_size(params.rounds(), params.seed_size(), &challenge.rounds)
                .unwrap();
        let missing = challenge.unopened_rounds(params.rounds());
        let cv_len =
            MerkleTree::opening_size(params.rounds(), &missing, params.digest_size()).unwrap();
        let proofs = challenge
            .parties
            .iter()
            .map(|&hidden| {
                let seed_len =
                    SeedTree::revealed_size(params.parties(), params.seed_size(), &[hidden])
                        .unwrap();
                Proof {
                    seed_info: vec![0; seed_len],
                    aux: (usize::from(hidden) != params.last_party())
                        .then(|| vec![0; params.view_size()]),
                    masked_key: vec![0; params.input_size()],
                    msgs: vec![0; params.msgs_size()],
                    commitment: vec![0; params.digest_size()],
                }
            })
            .collect();
        Signature {
            challenge,
            salt: [0; SALT_SIZE],
            iseed_info: vec![0; iseed_len],
            cv_info: vec![0; cv_len],
            proofs,
        }
    }

    #[test]
    fn padding_bits_must_be_zero() {
        let params = toy_params();
        // 18 aux bits and 50 message bits: the low 6 bits of the last byte are padding
        assert_eq!((3, 7), (params.view_size(), params.msgs_size()));
        let signature = zero_signature(&params, vec![0, 3, 1]);
        let bytes = signature.encode();
        assert_eq!(Ok(bytes.len()), signature_size(signature.challenge(), &params));
        assert_eq!(Ok(signature.clone()), Signature::decode(&bytes, &params));

        let mut last_aux_bit = signature.clone();
        let Some(aux) = last_aux_bit.proofs[2].aux.as_mut() else {
            panic!("party 1 is hidden, so the aux bits are sent");
        };
        aux[2] |= 0x40;
        let bytes = last_aux_bit.encode();
        assert_eq!(Ok(last_aux_bit), Signature::decode(&bytes, &params));

        for padding in [0x01, 0x20] {
            let mut aux_padding = signature.clone();
            let Some(aux) = aux_padding.proofs[2].aux.as_mut() else {
                panic!("party 1 is hidden, so the aux bits are sent");
            };
            aux[2] |= padding;
            assert_eq!(
                Err(DecodeError::NonZeroPadding("aux bits", 2)),
                Signature::decode(&aux_padding.encode(), &params)
            );

            let mut msgs_padding = signature.clone();
            msgs_padding.proofs[1].msgs[6] |= padding;
            assert_eq!(
                Err(DecodeError::NonZeroPadding("messages", 1)),
                Signature::decode(&msgs_padding.encode(), &params)
            );
        }

        let mut last_msgs_bit = signature.clone();
        last_msgs_bit.proofs[1].msgs[6] |= 0x40;
        let bytes = last_msgs_bit.encode();
        assert_eq!(Ok(last_msgs_bit), Signature::decode(&bytes, &params));
    }

    #[test]
    fn challenge_validation() {
        let params = ParameterSet::L1.params();
        let mut challenge = Challenge {
            rounds: (0..27).collect(),
            parties: vec![0; 27],
        };
        assert!(validate_challenge(&challenge, &params).is_ok());
        challenge.rounds[3] = 343;
        assert_eq!(
            Err(DecodeError::RoundOutOfRange(343)),
            validate_challenge(&challenge, &params)
        );
        challenge.rounds[3] = 2;
        assert_eq!(
            Err(DecodeError::DuplicateRound(2)),
            validate_challenge(&challenge, &params)
        );
        challenge.rounds[3] = 3;
        challenge.parties[26] = 16;
        assert_eq!(
            Err(DecodeError::PartyOutOfRange(16)),
            validate_challenge(&challenge, &params)
        );
    }

    #[test]
    fn size_depends_on_hidden_last_party() {
        let params = ParameterSet::L1.params();
        let mut challenge = Challenge {
            rounds: (0..27).collect(),
            parties: vec![0; 27],
        };
        let with_aux = signature_size(&challenge, &params).unwrap();
        challenge.parties[0] = 15;
        let without_aux = signature_size(&challenge, &params).unwrap();
        assert_eq!(params.view_size(), with_aux - without_aux);
        assert!(with_aux <= max_signature_size(&params));
    }

    #[test]
    fn short_inputs_are_truncated() {
        let params = ParameterSet::L1.params();
        assert_eq!(
            Err(DecodeError::Truncated),
            Signature::decode(&[0; 4 * 27 + 31], &params)
        );
        assert_eq!(Err(DecodeError::Truncated), Signature::decode(&[], &params));
    }
}
