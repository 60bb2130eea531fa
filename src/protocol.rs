//! Signing and verification.
//!
//! A signature is a non-interactive proof of knowledge of the LowMC key that
//! maps the plaintext of the public key to its ciphertext. The signer simulates
//! an `N` party MPC evaluation of LowMC in each of `T` repetitions and commits
//! to all of them. A challenge derived from the commitments and the message
//! selects `τ` repetitions to open, and one party per opened repetition whose
//! view stays hidden. All other repetitions are only checked for a correct
//! preprocessing, by revealing their root seeds.
//!
//! # Signing
//!
//! 1. Derive the salt and the root seed from the private key, message and public key.
//! 2. Expand the root seed into one seed per repetition, and each of these into
//!    one seed per party.
//! 3. Per repetition: derive the random tapes, compute the aux bits, commit to
//!    the seeds, and simulate the online pass on the masked key.
//! 4. Build a Merkle tree over the view commitments and derive the challenge.
//! 5. Reveal the seeds of the unopened repetitions, the Merkle nodes of the
//!    opened ones, and the views of all but the hidden party of every opened repetition.
//!
//! # Verification
//!
//! The verifier recomputes every unopened repetition from its seed, and every
//! opened repetition from the revealed seeds and the view of the hidden party.
//! The signature is valid iff the challenge derived from the recomputed
//! commitments equals the challenge in the signature.
use thiserror::Error;
use tracing::{Level, debug, instrument};

use crate::{
    challenge::{ChallengeError, Transcript, derive_challenge},
    cipher::OnlineInput,
    commit::{commit_parties, commit_round, commit_views},
    hash::HashContext,
    keys::{PrivateKey, PublicKey},
    merkle::{MerkleError, MerkleTree},
    mpc::{Msgs, SimulationError, aux_bits, compute_aux_tape, set_aux_bits},
    params::{Instance, Params, SALT_SIZE, Salt},
    seed_tree::{SeedTree, SeedTreeError},
    signature::{DecodeError, Proof, Signature},
    tape::RandomTapes,
    utils::{map_rounds, xor_inplace},
};

/// Errors occurring during signing or verification.
#[derive(Debug, Error)]
pub enum Error {
    /// The signature could not be decoded.
    #[error("malformed signature: {0}")]
    Decode(#[from] DecodeError),
    /// A seed tree could not be revealed or reconstructed.
    #[error("invalid seed tree opening: {0}")]
    SeedTree(#[from] SeedTreeError),
    /// The Merkle tree over the view commitments could not be opened or reconstructed.
    #[error("invalid Merkle opening: {0}")]
    Merkle(#[from] MerkleError),
    /// The online simulation of a repetition failed.
    #[error("simulation of repetition {round} failed: {source}")]
    Simulation {
        /// The repetition.
        round: usize,
        /// The cause.
        source: SimulationError,
    },
    /// The challenge could not be derived.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    /// The recomputed challenge differs from the one in the signature.
    #[error("the recomputed challenge does not match the signature")]
    ChallengeMismatch,
    /// The keys do not belong to the parameter set of the instance.
    #[error("the key has {actual} bytes, but the parameter set requires {expected}")]
    KeySize {
        /// Required size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },
}

/// The opaque result of a failed verification.
///
/// The cause is logged at debug level; use [`verify_detailed`] to inspect it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid signature")]
pub struct InvalidSignature;

/// Signs `message`, returning the encoded signature.
pub fn sign(
    instance: &Instance,
    private_key: &PrivateKey,
    message: &[u8],
) -> Result<Vec<u8>, Error> {
    Ok(sign_signature(instance, private_key, message)?.encode())
}

/// Verifies an encoded signature on `message`.
pub fn verify(
    instance: &Instance,
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), InvalidSignature> {
    verify_detailed(instance, public_key, message, signature).map_err(|e| {
        debug!(%e, "signature rejected");
        InvalidSignature
    })
}

/// Like [`verify`], but reports why a signature was rejected.
pub fn verify_detailed(
    instance: &Instance,
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let signature = Signature::decode(signature, instance.params())?;
    verify_signature(instance, public_key, message, &signature)
}

/// The state of one repetition that the signer needs after the challenge is known.
struct SignerRound {
    seeds: SeedTree,
    aux: Vec<u8>,
    commitments: Vec<Vec<u8>>,
    masked_key: Vec<u8>,
    msgs: Msgs,
    round_commitment: Vec<u8>,
    views_commitment: Vec<u8>,
}

/// Signs `message`, returning the structured signature.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub fn sign_signature(
    instance: &Instance,
    private_key: &PrivateKey,
    message: &[u8],
) -> Result<Signature, Error> {
    let params = instance.params();
    let cipher = instance.cipher();
    check_key_size(&private_key.key, params)?;
    check_key_size(&private_key.public.plaintext, params)?;
    check_key_size(&private_key.public.ciphertext, params)?;

    let (salt, root_seed) = salt_and_root_seed(private_key, message, params);
    let iseeds = SeedTree::generate(params.rounds(), &root_seed, &salt, 0);

    let rounds = map_rounds(params.rounds(), |t| -> Result<SignerRound, Error> {
        let iseed = iseeds.leaf(t).ok_or(SeedTreeError::MissingNode(t))?;
        let seeds = SeedTree::generate(params.parties(), iseed, &salt, t);
        let party_seeds = seeds.leaves();
        let mut tapes = RandomTapes::new(&party_seeds, &salt, t, params);
        compute_aux_tape(cipher, &mut tapes)
            .map_err(|source| Error::Simulation { round: t, source })?;
        let aux = aux_bits(&tapes, params);
        let commitments = commit_parties(&party_seeds, Some(aux.as_slice()), &salt, t, params)
            .into_iter()
            .enumerate()
            .map(|(j, c)| c.ok_or(SeedTreeError::MissingNode(j)))
            .collect::<Result<Vec<_>, _>>()?;

        let key_mask = tapes.read_shares(params.lowmc().state_bits);
        let mut masked_key = key_mask.reconstruct();
        xor_inplace(&mut masked_key, &private_key.key);
        let mut msgs = Msgs::new(params);
        let input = OnlineInput {
            masked_key: &masked_key,
            key_mask: &key_mask,
            plaintext: &private_key.public.plaintext,
            ciphertext: &private_key.public.ciphertext,
        };
        cipher
            .simulate_online(input, &mut tapes, &mut msgs)
            .map_err(|source| Error::Simulation { round: t, source })?;

        let round_commitment = commit_round(&commitments, params);
        let views_commitment = commit_views(&masked_key, &msgs, params);
        Ok(SignerRound {
            seeds,
            aux,
            commitments,
            masked_key,
            msgs,
            round_commitment,
            views_commitment,
        })
    })
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;
    debug!(rounds = rounds.len(), "simulated all repetitions");

    let views: Vec<Vec<u8>> = rounds.iter().map(|r| r.views_commitment.clone()).collect();
    let tree = MerkleTree::build(&views, &salt, params.digest_size());
    let round_commitments: Vec<Vec<u8>> =
        rounds.iter().map(|r| r.round_commitment.clone()).collect();
    let challenge = derive_challenge(
        &Transcript {
            round_commitments: &round_commitments,
            views_root: tree.root(),
            salt: &salt,
            public_key: &private_key.public.ciphertext,
            plaintext: &private_key.public.plaintext,
            message,
        },
        params,
    )?;
    debug!(opened = ?challenge.rounds(), hidden = ?challenge.parties(), "derived challenge");

    let missing = challenge.unopened_rounds(params.rounds());
    let cv_info = tree.open(&missing)?;
    let iseed_info = iseeds.reveal(challenge.rounds())?;

    let mut proofs = Vec::with_capacity(params.opened_rounds());
    for (t, round) in rounds.into_iter().enumerate() {
        let Some(hidden) = challenge.hidden_party(t) else {
            continue;
        };
        let seed_info = round.seeds.reveal(&[hidden as u16])?;
        let aux = (hidden != params.last_party()).then_some(round.aux);
        proofs.push(Proof {
            seed_info,
            aux,
            masked_key: round.masked_key,
            msgs: round.msgs.party(hidden).to_vec(),
            commitment: round.commitments[hidden].clone(),
        });
    }

    Ok(Signature {
        challenge,
        salt,
        iseed_info,
        cv_info,
        proofs,
    })
}

/// Verifies a structured signature on `message`.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub fn verify_signature(
    instance: &Instance,
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), Error> {
    let params = instance.params();
    let cipher = instance.cipher();
    check_key_size(&public_key.plaintext, params)?;
    check_key_size(&public_key.ciphertext, params)?;
    let salt = &signature.salt;
    let challenge = &signature.challenge;

    let iseeds = SeedTree::reconstruct(
        params.rounds(),
        params.seed_size(),
        challenge.rounds(),
        &signature.iseed_info,
        salt,
        0,
    )?;

    // per repetition: the round commitment, and the view commitment if the repetition is opened
    let rounds = map_rounds(params.rounds(), |t| -> Result<(Vec<u8>, Option<Vec<u8>>), Error> {
        let Some((proof, hidden)) = signature.proof(t) else {
            let iseed = iseeds.leaf(t).ok_or(SeedTreeError::MissingNode(t))?;
            let seeds = SeedTree::generate(params.parties(), iseed, salt, t);
            let party_seeds = seeds.leaves();
            let mut tapes = RandomTapes::new(&party_seeds, salt, t, params);
            compute_aux_tape(cipher, &mut tapes)
                .map_err(|source| Error::Simulation { round: t, source })?;
            let aux = aux_bits(&tapes, params);
            let commitments = commit_parties(&party_seeds, Some(aux.as_slice()), salt, t, params)
                .into_iter()
                .enumerate()
                .map(|(j, c)| c.ok_or(SeedTreeError::MissingNode(j)))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((commit_round(&commitments, params), None));
        };

        let seeds = SeedTree::reconstruct(
            params.parties(),
            params.seed_size(),
            &[hidden as u16],
            &proof.seed_info,
            salt,
            t,
        )?;
        let party_seeds = seeds.leaves();
        let commitments = commit_parties(&party_seeds, proof.aux.as_deref(), salt, t, params)
            .into_iter()
            .enumerate()
            .map(|(j, c)| match c {
                Some(c) => Ok(c),
                None if j == hidden => Ok(proof.commitment.clone()),
                None => Err(SeedTreeError::MissingNode(j)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let round_commitment = commit_round(&commitments, params);

        let mut tapes = RandomTapes::new(&party_seeds, salt, t, params);
        if let Some(aux) = &proof.aux {
            set_aux_bits(&mut tapes, aux, params);
        }
        let key_mask = tapes.read_shares(params.lowmc().state_bits);
        let mut msgs = Msgs::with_hidden(params, hidden, &proof.msgs);
        let input = OnlineInput {
            masked_key: &proof.masked_key,
            key_mask: &key_mask,
            plaintext: &public_key.plaintext,
            ciphertext: &public_key.ciphertext,
        };
        cipher
            .simulate_online(input, &mut tapes, &mut msgs)
            .map_err(|source| Error::Simulation { round: t, source })?;
        let views_commitment = commit_views(&proof.masked_key, &msgs, params);
        Ok((round_commitment, Some(views_commitment)))
    })
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;
    debug!(rounds = rounds.len(), "recomputed all repetitions");

    let (round_commitments, views): (Vec<Vec<u8>>, Vec<Option<Vec<u8>>>) =
        rounds.into_iter().unzip();
    let views: Vec<Option<&[u8]>> = views.iter().map(Option::as_deref).collect();
    let missing = challenge.unopened_rounds(params.rounds());
    let root = MerkleTree::reconstruct_root(
        &views,
        &missing,
        &signature.cv_info,
        salt,
        params.digest_size(),
    )?;

    let recomputed = derive_challenge(
        &Transcript {
            round_commitments: &round_commitments,
            views_root: &root,
            salt,
            public_key: &public_key.ciphertext,
            plaintext: &public_key.plaintext,
            message,
        },
        params,
    )?;
    if &recomputed != challenge {
        return Err(Error::ChallengeMismatch);
    }
    Ok(())
}

/// `H(sk || message || pk || plaintext || n)`, split into the salt and the root seed.
fn salt_and_root_seed(
    private_key: &PrivateKey,
    message: &[u8],
    params: &Params,
) -> (Salt, Vec<u8>) {
    let mut ctx = HashContext::new();
    ctx.update(&private_key.key)
        .update(message)
        .update(&private_key.public.ciphertext)
        .update(&private_key.public.plaintext)
        .update_u16(params.lowmc().state_bits as u16);
    let out = ctx.finalize(SALT_SIZE + params.seed_size());
    let (salt, root_seed) = out.split_at(SALT_SIZE);
    let mut salt_bytes = [0; SALT_SIZE];
    salt_bytes.copy_from_slice(salt);
    (salt_bytes, root_seed.to_vec())
}

fn check_key_size(bytes: &[u8], params: &Params) -> Result<(), Error> {
    if bytes.len() != params.input_size() {
        return Err(Error::KeySize {
            expected: params.input_size(),
            actual: bytes.len(),
        });
    }
    Ok(())
}
