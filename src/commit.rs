//! Hash commitments to seeds, aux bits and views.
use crate::{
    hash::{HashContext, HashContextX4},
    mpc::Msgs,
    params::{Params, Salt},
    utils::num_bytes,
};

/// Commits to the seeds of all parties of repetition `repetition`.
///
/// The commitment of party `j` is `H(seed_j || salt || repetition || j)`, the
/// last party additionally commits to `last_aux` after its seed. Parties
/// without a seed get no commitment.
pub(crate) fn commit_parties(
    seeds: &[Option<&[u8]>],
    last_aux: Option<&[u8]>,
    salt: &Salt,
    repetition: usize,
    params: &Params,
) -> Vec<Option<Vec<u8>>> {
    let digest_size = params.digest_size();
    let repetition = repetition as u16;
    let mut commitments: Vec<Option<Vec<u8>>> = Vec::with_capacity(seeds.len());
    for (batch, chunk) in seeds.chunks(4).enumerate() {
        let first = (4 * batch) as u16;
        if let [Some(s0), Some(s1), Some(s2), Some(s3)] = chunk {
            let mut out = [
                vec![0; digest_size],
                vec![0; digest_size],
                vec![0; digest_size],
                vec![0; digest_size],
            ];
            let mut ctx = HashContextX4::new();
            ctx.update([*s0, *s1, *s2, *s3])
                .update_all(salt)
                .update_u16([repetition; 4])
                .update_u16([first, first + 1, first + 2, first + 3]);
            let [o0, o1, o2, o3] = &mut out;
            ctx.squeeze([&mut o0[..], &mut o1[..], &mut o2[..], &mut o3[..]]);
            commitments.extend(out.into_iter().map(Some));
        } else {
            commitments.extend(chunk.iter().enumerate().map(|(j, seed)| {
                seed.map(|seed| commit_seed(seed, None, salt, repetition, first + j as u16, params))
            }));
        }
    }
    let last = params.last_party();
    if let (Some(Some(seed)), Some(aux)) = (seeds.get(last), last_aux) {
        let commitment = commit_seed(seed, Some(aux), salt, repetition, last as u16, params);
        commitments[last] = Some(commitment);
    }
    commitments
}

fn commit_seed(
    seed: &[u8],
    aux: Option<&[u8]>,
    salt: &Salt,
    repetition: u16,
    party: u16,
    params: &Params,
) -> Vec<u8> {
    let mut ctx = HashContext::new();
    ctx.update(seed);
    if let Some(aux) = aux {
        ctx.update(aux);
    }
    ctx.update(salt).update_u16(repetition).update_u16(party);
    ctx.finalize(params.digest_size())
}

/// `H(C_0 || ... || C_{N-1})`, the commitment of one repetition to its party commitments.
pub(crate) fn commit_round(commitments: &[Vec<u8>], params: &Params) -> Vec<u8> {
    let mut ctx = HashContext::new();
    for c in commitments {
        ctx.update(c);
    }
    ctx.finalize(params.digest_size())
}

/// `H(masked_key || msgs_0 || ... || msgs_{N-1})`, the commitment to the views of one repetition.
pub(crate) fn commit_views(masked_key: &[u8], msgs: &Msgs, params: &Params) -> Vec<u8> {
    let used = num_bytes(msgs.position());
    let mut ctx = HashContext::new();
    ctx.update(masked_key);
    for msg in msgs.iter() {
        ctx.update(&msg[..used]);
    }
    ctx.finalize(params.digest_size())
}
