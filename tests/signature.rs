use std::sync::Arc;

use picnic_kkw::{
    Error, Instance, LowMcShape, ParameterSet, Params, Signature, keygen, max_signature_size,
    mpc::SimulationError, sign, sign_signature, signature::DecodeError, signature_size, verify,
    verify_detailed,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn toy_instance() -> Instance {
    let lowmc = LowMcShape {
        state_bits: 32,
        sboxes: 2,
        rounds: 3,
    };
    Instance::custom(Params::new(lowmc, 8, 3, 4, 16, 32).unwrap())
}

fn round_trip(instance: &Instance, seed: u64) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let sk = keygen(instance, &mut rng).unwrap();
    let message = b"attack at dawn";

    let signature = sign_signature(instance, &sk, message).unwrap();
    let bytes = signature.encode();
    let params = instance.params();
    let opened = params.opened_rounds();
    let challenge = signature.challenge();
    let header: Vec<u8> = challenge
        .rounds()
        .iter()
        .chain(challenge.parties())
        .flat_map(|i| i.to_le_bytes())
        .collect();
    assert_eq!(header, bytes[..4 * opened]);
    assert_eq!(signature.salt(), &bytes[4 * opened..4 * opened + 32]);
    assert_eq!(signature_size(challenge, params), Ok(bytes.len()));
    assert!(bytes.len() <= max_signature_size(params));
    assert_eq!(Ok(signature), Signature::decode(&bytes, params));

    verify(instance, sk.public_key(), message, &bytes).unwrap();
    assert!(verify(instance, sk.public_key(), b"attack at dusk", &bytes).is_err());
    let other = keygen(instance, &mut rng).unwrap();
    assert!(verify(instance, other.public_key(), message, &bytes).is_err());
}

#[test]
fn sign_and_verify_l1() {
    round_trip(&Instance::new(ParameterSet::L1), 1);
}

#[test]
fn sign_and_verify_l3() {
    round_trip(&Instance::new(ParameterSet::L3), 3);
}

#[test]
fn sign_and_verify_l5() {
    round_trip(&Instance::new(ParameterSet::L5), 5);
}

#[test]
fn sign_and_verify_custom_params() {
    let instance = toy_instance();
    for seed in 0..20 {
        round_trip(&instance, seed);
    }
}

#[test]
fn preset_sizes() {
    let expected = [
        (ParameterSet::L1, 32, 19310),
        (ParameterSet::L3, 48, 44570),
        (ParameterSet::L5, 64, 75332),
    ];
    for (set, public_key_size, max_size) in expected {
        let instance = Instance::new(set);
        assert_eq!(max_size, max_signature_size(instance.params()), "{set}");
        let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(2)).unwrap();
        assert_eq!(public_key_size, sk.public_key().to_bytes().len(), "{set}");
        assert_eq!(public_key_size / 2 * 3, sk.to_bytes().len(), "{set}");
    }
}

#[test]
fn encoding_layout_of_a_small_instance() {
    let lowmc = LowMcShape {
        state_bits: 32,
        sboxes: 2,
        rounds: 3,
    };
    let instance = Instance::custom(Params::new(lowmc, 2, 1, 4, 16, 32).unwrap());
    for seed in 0..8 {
        let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap();
        let signature = sign_signature(&instance, &sk, b"layout").unwrap();
        let bytes = signature.encode();
        let round = signature.challenge().rounds()[0];
        let hidden = signature.challenge().parties()[0];
        // header 36, iseed 16, view commitment 32, party seeds 32, masked key 4,
        // messages 7, hidden commitment 32, plus 3 aux bytes unless party 3 is hidden
        let expected = if hidden == 3 { 159 } else { 162 };
        assert_eq!(expected, bytes.len(), "seed {seed}");
        assert_eq!(round.to_le_bytes(), bytes[0..2]);
        assert_eq!(hidden.to_le_bytes(), bytes[2..4]);
        assert_eq!(signature.salt(), &bytes[4..36]);
        assert_eq!(&sk.to_bytes()[4..], sk.public_key().to_bytes().as_slice());
        verify(&instance, sk.public_key(), b"layout", &bytes).unwrap();
    }
}

#[test]
fn empty_and_long_messages() {
    let instance = toy_instance();
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
    for message in [vec![], vec![0xab; 100_000]] {
        let signature = sign(&instance, &sk, &message).unwrap();
        verify(&instance, sk.public_key(), &message, &signature).unwrap();
    }
}

#[test]
fn signing_is_deterministic() {
    let instance = toy_instance();
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(8)).unwrap();
    let first = sign(&instance, &sk, b"message").unwrap();
    let second = sign(&instance, &sk, b"message").unwrap();
    assert_eq!(first, second);
    assert_ne!(first, sign(&instance, &sk, b"messagf").unwrap());
}

#[test]
fn every_corrupted_byte_is_rejected() {
    let instance = toy_instance();
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
    let signature = sign(&instance, &sk, b"message").unwrap();
    for i in 0..signature.len() {
        for bit in 0..8 {
            let mut corrupted = signature.clone();
            corrupted[i] ^= 1 << bit;
            assert!(
                verify(&instance, sk.public_key(), b"message", &corrupted).is_err(),
                "flipping bit {bit} of byte {i} was not detected"
            );
        }
    }
}

#[test]
fn sampled_corruptions_are_rejected() {
    let instance = Instance::new(ParameterSet::L1);
    let mut rng = ChaCha20Rng::seed_from_u64(14);
    let sk = keygen(&instance, &mut rng).unwrap();
    let signature = sign(&instance, &sk, b"message").unwrap();
    for _ in 0..32 {
        let mut corrupted = signature.clone();
        let i = rng.random_range(0..corrupted.len());
        corrupted[i] ^= 1u8 << rng.random_range(0..8u32);
        assert!(verify(&instance, sk.public_key(), b"message", &corrupted).is_err());
    }
}

#[test]
fn malformed_signatures() {
    let instance = toy_instance();
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(10)).unwrap();
    let pk = sk.public_key();
    let signature = sign(&instance, &sk, b"message").unwrap();
    let opened = instance.params().opened_rounds();

    let result = verify_detailed(&instance, pk, b"message", &signature[..10]);
    assert!(matches!(result, Err(Error::Decode(DecodeError::Truncated))));

    let mut extended = signature.clone();
    extended.push(0);
    let result = verify_detailed(&instance, pk, b"message", &extended);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::LengthMismatch { expected, actual }))
            if actual == expected + 1
    ));

    let truncated = &signature[..signature.len() - 1];
    let result = verify_detailed(&instance, pk, b"message", truncated);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::LengthMismatch { .. }))
    ));

    let mut out_of_range = signature.clone();
    out_of_range[..2].copy_from_slice(&8u16.to_le_bytes());
    let result = verify_detailed(&instance, pk, b"message", &out_of_range);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::RoundOutOfRange(8)))
    ));

    let mut duplicate = signature.clone();
    let first = [signature[0], signature[1]];
    duplicate[2..4].copy_from_slice(&first);
    let result = verify_detailed(&instance, pk, b"message", &duplicate);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::DuplicateRound(_)))
    ));

    let mut bad_party = signature.clone();
    bad_party[2 * opened..2 * opened + 2].copy_from_slice(&4u16.to_le_bytes());
    let result = verify_detailed(&instance, pk, b"message", &bad_party);
    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::PartyOutOfRange(4)))
    ));

    assert!(verify(&instance, pk, b"message", &[]).is_err());
}

#[test]
fn wrong_message_is_a_challenge_mismatch() {
    let instance = toy_instance();
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(11)).unwrap();
    let signature = sign(&instance, &sk, b"message").unwrap();
    let result = verify_detailed(&instance, sk.public_key(), b"other message", &signature);
    assert!(matches!(result, Err(Error::ChallengeMismatch)));
}

#[test]
fn signatures_do_not_verify_under_other_params() {
    let l1 = Instance::new(ParameterSet::L1);
    let l3 = Instance::new(ParameterSet::L3);
    let sk = keygen(&l1, &mut ChaCha20Rng::seed_from_u64(12)).unwrap();
    let signature = sign(&l1, &sk, b"message").unwrap();
    assert!(verify(&l3, sk.public_key(), b"message", &signature).is_err());
}

mod broken_cipher {
    use picnic_kkw::{
        ParamsError,
        cipher::{CipherOracle, OnlineInput},
        lowmc::LowMc,
        mpc::Msgs,
        tape::RandomTapes,
    };

    use super::*;

    /// LowMC whose encryption in the clear disagrees with the MPC circuit.
    struct BrokenCipher(LowMc);

    impl CipherOracle for BrokenCipher {
        fn shape(&self) -> LowMcShape {
            self.0.shape()
        }

        fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SimulationError> {
            let mut ciphertext = self.0.encrypt(key, plaintext)?;
            ciphertext[0] ^= 0x80;
            Ok(ciphertext)
        }

        fn compute_aux(
            &self,
            key_mask: &[u8],
            tapes: &mut RandomTapes,
        ) -> Result<(), SimulationError> {
            self.0.compute_aux(key_mask, tapes)
        }

        fn simulate_online(
            &self,
            input: OnlineInput<'_>,
            tapes: &mut RandomTapes,
            msgs: &mut Msgs,
        ) -> Result<(), SimulationError> {
            self.0.simulate_online(input, tapes, msgs)
        }
    }

    #[test]
    fn inconsistent_keys_cannot_sign() {
        let params = toy_instance().params().clone();
        let cipher = Arc::new(BrokenCipher(LowMc::new(params.lowmc()).unwrap()));
        let instance = Instance::with_cipher(params, cipher).unwrap();
        let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(13)).unwrap();
        let result = sign(&instance, &sk, b"message");
        assert!(matches!(
            result,
            Err(Error::Simulation {
                round: 0,
                source: SimulationError::OutputMismatch
            })
        ));
    }

    #[test]
    fn cipher_shape_must_match_params() {
        let params = toy_instance().params().clone();
        let other = LowMcShape {
            rounds: 4,
            ..params.lowmc()
        };
        let cipher = Arc::new(BrokenCipher(LowMc::new(other).unwrap()));
        let result = Instance::with_cipher(params, cipher);
        assert!(matches!(result, Err(ParamsError::CipherMismatch { .. })));
    }
}
