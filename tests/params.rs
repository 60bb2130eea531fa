use picnic_kkw::{Instance, LowMcShape, ParameterSet, Params, keygen, sign, verify};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[test]
fn parameter_sets_serialize_as_names() -> Result<(), serde_json::Error> {
    for set in ParameterSet::ALL {
        let json = serde_json::to_string(&set)?;
        assert_eq!(format!("\"{set}\""), json);
        assert_eq!(set, serde_json::from_str::<ParameterSet>(&json)?);
    }
    assert!(serde_json::from_str::<ParameterSet>("\"picnic-kkw-l2\"").is_err());
    Ok(())
}

#[test]
fn params_from_json_are_validated() -> Result<(), serde_json::Error> {
    let params = ParameterSet::L5.params();
    let json = serde_json::to_string(&params)?;
    assert_eq!(params, serde_json::from_str(&json)?);

    let json = r#"{
        "lowmc": { "state_bits": 64, "sboxes": 4, "rounds": 5 },
        "rounds": 40,
        "opened_rounds": 8,
        "parties": 8,
        "seed_size": 16,
        "digest_size": 32
    }"#;
    let params: Params = serde_json::from_str(json)?;
    assert_eq!(
        LowMcShape {
            state_bits: 64,
            sboxes: 4,
            rounds: 5
        },
        params.lowmc()
    );

    let invalid = json.replace("\"parties\": 8", "\"parties\": 7");
    assert!(serde_json::from_str::<Params>(&invalid).is_err());
    Ok(())
}

#[test]
fn custom_params_from_json_sign() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{
        "lowmc": { "state_bits": 64, "sboxes": 4, "rounds": 5 },
        "rounds": 40,
        "opened_rounds": 8,
        "parties": 8,
        "seed_size": 16,
        "digest_size": 32
    }"#;
    let instance = Instance::custom(serde_json::from_str(json)?);
    let sk = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(0))?;
    let signature = sign(&instance, &sk, b"configured")?;
    verify(&instance, sk.public_key(), b"configured", &signature)?;
    Ok(())
}
