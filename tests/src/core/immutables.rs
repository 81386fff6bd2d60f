use super::{IMMUTABLES_COMPILED, IMMUTABLES_DEPLOYED, bytecode, init_tracing};
use crucible_core::link::{ImmutableReference, ImmutableReferences, zero_immutables};
use crucible_core::{Bytecode, TransformationReason};

fn references(json: &str) -> ImmutableReferences {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_zeroing_deployed_code_restores_compiled_code() {
    init_tracing();
    let compiled = bytecode(IMMUTABLES_COMPILED).unwrap();
    let deployed = bytecode(IMMUTABLES_DEPLOYED).unwrap();
    assert_ne!(compiled, deployed);

    let refs = references(r#"{"7":[{"length":32,"start":176}]}"#);
    let zeroed = zero_immutables(&refs, &deployed).unwrap();
    assert_eq!(zeroed.code, compiled);
    assert_eq!(zeroed.transformations.len(), 1);
    assert_eq!(zeroed.transformations[0].reason, TransformationReason::Immutable);
    assert_eq!(zeroed.transformations[0].offset, 352);
    assert_eq!(zeroed.transformations[0].id.as_deref(), Some("7"));

    let mut expected = vec![0u8; 32];
    expected[31] = 0x64;
    assert_eq!(zeroed.values["7"].0, expected);
}

#[test]
fn test_zeroes_hex_range_of_reference() {
    let onchain = Bytecode::parse(&format!("0x{}", "ff".repeat(64))).unwrap();
    let refs = ImmutableReferences::from([(
        "5".to_string(),
        vec![ImmutableReference {
            start: 10,
            length: 32,
        }],
    )]);
    let zeroed = zero_immutables(&refs, &onchain).unwrap();
    let text = zeroed.code.as_str();
    assert_eq!(&text[..20], "f".repeat(20));
    assert_eq!(&text[20..84], "0".repeat(64));
    assert_eq!(&text[84..], "f".repeat(44));
    assert_eq!(zeroed.transformations[0].offset, 20);
}

#[test]
fn test_every_reference_gets_a_transformation() {
    let onchain = Bytecode::parse(&format!("0x{}", "aa".repeat(96))).unwrap();
    let refs = references(
        r#"{"3":[{"start":0,"length":32},{"start":64,"length":32}],"9":[{"start":32,"length":32}]}"#,
    );
    let zeroed = zero_immutables(&refs, &onchain).unwrap();
    assert_eq!(zeroed.code.as_str(), "0".repeat(192));
    let mut offsets: Vec<usize> = zeroed.transformations.iter().map(|t| t.offset).collect();
    offsets.sort();
    assert_eq!(offsets, vec![0, 64, 128]);
    assert_eq!(zeroed.values.len(), 2);
}

#[test]
fn test_reference_past_end_is_an_error() {
    let onchain = Bytecode::parse("0x6000").unwrap();
    let refs = references(r#"{"1":[{"start":1,"length":32}]}"#);
    assert!(zero_immutables(&refs, &onchain).is_err());
}
