use crucible_core::link::patch_call_protection;
use crucible_core::{Bytecode, TransformationKind, TransformationReason};

const GUARD_ADDRESS: &str = "1d4a2e3c6aa4b8cd4a9ff5e5dd1bd0b6d7c1e2a9";

fn library_template() -> Bytecode {
    Bytecode::parse(&format!("0x73{}30146080604052", "00".repeat(20))).unwrap()
}

#[test]
fn test_patches_guard_address_from_deployed_code() {
    let template = library_template();
    let deployed = Bytecode::parse(&format!("0x73{GUARD_ADDRESS}30146080604052")).unwrap();

    let patched = patch_call_protection(&template, &deployed).unwrap();
    assert_eq!(patched.code, deployed);
    assert_eq!(patched.address.to_hex(), GUARD_ADDRESS);
    assert_eq!(patched.transformation.kind, TransformationKind::Replace);
    assert_eq!(patched.transformation.reason, TransformationReason::CallProtection);
    assert_eq!(patched.transformation.offset, 0);
}

#[test]
fn test_ignores_code_without_guard() {
    let template = Bytecode::parse("0x6080604052348015600f57600080fd5b50").unwrap();
    assert!(patch_call_protection(&template, &template).is_none());

    // PUSH20 with a non-zero address is ordinary code.
    let template = Bytecode::parse(&format!("0x73{GUARD_ADDRESS}3014")).unwrap();
    assert!(patch_call_protection(&template, &template).is_none());
}
