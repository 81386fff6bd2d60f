use crucible_core::address::{
    checksum, create_address, create2_address, parse_address, parse_salt, same_address,
};

const SENDER: &str = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0";

#[test]
fn test_create_addresses() {
    let sender = parse_address(SENDER).unwrap();
    assert_eq!(
        checksum(&create_address(sender, 0)),
        "0xcd234A471b72ba2F1Ccf0A70FCABA648a5eeCD8d"
    );
    assert_eq!(
        checksum(&create_address(sender, 1)),
        "0x343c43A37D37dfF08AE8C4A11544c718AbB4fCF8"
    );
}

#[test]
fn test_create2_addresses() {
    let zero = parse_address("0x0000000000000000000000000000000000000000").unwrap();
    let salt = parse_salt("0x00").unwrap();
    assert_eq!(
        checksum(&create2_address(zero, salt, &[0x00], &[])),
        "0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38"
    );

    let deployer = parse_address("0xdeadbeef00000000000000000000000000000000").unwrap();
    assert_eq!(
        checksum(&create2_address(deployer, parse_salt("0").unwrap(), &[], &[0x00])),
        "0xB928f69Bb1D91Cd65274e3c79d8986362984fDA3"
    );
}

#[test]
fn test_salt_formats_agree() {
    assert_eq!(parse_salt("0x2a").unwrap(), parse_salt("42").unwrap());
    assert!(parse_salt(&format!("0x{}", "ff".repeat(33))).is_err());
    assert!(parse_salt("not a number").is_err());
}

#[test]
fn test_address_comparison_ignores_case_and_prefix() {
    assert!(same_address(
        "0xCD234A471B72BA2F1CCF0A70FCABA648A5EECD8D",
        "cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
    ));
    assert!(!same_address(SENDER, "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"));
    assert!(parse_address("0x1234").is_err());
}
