use super::{
    CONSTRUCTOR_ABI, CONSTRUCTOR_COMPILED, CONSTRUCTOR_DEPLOYED, CREATED, CREATOR, CREATOR_TX,
    bytecode, concat, init_tracing, ipfs_trailer,
};
use alloy::json_abi::{Constructor, JsonAbi};
use crucible_core::auxdata::split_auxdata;
use crucible_core::transformation::replay;
use crucible_core::{Bytecode, Transformation, TransformationKind, TransformationReason};
use crucible_verification::MatchStatus;
use crucible_verification::chain::CreatorTransaction;
use crucible_verification::matcher::{Deployment, match_creation};

fn constructor() -> Constructor {
    let abi: JsonAbi = serde_json::from_str(CONSTRUCTOR_ABI).unwrap();
    abi.constructor.unwrap()
}

fn creator(nonce: u64) -> CreatorTransaction {
    CreatorTransaction {
        sender: CREATOR.parse().unwrap(),
        nonce,
    }
}

#[test]
fn test_constructor_arguments_are_recorded() {
    init_tracing();
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let onchain = bytecode(CONSTRUCTOR_DEPLOYED).unwrap();
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, Some(&constructor()), deployment);
    assert_eq!(outcome.status, Some(MatchStatus::Perfect));
    assert_eq!(outcome.message, None);
    assert_eq!(outcome.transformations.len(), 1);
    let transformation = &outcome.transformations[0];
    assert_eq!(transformation.kind, TransformationKind::Insert);
    assert_eq!(transformation.reason, TransformationReason::Constructor);
    assert_eq!(transformation.offset, template.len());

    let arguments = outcome.abi_encoded_constructor_arguments.clone().unwrap();
    assert_eq!(arguments.len(), 32);
    assert_eq!(&arguments[30..], &[0x30, 0x39]);
    assert_eq!(replay(&template, &outcome.transformations, &outcome.values).unwrap(), onchain);
}

#[test]
fn test_trailing_garbage_fails_the_reencoding_guard() {
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let onchain = Bytecode::parse(&format!("{}ff", bytecode(CONSTRUCTOR_DEPLOYED).unwrap())).unwrap();
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, Some(&constructor()), deployment);
    assert_eq!(outcome.status, None);
    let message = outcome.message.unwrap();
    assert!(
        message.starts_with(
            "Failed to match with creation bytecode: constructor arguments ABI decoding failed"
        ),
        "{message}"
    );
}

#[test]
fn test_arguments_without_constructor_abi() {
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let onchain = bytecode(CONSTRUCTOR_DEPLOYED).unwrap();
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, None, deployment);
    assert_eq!(outcome.status, None);
    assert_eq!(
        outcome.message.as_deref(),
        Some("Failed to match with creation bytecode: constructor ABI Inputs are missing")
    );
}

#[test]
fn test_unrelated_transaction_is_rejected() {
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let onchain = bytecode(CONSTRUCTOR_DEPLOYED).unwrap();
    // Nonce 1 creates a different address.
    let creator = creator(1);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, Some(&constructor()), deployment);
    assert_eq!(outcome.status, None);
    assert_eq!(
        outcome.message.as_deref(),
        Some(
            format!(
                "The address being verified {CREATED} doesn't match the expected address of the contract 0x343c43A37D37dfF08AE8C4A11544c718AbB4fCF8 that will be created by the transaction {CREATOR_TX}."
            )
            .as_str()
        )
    );
}

#[test]
fn test_empty_template_fails() {
    let onchain = bytecode(CONSTRUCTOR_DEPLOYED).unwrap();
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };
    let outcome = match_creation(&Bytecode::default(), &onchain, None, deployment);
    assert_eq!(outcome.status, None);
    assert!(outcome.message.unwrap().ends_with("creation bytecode is empty"));
}

/// Swaps the content hash in an `{ipfs, solc}` trailer, keeping its length.
fn with_other_hash(trailer: &Bytecode) -> Bytecode {
    let hex = trailer.as_str();
    assert!(hex.starts_with("a2646970667358221220"));
    Bytecode::parse(&format!("{}{}{}", &hex[..20], "ab".repeat(32), &hex[84..])).unwrap()
}

#[test]
fn test_differing_trailer_is_partial_and_replayable() {
    init_tracing();
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let deployed = bytecode(CONSTRUCTOR_DEPLOYED).unwrap();
    let (body, trailer) = split_auxdata(&template);
    let trailer = trailer.unwrap();
    let arguments = deployed.suffix_from(template.len());
    let onchain = concat(&[&body, &with_other_hash(&trailer), &arguments]);
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, Some(&constructor()), deployment);
    assert_eq!(outcome.status, Some(MatchStatus::Partial));
    assert_eq!(
        outcome.transformations,
        vec![
            Transformation::auxdata(body.len(), "0"),
            Transformation::constructor(template.len()),
        ]
    );
    assert_eq!(
        outcome.values.cbor_auxdata["0"].to_hex(),
        with_other_hash(&trailer).as_str()
    );
    assert_eq!(replay(&template, &outcome.transformations, &outcome.values).unwrap(), onchain);
}

#[test]
fn test_linked_library_in_creation_code() {
    let placeholder = "__$da572ae5e60c838574a0f88b27a0543803$__";
    let library = "7d53f102f4d4aa014db4e10d6deec2009b3cda6b";
    let trailer = ipfs_trailer(&[0x12; 34]).into_string();
    let template = Bytecode::parse(&format!("6080604052{placeholder}600080fd{trailer}")).unwrap();
    let onchain = Bytecode::parse(&format!("6080604052{library}600080fd{trailer}")).unwrap();
    let creator = creator(0);
    let deployment = Deployment {
        address: CREATED,
        creator_tx_hash: CREATOR_TX,
        creator: &creator,
    };

    let outcome = match_creation(&template, &onchain, None, deployment);
    assert_eq!(outcome.status, Some(MatchStatus::Perfect));
    assert_eq!(outcome.transformations, vec![Transformation::library(10, placeholder)]);
    assert_eq!(outcome.library_map.len(), 1);
    assert_eq!(outcome.library_map[placeholder].to_hex(), library);
    assert_eq!(replay(&template, &outcome.transformations, &outcome.values).unwrap(), onchain);
}
