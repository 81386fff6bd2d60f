//! Whole verifications with fake collaborators.

use super::{
    CONSTRUCTOR_ABI, CONSTRUCTOR_COMPILED, CONSTRUCTOR_DEPLOYED, CREATED, CREATOR, CREATOR_TX,
    FakeChain, FakeCompiler, artifact, bytecode, concat, constructor_runtime, contract,
    init_tracing, ipfs_trailer, metadata,
};
use crucible_core::Bytecode;
use crucible_core::transformation::replay;
use crucible_verification::chain::CreatorTransaction;
use crucible_verification::compiler::Backend;
use crucible_verification::{Error, MatchStatus, Verifier};
use serde_json::json;

fn storage_metadata() -> crucible_verification::Metadata {
    metadata(
        "0.8.18+commit.87f61d96",
        json!({"optimizer": {"enabled": false, "runs": 200}}),
        serde_json::from_str(CONSTRUCTOR_ABI).unwrap(),
    )
}

fn storage_compiler() -> FakeCompiler {
    FakeCompiler::fixed(artifact(
        bytecode(CONSTRUCTOR_COMPILED).unwrap(),
        constructor_runtime().unwrap(),
        storage_metadata(),
    ))
}

#[tokio::test]
async fn test_runtime_and_creation_perfect_match() {
    init_tracing();
    let chain = FakeChain::with_code(constructor_runtime().unwrap()).created_by(
        CREATOR,
        0,
        bytecode(CONSTRUCTOR_DEPLOYED).unwrap(),
    );
    let verifier = Verifier::new(storage_compiler(), chain);
    let mut contract = contract(storage_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap();

    assert_eq!(verdict.runtime_match, Some(MatchStatus::Perfect));
    assert_eq!(verdict.creation_match, Some(MatchStatus::Perfect));
    assert_eq!(verdict.chain_id, 1);
    assert_eq!(verdict.creator_tx_hash.as_deref(), Some(CREATOR_TX));
    assert_eq!(verdict.message, None);
    assert_eq!(
        verdict.abi_encoded_constructor_arguments.as_ref().map(|args| args.to_hex()),
        Some(format!("{:0>64}", "3039"))
    );

    // Both sides replay to the captured on-chain code.
    let template = bytecode(CONSTRUCTOR_COMPILED).unwrap();
    let replayed = replay(
        &template,
        &verdict.creation_transformations,
        &verdict.creation_transformation_values,
    )
    .unwrap();
    assert_eq!(Some(replayed), verdict.onchain_creation_bytecode);
    let runtime = constructor_runtime().unwrap();
    let replayed = replay(
        &runtime,
        &verdict.runtime_transformations,
        &verdict.runtime_transformation_values,
    )
    .unwrap();
    assert_eq!(Some(replayed), verdict.onchain_runtime_bytecode);

    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["runtimeMatch"], "perfect");
    assert_eq!(json["creationTransformations"][0]["type"], "insert");
    assert_eq!(json["creationTransformations"][0]["reason"], "constructor");
}

#[tokio::test]
async fn test_verification_is_idempotent() {
    let chain = FakeChain::with_code(constructor_runtime().unwrap()).created_by(
        CREATOR,
        0,
        bytecode(CONSTRUCTOR_DEPLOYED).unwrap(),
    );
    let verifier = Verifier::new(storage_compiler(), chain);
    let mut contract = contract(storage_metadata());

    let first = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap();
    let second = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_wrong_creator_keeps_runtime_verdict() {
    let chain = FakeChain::with_code(constructor_runtime().unwrap()).created_by(
        CREATOR,
        1,
        bytecode(CONSTRUCTOR_DEPLOYED).unwrap(),
    );
    let verifier = Verifier::new(storage_compiler(), chain);
    let mut contract = contract(storage_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap();
    assert_eq!(verdict.runtime_match, Some(MatchStatus::Perfect));
    assert_eq!(verdict.creation_match, None);
    assert!(verdict.message.unwrap().contains("doesn't match the expected address"));
}

#[tokio::test]
async fn test_missing_creation_code_is_reported() {
    // The transaction exists but the node cannot tell what it created.
    let mut chain = FakeChain::with_code(constructor_runtime().unwrap());
    chain.creator = Some(CreatorTransaction {
        sender: CREATOR.parse().unwrap(),
        nonce: 0,
    });
    let verifier = Verifier::new(storage_compiler(), chain);
    let mut contract = contract(storage_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap();
    assert_eq!(verdict.runtime_match, Some(MatchStatus::Perfect));
    assert_eq!(verdict.creation_match, None);
    assert_eq!(
        verdict.message.as_deref(),
        Some("Failed to match with creation bytecode: couldn't get the creation bytecode.")
    );
}

#[tokio::test]
async fn test_unreachable_chain_returns_a_message() {
    let chain = FakeChain {
        chain_id: 11155111,
        ..Default::default()
    };
    let verifier = Verifier::new(storage_compiler(), chain);
    let mut contract = contract(storage_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap();
    assert_eq!(verdict.runtime_match, None);
    assert_eq!(verdict.creation_match, None);
    assert_eq!(
        verdict.message.as_deref(),
        Some("Chain #11155111 is temporarily unavailable.")
    );
}

#[tokio::test]
async fn test_address_without_code_returns_a_message() {
    let verifier = Verifier::new(storage_compiler(), FakeChain::with_code(Bytecode::default()));
    let mut contract = contract(storage_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap();
    assert!(!verdict.is_verified());
    assert_eq!(
        verdict.message,
        Some(format!("Chain #1 does not have a contract deployed at {CREATED}."))
    );
}

#[tokio::test]
async fn test_abstract_contract_is_an_error() {
    let compiler = FakeCompiler::fixed(artifact(
        Bytecode::default(),
        Bytecode::default(),
        storage_metadata(),
    ));
    let verifier = Verifier::new(compiler, FakeChain::with_code(constructor_runtime().unwrap()));
    let mut contract = contract(storage_metadata());

    let err = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AbstractContract));
    assert_eq!(
        err.to_string(),
        "The compiled contract bytecode is \"0x\". Are you trying to verify an abstract contract?"
    );
}

#[tokio::test]
async fn test_empty_creation_code_alone_is_abstract() {
    let compiler = FakeCompiler::fixed(artifact(
        Bytecode::default(),
        constructor_runtime().unwrap(),
        storage_metadata(),
    ));
    let chain = FakeChain::with_code(constructor_runtime().unwrap()).created_by(
        CREATOR,
        0,
        bytecode(CONSTRUCTOR_DEPLOYED).unwrap(),
    );
    let verifier = Verifier::new(compiler, chain);
    let mut contract = contract(storage_metadata());

    let err = verifier
        .verify(&mut contract, CREATED, Some(CREATOR_TX), Backend::Native)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AbstractContract));
}

#[tokio::test]
async fn test_unrelated_code_is_no_match() {
    let verifier = Verifier::new(
        storage_compiler(),
        FakeChain::with_code(Bytecode::parse("0x6080604052600080fd").unwrap()),
    );
    let mut contract = contract(storage_metadata());

    let err = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoMatch));
    assert_eq!(verifier.compiler().calls(), vec![Backend::Native]);
}

/// Runtime code whose body differs from the chain while the trailer agrees.
fn extra_file_input_case(version: &str, optimizer: bool) -> (FakeCompiler, FakeChain, crucible_verification::Metadata) {
    let trailer = ipfs_trailer(&[0x12; 34]);
    let onchain = concat(&[&Bytecode::parse("0x6001600055").unwrap(), &trailer]);
    let recompiled = concat(&[&Bytecode::parse("0x6002600055").unwrap(), &trailer]);
    let metadata = metadata(
        version,
        json!({"optimizer": {"enabled": optimizer, "runs": 200}}),
        json!([]),
    );
    let compiler = FakeCompiler::fixed(artifact(
        Bytecode::parse("0x6080").unwrap(),
        recompiled,
        metadata.clone(),
    ));
    (compiler, FakeChain::with_code(onchain), metadata)
}

#[tokio::test]
async fn test_extra_file_input_bug_is_flagged() {
    let (compiler, chain, metadata) = extra_file_input_case("0.6.12+commit.27d51765", true);
    let verifier = Verifier::new(compiler, chain);
    let mut contract = contract(metadata);

    let verdict = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap();
    assert_eq!(verdict.runtime_match, Some(MatchStatus::ExtraFileInputBug));
    assert_eq!(verdict.creation_match, None);
    assert!(verdict.message.unwrap().contains("v0.6.12 or v0.7.0"));
}

#[tokio::test]
async fn test_extra_file_input_bug_needs_affected_version_and_optimizer() {
    for (version, optimizer) in [
        ("0.6.11+commit.5ef660b1", true),
        ("0.6.12+commit.27d51765", false),
    ] {
        let (compiler, chain, metadata) = extra_file_input_case(version, optimizer);
        let verifier = Verifier::new(compiler, chain);
        let mut contract = contract(metadata);
        let err = verifier
            .verify(&mut contract, CREATED, None, Backend::Native)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoMatch), "{version} {optimizer}");
    }
}

fn via_ir_metadata() -> crucible_verification::Metadata {
    metadata(
        "0.8.18+commit.87f61d96",
        json!({"optimizer": {"enabled": false, "runs": 200}, "viaIR": true}),
        serde_json::from_str(CONSTRUCTOR_ABI).unwrap(),
    )
}

#[tokio::test]
async fn test_alternate_backend_is_tried_once() {
    let runtime = constructor_runtime().unwrap();
    let compiler = FakeCompiler::new(move |contract, backend| {
        let code = match backend {
            Backend::Alternate => runtime.clone(),
            Backend::Native => Bytecode::parse("0x6080604052600080fd").unwrap(),
        };
        artifact(Bytecode::parse("0x6080").unwrap(), code, contract.metadata.clone())
    });
    let verifier = Verifier::new(compiler, FakeChain::with_code(constructor_runtime().unwrap()));
    let mut contract = contract(via_ir_metadata());

    let verdict = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap();
    assert_eq!(verdict.runtime_match, Some(MatchStatus::Perfect));
    assert_eq!(verifier.compiler().calls(), vec![Backend::Native, Backend::Alternate]);
}

#[tokio::test]
async fn test_alternate_backend_retry_is_bounded() {
    let compiler = FakeCompiler::new(|contract, _| {
        artifact(
            Bytecode::parse("0x6080").unwrap(),
            Bytecode::parse("0x6080604052600080fd").unwrap(),
            contract.metadata.clone(),
        )
    });
    let verifier = Verifier::new(compiler, FakeChain::with_code(constructor_runtime().unwrap()));
    let mut contract = contract(via_ir_metadata());

    let err = verifier
        .verify(&mut contract, CREATED, None, Backend::Native)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoMatch));
    assert_eq!(verifier.compiler().calls(), vec![Backend::Native, Backend::Alternate]);
}

#[tokio::test]
async fn test_create2_deployment() {
    let compiler = FakeCompiler::fixed(artifact(
        Bytecode::parse("0x00").unwrap(),
        Bytecode::parse("0x00").unwrap(),
        storage_metadata(),
    ));
    let verifier = Verifier::new(compiler, FakeChain::default());
    let contract = contract(storage_metadata());
    let deployer = "0x0000000000000000000000000000000000000000";

    let verdict = verifier
        .verify_create2(
            &contract,
            deployer,
            "0x00",
            "0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38",
            None,
        )
        .await
        .unwrap();
    assert_eq!(verdict.address, "0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38");
    assert_eq!(verdict.chain_id, 0);
    assert_eq!(verdict.runtime_match, Some(MatchStatus::Perfect));
    assert_eq!(verdict.creation_match, None);
    let args = verdict.create2_args.unwrap();
    assert_eq!(args.deployer_address, deployer);
    assert_eq!(args.salt, "0x00");

    let err = verifier
        .verify_create2(&contract, deployer, "0x01", "0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Create2AddressMismatch { .. }));
}
