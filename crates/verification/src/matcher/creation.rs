//! Creation-bytecode matcher.
//!
//! The on-chain side is the creation transaction input: creation code followed by
//! ABI-encoded constructor arguments. Matching uses a prefix relation and the trailing
//! arguments are validated by decoding and re-encoding them.

use crate::chain::CreatorTransaction;
use crate::verdict::MatchStatus;
use alloy::dyn_abi::JsonAbiExt;
use alloy::json_abi::Constructor;
use crucible_core::address::{checksum, create_address, same_address};
use crucible_core::auxdata::{ends_with_metadata_hash, split_auxdata};
use crucible_core::link::resolve_libraries;
use crucible_core::{Bytecode, HexBytes, Transformation, TransformationValues};
use std::collections::BTreeMap;

const FAILURE_PREFIX: &str = "Failed to match with creation bytecode";

/// Result of comparing a recompiled creation template with a creation transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreationOutcome {
    pub status: Option<MatchStatus>,
    pub onchain: Option<Bytecode>,
    pub transformations: Vec<Transformation>,
    pub values: TransformationValues,
    pub library_map: BTreeMap<String, HexBytes>,
    pub abi_encoded_constructor_arguments: Option<HexBytes>,
    pub message: Option<String>,
}

impl CreationOutcome {
    /// No verdict, with a diagnostic for the caller.
    pub fn failed(onchain: Option<&Bytecode>, message: impl Into<String>) -> Self {
        Self {
            onchain: onchain.cloned(),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    fn unmatched(onchain: &Bytecode) -> Self {
        Self {
            onchain: Some(onchain.clone()),
            ..Default::default()
        }
    }
}

/// Everything the creation matcher needs to know about the deployment.
#[derive(Clone, Copy, Debug)]
pub struct Deployment<'a> {
    /// Address under verification.
    pub address: &'a str,
    pub creator_tx_hash: &'a str,
    pub creator: &'a CreatorTransaction,
}

/// Compares `template` with the creation transaction input `onchain`.
pub fn match_creation(
    template: &Bytecode,
    onchain: &Bytecode,
    constructor: Option<&Constructor>,
    deployment: Deployment<'_>,
) -> CreationOutcome {
    if template.is_empty() {
        return CreationOutcome::failed(
            Some(onchain),
            format!("{FAILURE_PREFIX}: recompiled contract's creation bytecode is empty"),
        );
    }

    let linked = match resolve_libraries(template, onchain) {
        Ok(linked) => linked,
        Err(err) => {
            tracing::debug!("creation library resolution failed: {}", err);
            return CreationOutcome::unmatched(onchain);
        }
    };
    let mut transformations = linked.transformations;
    let mut values = TransformationValues {
        libraries: linked.libraries.clone(),
        ..Default::default()
    };
    let code = linked.code;

    let status = if onchain.starts_with(&code) {
        if ends_with_metadata_hash(&code) {
            MatchStatus::Perfect
        } else {
            MatchStatus::Partial
        }
    } else {
        let truncated = onchain.prefix(code.len());
        let (onchain_body, onchain_auxdata) = split_auxdata(&truncated);
        let (template_body, _) = split_auxdata(&code);
        match onchain_auxdata {
            Some(_) if onchain_body.starts_with(&template_body) => {
                let auxdata = truncated.suffix_from(template_body.len());
                let Ok(bytes) = auxdata.to_bytes() else {
                    return CreationOutcome::unmatched(onchain);
                };
                transformations.push(Transformation::auxdata(template_body.len(), "0"));
                values.cbor_auxdata.insert("0".into(), HexBytes(bytes));
                MatchStatus::Partial
            }
            _ => {
                tracing::debug!("creation bodies differ");
                return CreationOutcome::unmatched(onchain);
            }
        }
    };

    let arguments = onchain.suffix_from(code.len());
    let mut abi_encoded_constructor_arguments = None;
    if !arguments.is_empty() {
        let Some(constructor) = constructor else {
            return CreationOutcome::failed(
                Some(onchain),
                format!("{FAILURE_PREFIX}: constructor ABI Inputs are missing"),
            );
        };
        let blob = match arguments.to_bytes() {
            Ok(blob) => blob,
            Err(err) => {
                return CreationOutcome::failed(Some(onchain), format!("{FAILURE_PREFIX}: {err}"));
            }
        };
        if let Err(reason) = check_constructor_arguments(constructor, &blob) {
            return CreationOutcome::failed(
                Some(onchain),
                format!("{FAILURE_PREFIX}: constructor arguments ABI decoding failed {reason}"),
            );
        }

        transformations.push(Transformation::constructor(code.len()));
        values.constructor_arguments = Some(HexBytes(blob.clone()));
        abi_encoded_constructor_arguments = Some(HexBytes(blob));
    }

    let created = create_address(deployment.creator.sender, deployment.creator.nonce);
    if !same_address(&created.to_string(), deployment.address) {
        return CreationOutcome::failed(
            Some(onchain),
            format!(
                "The address being verified {} doesn't match the expected address of the contract {} that will be created by the transaction {}.",
                deployment.address,
                checksum(&created),
                deployment.creator_tx_hash
            ),
        );
    }

    tracing::debug!("creation match: {:?}", status);
    CreationOutcome {
        status: Some(status),
        onchain: Some(onchain.clone()),
        transformations,
        values,
        library_map: linked.libraries,
        abi_encoded_constructor_arguments,
        message: None,
    }
}

/// Decodes `blob` against the constructor inputs and requires the re-encoding to be
/// byte-identical, so permissive decoding of trailing garbage is rejected.
fn check_constructor_arguments(constructor: &Constructor, blob: &[u8]) -> Result<(), String> {
    let decoded = constructor
        .abi_decode_input(blob)
        .map_err(|err| err.to_string())?;
    let encoded = constructor
        .abi_encode_input(&decoded)
        .map_err(|err| err.to_string())?;
    if encoded != blob {
        return Err(format!(
            "0x{} vs 0x{}",
            hex::encode(&encoded),
            hex::encode(blob)
        ));
    }
    Ok(())
}
