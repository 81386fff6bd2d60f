//! Deployed-bytecode matcher.

use crate::verdict::MatchStatus;
use crucible_core::auxdata::{ends_with_metadata_hash, split_auxdata};
use crucible_core::link::{
    ImmutableReferences, patch_call_protection, resolve_libraries, zero_immutables,
};
use crucible_core::{Bytecode, HexBytes, Transformation, TransformationValues};
use std::collections::BTreeMap;

/// Result of comparing a recompiled runtime template with on-chain code.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeOutcome {
    /// `None` when the codes could not be reconciled.
    pub status: Option<MatchStatus>,
    pub onchain: Bytecode,
    pub transformations: Vec<Transformation>,
    pub values: TransformationValues,
    pub library_map: BTreeMap<String, HexBytes>,
    pub immutable_references: Option<ImmutableReferences>,
}

impl RuntimeOutcome {
    fn unmatched(onchain: &Bytecode) -> Self {
        Self {
            onchain: onchain.clone(),
            ..Default::default()
        }
    }
}

/// Compares `template` with `onchain`, reconciling call protection, libraries, immutables
/// and the metadata trailer in that order.
pub fn match_runtime(
    template: &Bytecode,
    onchain: &Bytecode,
    immutables: Option<&ImmutableReferences>,
) -> RuntimeOutcome {
    let mut transformations = Vec::new();
    let mut values = TransformationValues::default();

    let mut code = template.clone();
    if let Some(patched) = patch_call_protection(template, onchain) {
        code = patched.code;
        transformations.push(patched.transformation);
        values.call_protection = Some(patched.address);
    }

    let linked = match resolve_libraries(&code, onchain) {
        Ok(linked) => linked,
        Err(err) => {
            tracing::debug!("runtime library resolution failed: {}", err);
            return RuntimeOutcome::unmatched(onchain);
        }
    };
    transformations.extend(linked.transformations);
    values.libraries = linked.libraries.clone();

    let immutables = immutables.filter(|references| !references.is_empty());
    let comparable = match immutables {
        Some(references) => match zero_immutables(references, onchain) {
            Ok(zeroed) => {
                transformations.extend(zeroed.transformations);
                values.immutables = zeroed.values;
                zeroed.code
            }
            Err(err) => {
                tracing::debug!("immutable zeroing failed: {}", err);
                return RuntimeOutcome::unmatched(onchain);
            }
        },
        None => onchain.clone(),
    };

    let status = if linked.code == comparable {
        if ends_with_metadata_hash(onchain) {
            if let (_, Some(auxdata)) = split_auxdata(onchain) {
                values
                    .cbor_auxdata
                    .insert("0".into(), HexBytes(auxdata.to_bytes().unwrap_or_default()));
            }
            MatchStatus::Perfect
        } else {
            MatchStatus::Partial
        }
    } else {
        let (onchain_body, onchain_auxdata) = split_auxdata(&comparable);
        let (template_body, template_auxdata) = split_auxdata(&linked.code);
        // Trailers may differ in length, e.g. an ipfs hash recompiled against bzzr1.
        match (onchain_auxdata, template_auxdata) {
            (Some(_), Some(_)) if onchain_body == template_body => {
                let auxdata = onchain.suffix_from(template_body.len());
                let Ok(bytes) = auxdata.to_bytes() else {
                    return RuntimeOutcome::unmatched(onchain);
                };
                transformations.push(Transformation::auxdata(template_body.len(), "0"));
                values.cbor_auxdata.insert("0".into(), HexBytes(bytes));
                MatchStatus::Partial
            }
            _ => {
                tracing::debug!("runtime bodies differ");
                return RuntimeOutcome::unmatched(onchain);
            }
        }
    };

    tracing::debug!("runtime match: {:?}", status);
    RuntimeOutcome {
        status: Some(status),
        onchain: onchain.clone(),
        transformations,
        values,
        library_map: linked.libraries,
        immutable_references: immutables.cloned(),
    }
}
