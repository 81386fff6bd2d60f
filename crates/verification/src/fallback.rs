//! Search for metadata that explains an on-chain metadata hash.
//!
//! A partial match means the code agrees but the CBOR trailer does not. The usual causes
//! are source files that were normalized somewhere along the way (line endings, a final
//! newline) and optimizer settings that the deploying compiler ignored. Each candidate
//! here is checked against the on-chain hash before anything is recompiled.

use crate::metadata::{CheckedContract, source_keccak};
use crucible_core::Bytecode;
use crucible_core::auxdata::decode_auxdata;
use std::collections::BTreeMap;

/// Solc releases that silently ignore `optimizer.details.inliner`, so metadata declaring
/// it can hash differently from what was deployed.
fn ignores_inliner_setting(version: &semver::Version) -> bool {
    version.major == 0 && version.minor == 8 && (2..=4).contains(&version.patch)
}

/// Variants of a source file that editors and upload paths commonly produce.
fn source_variants(content: &str) -> Vec<String> {
    let lf = content.replace("\r\n", "\n");
    let crlf = lf.replace('\n', "\r\n");
    let mut variants = vec![lf.clone(), crlf.clone()];
    for base in [content, lf.as_str(), crlf.as_str()] {
        if let Some(trimmed) = base.strip_suffix("\r\n").or_else(|| base.strip_suffix('\n')) {
            variants.push(trimmed.to_string());
        } else {
            variants.push(format!("{base}\n"));
            variants.push(format!("{base}\r\n"));
        }
    }
    variants.retain(|variant| variant != content);
    variants.dedup();
    variants
}

/// Replaces each source whose content disagrees with its declared keccak256 with a
/// variant that agrees. `None` when nothing had to change.
fn normalized_sources(contract: &CheckedContract) -> Option<BTreeMap<String, String>> {
    let mut sources = contract.sources.clone();
    let mut changed = false;
    for (path, declared) in &contract.metadata.sources {
        let Some(content) = contract.sources.get(path) else {
            continue;
        };
        let declared = declared.keccak256.to_ascii_lowercase();
        if source_keccak(content) == declared {
            continue;
        }
        if let Some(variant) = source_variants(content)
            .into_iter()
            .find(|variant| source_keccak(variant) == declared)
        {
            tracing::debug!("source {} matches its declared hash after normalization", path);
            sources.insert(path.clone(), variant);
            changed = true;
        }
    }
    changed.then_some(sources)
}

fn candidates(contract: &CheckedContract) -> Vec<CheckedContract> {
    let mut candidates = Vec::new();

    if let Some(sources) = normalized_sources(contract) {
        candidates.push(CheckedContract {
            metadata: contract.metadata.clone(),
            sources,
        });
    }

    // The deploying compiler saw no `optimizer.details.inliner`.
    if let Ok(version) = contract.compiler_version()
        && ignores_inliner_setting(&version)
    {
        let mut candidate = contract.clone();
        let removed = candidate
            .metadata
            .settings
            .optimizer
            .as_mut()
            .and_then(|optimizer| optimizer.details.as_mut())
            .and_then(|details| details.remove("inliner"))
            .is_some();
        if removed {
            candidates.push(candidate);
        }
    }

    candidates
}

/// Finds a variant of `contract` whose metadata hash equals the IPFS hash embedded in
/// `onchain`, or `None` if the trailer carries no IPFS hash or no variant fits.
pub fn find_perfect_metadata(contract: &CheckedContract, onchain: &Bytecode) -> Option<CheckedContract> {
    let expected = match decode_auxdata(onchain) {
        Ok(decoded) => decoded.ipfs?.0,
        Err(err) => {
            tracing::debug!("on-chain auxdata is not decodable: {}", err);
            return None;
        }
    };

    let found = candidates(contract).into_iter().find(|candidate| {
        candidate != contract
            && candidate
                .metadata_ipfs_hash()
                .is_ok_and(|hash| hash == expected)
    });
    match &found {
        Some(_) => tracing::info!("found metadata for {} matching the on-chain hash", contract.name()),
        None => tracing::debug!("no metadata variant of {} matches the on-chain hash", contract.name()),
    }
    found
}
