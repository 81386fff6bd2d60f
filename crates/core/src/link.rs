//! Reconciles the deploy-time regions of a template with real code.
//!
//! Three kinds of region are filled in after compilation: library placeholders, the
//! call-protection guard of libraries, and immutable values. Each helper returns the
//! adjusted code together with the transformations and values needed to replay it.

use crate::bytecode::{Bytecode, PLACEHOLDER_LEN, PLACEHOLDER_MARKER};
use crate::hex_bytes::HexBytes;
use crate::result::{Error, Result};
use crate::transformation::{CALL_PROTECTION_LEN, CALL_PROTECTION_OPCODE, Transformation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Byte range of one immutable reference in runtime code.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ImmutableReference {
    pub start: usize,
    pub length: usize,
}

/// AST id of an immutable variable to its references, as emitted by solc.
pub type ImmutableReferences = BTreeMap<String, Vec<ImmutableReference>>;

/// Template with its library placeholders resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedCode {
    pub code: Bytecode,
    /// Placeholder text to the 20-byte address found in the real code.
    pub libraries: BTreeMap<String, HexBytes>,
    pub transformations: Vec<Transformation>,
}

/// Substitutes every library placeholder in `template` with the address at the same
/// offset of `real`.
///
/// Placeholders are resolved one at a time: the first marker is read, all occurrences of
/// its placeholder text are replaced, and the scan restarts. One `library` transformation
/// is recorded per occurrence, keyed by the placeholder text.
pub fn resolve_libraries(template: &Bytecode, real: &Bytecode) -> Result<LinkedCode> {
    let mut code = template.as_str().to_owned();
    let real = real.as_str();
    let mut libraries = BTreeMap::new();
    let mut transformations = Vec::new();

    while let Some(offset) = code.find(PLACEHOLDER_MARKER) {
        let end = offset + PLACEHOLDER_LEN;
        let placeholder = code
            .get(offset..end)
            .ok_or(Error::PlaceholderOutOfBounds(offset))?
            .to_owned();
        let address = real
            .get(offset..end)
            .ok_or(Error::PlaceholderOutOfBounds(offset))?;
        let bytes = hex::decode(address).map_err(|_| Error::InvalidLibraryAddress(offset))?;

        let occurrences: Vec<usize> = code
            .match_indices(placeholder.as_str())
            .map(|(index, _)| index)
            .collect();
        tracing::debug!(
            "linking {} at {} occurrence(s) to 0x{}",
            placeholder,
            occurrences.len(),
            address
        );
        for index in occurrences {
            transformations.push(Transformation::library(index, placeholder.clone()));
        }

        code = code.replace(placeholder.as_str(), address);
        libraries.insert(placeholder, HexBytes(bytes));
    }

    transformations.sort_by_key(|t| t.offset);
    Ok(LinkedCode {
        code: Bytecode::from_normalized(code),
        libraries,
        transformations,
    })
}

/// Template with its call-protection guard filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallProtection {
    pub code: Bytecode,
    /// Address copied from the real code.
    pub address: HexBytes,
    pub transformation: Transformation,
}

/// Copies the library self-address guard (`PUSH20 <address>`) from `real` into `template`.
///
/// Returns `None` unless the template starts with `PUSH20` and twenty zero bytes and the
/// real code starts with `PUSH20` and an address.
pub fn patch_call_protection(template: &Bytecode, real: &Bytecode) -> Option<CallProtection> {
    let zeroed = format!("{CALL_PROTECTION_OPCODE}{}", "0".repeat(PLACEHOLDER_LEN));
    if !template.as_str().starts_with(&zeroed) {
        return None;
    }

    let guard = real.as_str().get(..CALL_PROTECTION_LEN)?;
    let address = guard.strip_prefix(CALL_PROTECTION_OPCODE)?;
    let bytes = hex::decode(address).ok()?;

    let mut code = String::with_capacity(template.len());
    code.push_str(guard);
    code.push_str(&template.as_str()[CALL_PROTECTION_LEN..]);
    tracing::debug!("patched call protection with 0x{}", address);

    Some(CallProtection {
        code: Bytecode::from_normalized(code),
        address: HexBytes(bytes),
        transformation: Transformation::call_protection(),
    })
}

/// On-chain code with immutable values replaced by zeros.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZeroedCode {
    pub code: Bytecode,
    /// AST id to the value of its first reference.
    pub values: BTreeMap<String, HexBytes>,
    pub transformations: Vec<Transformation>,
}

/// Zeroes every immutable reference in `onchain`, recording one `immutable`
/// transformation per reference at `start * 2`.
pub fn zero_immutables(references: &ImmutableReferences, onchain: &Bytecode) -> Result<ZeroedCode> {
    let mut code = onchain.as_str().to_owned();
    let mut values = BTreeMap::new();
    let mut transformations = Vec::new();

    for (id, ranges) in references {
        for reference in ranges {
            let start = reference.start * 2;
            let end = start + reference.length * 2;
            let out_of_bounds = || Error::ImmutableOutOfBounds {
                id: id.clone(),
                start: reference.start,
                length: reference.length,
            };
            let value = code.get(start..end).ok_or_else(out_of_bounds)?;

            if !values.contains_key(id) {
                let bytes = hex::decode(value).map_err(|_| out_of_bounds())?;
                values.insert(id.clone(), HexBytes(bytes));
            }
            code.replace_range(start..end, &"0".repeat(end - start));
            transformations.push(Transformation::immutable(start, id.clone()));
        }
    }

    transformations.sort_by_key(|t| t.offset);
    tracing::debug!("zeroed {} immutable reference(s)", transformations.len());
    Ok(ZeroedCode {
        code: Bytecode::from_normalized(code),
        values,
        transformations,
    })
}
