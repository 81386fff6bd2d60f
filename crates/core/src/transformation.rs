//! Byte-level edits that turn a recompiled template into the code found on chain.
//!
//! A verified match is stored as template + transformations + values. Offsets are in hex
//! digits of the un-prefixed template, so every edit lands on a byte boundary.

use crate::auxdata::trailer_len;
use crate::bytecode::{Bytecode, PLACEHOLDER_LEN};
use crate::hex_bytes::HexBytes;
use crate::result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hex digits covered by a call-protection transformation (`PUSH20` plus the address).
pub const CALL_PROTECTION_LEN: usize = 42;

/// Opcode prefix of the call-protection guard.
pub const CALL_PROTECTION_OPCODE: &str = "73";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransformationKind {
    Insert,
    Replace,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransformationReason {
    Constructor,
    Library,
    Immutable,
    Auxdata,
    CallProtection,
}

impl TransformationReason {
    fn as_str(&self) -> &'static str {
        match self {
            TransformationReason::Constructor => "constructor",
            TransformationReason::Library => "library",
            TransformationReason::Immutable => "immutable",
            TransformationReason::Auxdata => "auxdata",
            TransformationReason::CallProtection => "call-protection",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Transformation {
    #[serde(rename = "type")]
    pub kind: TransformationKind,
    pub reason: TransformationReason,
    /// Offset in hex digits.
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Transformation {
    pub fn constructor(offset: usize) -> Self {
        Self {
            kind: TransformationKind::Insert,
            reason: TransformationReason::Constructor,
            offset,
            id: None,
        }
    }

    pub fn library(offset: usize, id: impl Into<String>) -> Self {
        Self::replace(TransformationReason::Library, offset, Some(id.into()))
    }

    pub fn immutable(offset: usize, id: impl Into<String>) -> Self {
        Self::replace(TransformationReason::Immutable, offset, Some(id.into()))
    }

    pub fn auxdata(offset: usize, id: impl Into<String>) -> Self {
        Self::replace(TransformationReason::Auxdata, offset, Some(id.into()))
    }

    pub fn call_protection() -> Self {
        Self::replace(TransformationReason::CallProtection, 0, None)
    }

    fn replace(reason: TransformationReason, offset: usize, id: Option<String>) -> Self {
        Self {
            kind: TransformationKind::Replace,
            reason,
            offset,
            id,
        }
    }
}

/// Payload needed to replay a transformation list.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransformationValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_arguments: Option<HexBytes>,
    /// Placeholder text to library address.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libraries: BTreeMap<String, HexBytes>,
    /// AST id to the value found on chain.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub immutables: BTreeMap<String, HexBytes>,
    /// Auxdata index to the on-chain trailer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cbor_auxdata: BTreeMap<String, HexBytes>,
    /// Address written into the call-protection guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_protection: Option<HexBytes>,
}

impl TransformationValues {
    pub fn is_empty(&self) -> bool {
        self.constructor_arguments.is_none()
            && self.libraries.is_empty()
            && self.immutables.is_empty()
            && self.cbor_auxdata.is_empty()
            && self.call_protection.is_none()
    }

    /// Hex text a transformation writes into the template.
    fn replacement(&self, transformation: &Transformation) -> Result<String> {
        let missing = || Error::MissingValue {
            reason: transformation.reason.as_str().to_owned(),
            id: transformation.id.clone(),
        };
        let keyed = |map: &BTreeMap<String, HexBytes>| {
            transformation
                .id
                .as_ref()
                .and_then(|id| map.get(id))
                .map(HexBytes::to_hex)
                .ok_or_else(missing)
        };

        match transformation.reason {
            TransformationReason::Constructor => self
                .constructor_arguments
                .as_ref()
                .map(HexBytes::to_hex)
                .ok_or_else(missing),
            TransformationReason::Library => keyed(&self.libraries),
            TransformationReason::Immutable => keyed(&self.immutables),
            TransformationReason::Auxdata => keyed(&self.cbor_auxdata),
            TransformationReason::CallProtection => self
                .call_protection
                .as_ref()
                .map(|address| format!("{CALL_PROTECTION_OPCODE}{}", address.to_hex()))
                .ok_or_else(missing),
        }
    }
}

/// Rebuilds the on-chain code from a template and a recorded transformation list.
///
/// Replacements are applied first, then insertions. Both run from the highest offset down
/// so earlier offsets stay valid. An auxdata replacement swaps the template's whole
/// trailer, which may differ in length from the recorded one.
pub fn replay(
    template: &Bytecode,
    transformations: &[Transformation],
    values: &TransformationValues,
) -> Result<Bytecode> {
    let mut code = template.as_str().to_owned();

    let mut replacements: Vec<&Transformation> = transformations
        .iter()
        .filter(|t| t.kind == TransformationKind::Replace)
        .collect();
    replacements.sort_by(|a, b| b.offset.cmp(&a.offset));
    for transformation in replacements {
        let replacement = values.replacement(transformation)?;
        let out_of_bounds = || Error::TransformationOutOfBounds(transformation.offset);
        let width = match transformation.reason {
            TransformationReason::Library => PLACEHOLDER_LEN,
            TransformationReason::CallProtection => CALL_PROTECTION_LEN,
            TransformationReason::Auxdata => code
                .get(transformation.offset..)
                .and_then(trailer_len)
                .ok_or_else(out_of_bounds)?,
            _ => replacement.len(),
        };
        if transformation.reason != TransformationReason::Auxdata && replacement.len() != width {
            return Err(out_of_bounds());
        }
        let end = transformation.offset + width;
        if end > code.len() || !code.is_char_boundary(transformation.offset) {
            return Err(out_of_bounds());
        }
        code.replace_range(transformation.offset..end, &replacement);
    }

    let mut inserts: Vec<&Transformation> = transformations
        .iter()
        .filter(|t| t.kind == TransformationKind::Insert)
        .collect();
    inserts.sort_by(|a, b| b.offset.cmp(&a.offset));
    for transformation in inserts {
        let insertion = values.replacement(transformation)?;
        if transformation.offset > code.len() {
            return Err(Error::TransformationOutOfBounds(transformation.offset));
        }
        code.insert_str(transformation.offset, &insertion);
    }

    tracing::debug!(
        "replayed {} transformations onto {} byte template",
        transformations.len(),
        template.byte_len()
    );
    Bytecode::parse(&code)
}
