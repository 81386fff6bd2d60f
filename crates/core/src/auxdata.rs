//! CBOR metadata trailers ("auxdata") appended by solc and vyper.
//!
//! The compiler appends a CBOR map followed by its length as a 2-byte big-endian integer.
//! The map usually carries a content hash of the metadata file (`ipfs`, `bzzr0` or `bzzr1`)
//! and the compiler version. Splitting follows the canonical-length path only: if the
//! length suffix does not point at a decodable CBOR map, the code has no auxdata.

use crate::bytecode::Bytecode;
use crate::hex_bytes::HexBytes;
use crate::result::{Error, Result};
use ciborium::Value;
use serde::{Serialize, Serializer};
use std::fmt;

/// Hex digits taken by the trailing length field.
const LENGTH_SUFFIX_LEN: usize = 4;

/// Compiler version as encoded in the trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerVersion {
    /// Release builds encode `[major, minor, patch]` as three raw bytes.
    Release(Vec<u8>),
    /// Prereleases and some toolchains store a full version string.
    Text(String),
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerVersion::Release(bytes) if bytes.len() == 3 => {
                write!(f, "{}.{}.{}", bytes[0], bytes[1], bytes[2])
            }
            CompilerVersion::Release(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            CompilerVersion::Text(version) => f.write_str(version),
        }
    }
}

impl Serialize for CompilerVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Decoded content of a CBOR metadata trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CborMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<HexBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bzzr0: Option<HexBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bzzr1: Option<HexBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solc: Option<CompilerVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vyper: Option<CompilerVersion>,
}

impl CborMetadata {
    /// True when the trailer carries a hash of the metadata file.
    pub fn has_content_hash(&self) -> bool {
        self.ipfs.is_some() || self.bzzr0.is_some() || self.bzzr1.is_some()
    }

    fn from_map(entries: Vec<(Value, Value)>) -> Self {
        let mut metadata = CborMetadata::default();
        for (key, value) in entries {
            let Value::Text(key) = key else {
                continue;
            };
            match (key.as_str(), value) {
                ("ipfs", Value::Bytes(bytes)) => metadata.ipfs = Some(bytes.into()),
                ("bzzr0", Value::Bytes(bytes)) => metadata.bzzr0 = Some(bytes.into()),
                ("bzzr1", Value::Bytes(bytes)) => metadata.bzzr1 = Some(bytes.into()),
                ("experimental", Value::Bool(flag)) => metadata.experimental = Some(flag),
                ("solc", version) => metadata.solc = compiler_version(version),
                ("vyper", version) => metadata.vyper = compiler_version(version),
                (other, _) => tracing::debug!("ignoring auxdata key {}", other),
            }
        }
        metadata
    }
}

fn compiler_version(value: Value) -> Option<CompilerVersion> {
    match value {
        Value::Bytes(bytes) => Some(CompilerVersion::Release(bytes)),
        Value::Text(text) => Some(CompilerVersion::Text(text)),
        _ => None,
    }
}

/// Locates the trailer and decodes its CBOR map.
///
/// Returns the hex offset where the trailer starts together with the map entries. The
/// body in front of the trailer must be non-empty.
fn locate(code: &Bytecode) -> Option<(usize, Vec<(Value, Value)>)> {
    let hex = code.as_str();
    if hex.len() < LENGTH_SUFFIX_LEN {
        return None;
    }

    let suffix = &hex[hex.len() - LENGTH_SUFFIX_LEN..];
    let cbor_len = usize::from_str_radix(suffix, 16).ok()?;
    let trailer_len = cbor_len * 2 + LENGTH_SUFFIX_LEN;
    if trailer_len >= hex.len() {
        tracing::debug!(
            "auxdata length {} does not fit in {} byte code",
            cbor_len,
            code.byte_len()
        );
        return None;
    }

    let start = hex.len() - trailer_len;
    let raw = hex::decode(&hex[start..hex.len() - LENGTH_SUFFIX_LEN]).ok()?;
    match ciborium::from_reader::<Value, _>(raw.as_slice()) {
        Ok(Value::Map(entries)) => Some((start, entries)),
        Ok(_) => {
            tracing::debug!("auxdata candidate at {} is not a CBOR map", start);
            None
        }
        Err(err) => {
            tracing::debug!("auxdata candidate at {} is not CBOR: {}", start, err);
            None
        }
    }
}

/// Splits code into its body and the trailing auxdata (CBOR map plus length suffix).
///
/// When no decodable trailer is present the whole code is returned as the body.
pub fn split_auxdata(code: &Bytecode) -> (Bytecode, Option<Bytecode>) {
    match locate(code) {
        Some((start, _)) => (code.prefix(start), Some(code.suffix_from(start))),
        None => (code.clone(), None),
    }
}

/// Hex digits taken by the trailer (CBOR map plus length suffix) that starts `hex`.
///
/// `None` unless `hex` begins with a CBOR item whose length the following 2-byte suffix
/// confirms.
pub fn trailer_len(hex: &str) -> Option<usize> {
    let digits = hex.get(..hex.len() & !1)?;
    let raw = hex::decode(digits).ok()?;
    let mut rest = raw.as_slice();
    ciborium::from_reader::<Value, _>(&mut rest).ok()?;
    let cbor_len = raw.len() - rest.len();
    let suffix = rest.get(..2)?;
    if usize::from(u16::from_be_bytes([suffix[0], suffix[1]])) != cbor_len {
        return None;
    }
    Some((cbor_len + 2) * 2)
}

/// Decodes the trailing CBOR metadata.
pub fn decode_auxdata(code: &Bytecode) -> Result<CborMetadata> {
    let (_, entries) = locate(code).ok_or(Error::MissingAuxdata)?;
    Ok(CborMetadata::from_map(entries))
}

/// True when the code ends with a decodable trailer that carries a content hash.
pub fn ends_with_metadata_hash(code: &Bytecode) -> bool {
    decode_auxdata(code)
        .map(|metadata| metadata.has_content_hash())
        .unwrap_or(false)
}
