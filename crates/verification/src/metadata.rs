//! Solidity metadata model and the contract bundle that gets recompiled.
//!
//! The metadata file is what the CBOR trailer hashes, so fields that are not modelled
//! explicitly are carried through `extra` maps and survive a round trip unchanged.

use crate::result::{Error, Result};
use alloy::json_abi::{Constructor, JsonAbi};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use std::collections::BTreeMap;

/// Largest file hashed as a single UnixFS block.
const IPFS_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Metadata {
    pub compiler: CompilerInfo,
    pub language: String,
    pub output: Output,
    pub settings: Settings,
    pub sources: BTreeMap<String, MetadataSource>,
    pub version: u64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CompilerInfo {
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Output {
    #[serde(default)]
    pub abi: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub compilation_target: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libraries: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<Optimizer>,
    #[serde(default, rename = "viaIR", skip_serializing_if = "Option::is_none")]
    pub via_ir: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remappings: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Optimizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MetadataSource {
    pub keccak256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: Metadata = serde_json::from_str(json)?;
        if metadata.settings.compilation_target.len() != 1 {
            return Err(Error::InvalidMetadata(format!(
                "expected exactly one compilation target, found {}",
                metadata.settings.compilation_target.len()
            )));
        }
        Ok(metadata)
    }

    /// Constructor declared in `output.abi`, if any.
    pub fn constructor_abi(&self) -> Option<Constructor> {
        match serde_json::from_value::<JsonAbi>(self.output.abi.clone()) {
            Ok(abi) => abi.constructor,
            Err(err) => {
                tracing::warn!("could not parse ABI: {}", err);
                None
            }
        }
    }

    /// Compact JSON with object keys sorted at every level, as solc emits it.
    ///
    /// Going through [`Value`] sorts the keys: `serde_json::Map` is ordered.
    pub fn to_canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string(&value)?)
    }
}

/// IPFS (CIDv0) multihash of a file: `0x12 0x20 ‖ sha256` of its UnixFS dag-pb node.
///
/// Only the single-block layout is produced; files above 256 KiB would be chunked by IPFS.
pub fn ipfs_hash(data: &[u8]) -> Vec<u8> {
    if data.len() > IPFS_CHUNK_SIZE {
        tracing::warn!(
            "{} byte file exceeds one IPFS block; hash will not match a chunked upload",
            data.len()
        );
    }

    let length = varint(data.len());
    let mut unixfs = vec![0x08, 0x02];
    if !data.is_empty() {
        unixfs.push(0x12);
        unixfs.extend_from_slice(&length);
        unixfs.extend_from_slice(data);
    }
    unixfs.push(0x18);
    unixfs.extend_from_slice(&length);

    let mut node = vec![0x0a];
    node.extend_from_slice(&varint(unixfs.len()));
    node.extend_from_slice(&unixfs);

    let mut hash = vec![0x12, 0x20];
    hash.extend_from_slice(&Sha256::digest(&node));
    hash
}

fn varint(mut value: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// `0x`-prefixed keccak256 of a source file, as recorded in `sources.*.keccak256`.
pub fn source_keccak(content: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(content.as_bytes())))
}

/// Metadata plus the source files it names.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckedContract {
    pub metadata: Metadata,
    /// Compilation path to file content.
    pub sources: BTreeMap<String, String>,
}

impl CheckedContract {
    /// Bundles metadata with sources, filling in literal contents embedded in the metadata.
    pub fn new(metadata: Metadata, mut sources: BTreeMap<String, String>) -> Result<Self> {
        if metadata.settings.compilation_target.is_empty() {
            return Err(Error::InvalidMetadata("missing compilation target".into()));
        }
        for (path, source) in &metadata.sources {
            if let Some(content) = &source.content {
                sources.entry(path.clone()).or_insert_with(|| content.clone());
            }
        }
        Ok(Self { metadata, sources })
    }

    fn target(&self) -> (&str, &str) {
        self.metadata
            .settings
            .compilation_target
            .iter()
            .next()
            .map(|(path, name)| (path.as_str(), name.as_str()))
            .unwrap_or(("", ""))
    }

    /// Contract name from the compilation target.
    pub fn name(&self) -> &str {
        self.target().1
    }

    /// Source path of the compilation target.
    pub fn compiled_path(&self) -> &str {
        self.target().0
    }

    /// Full compiler version, e.g. `0.8.18+commit.87f61d96`.
    pub fn compiler_version(&self) -> Result<semver::Version> {
        let raw = self.metadata.compiler.version.trim_start_matches('v');
        semver::Version::parse(raw).map_err(|err| {
            Error::InvalidMetadata(format!("compiler version '{raw}': {err}"))
        })
    }

    pub fn optimizer_enabled(&self) -> bool {
        self.metadata
            .settings
            .optimizer
            .as_ref()
            .and_then(|optimizer| optimizer.enabled)
            .unwrap_or(false)
    }

    pub fn via_ir(&self) -> bool {
        self.metadata.settings.via_ir.unwrap_or(false)
    }

    /// Constructor declared in the metadata ABI, if any.
    pub fn constructor_abi(&self) -> Option<Constructor> {
        self.metadata.constructor_abi()
    }

    /// Hash the compiler would embed in the CBOR trailer for this metadata.
    pub fn metadata_ipfs_hash(&self) -> Result<Vec<u8>> {
        Ok(ipfs_hash(self.metadata.to_canonical_json()?.as_bytes()))
    }
}
