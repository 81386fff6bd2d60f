//! The verdict for one contract at one address.

use crate::matcher::creation::CreationOutcome;
use crate::matcher::runtime::RuntimeOutcome;
use crucible_core::link::ImmutableReferences;
use crucible_core::{Bytecode, HexBytes, Transformation, TransformationValues};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    Perfect,
    Partial,
    ExtraFileInputBug,
    Error,
}

/// Inputs of a verified `CREATE2` deployment.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Create2Args {
    pub deployer_address: String,
    pub salt: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub address: String,
    pub chain_id: u64,
    pub runtime_match: Option<MatchStatus>,
    pub creation_match: Option<MatchStatus>,
    pub runtime_transformations: Vec<Transformation>,
    pub creation_transformations: Vec<Transformation>,
    pub runtime_transformation_values: TransformationValues,
    pub creation_transformation_values: TransformationValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_runtime_bytecode: Option<Bytecode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_creation_bytecode: Option<Bytecode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub library_map: BTreeMap<String, HexBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable_references: Option<ImmutableReferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_encoded_constructor_arguments: Option<HexBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create2_args: Option<Create2Args>,
}

impl Match {
    pub fn new(address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            address: address.into(),
            chain_id,
            ..Default::default()
        }
    }

    pub fn is_verified(&self) -> bool {
        self.runtime_match.is_some() || self.creation_match.is_some()
    }

    /// Records a deployed-bytecode attempt.
    ///
    /// The on-chain code is always kept. Transformations and values only replace the
    /// current runtime side when the attempt produced a verdict.
    pub fn apply_runtime(&mut self, outcome: RuntimeOutcome) {
        self.onchain_runtime_bytecode = Some(outcome.onchain);
        let Some(status) = outcome.status else {
            return;
        };
        self.runtime_match = Some(status);
        self.runtime_transformations = outcome.transformations;
        self.runtime_transformation_values = outcome.values;
        self.library_map = outcome.library_map;
        self.immutable_references = outcome.immutable_references;
    }

    /// Records a creation-bytecode attempt.
    pub fn apply_creation(&mut self, outcome: CreationOutcome) {
        if let Some(message) = outcome.message {
            self.message = Some(message);
        }
        if outcome.onchain.is_some() {
            self.onchain_creation_bytecode = outcome.onchain;
        }
        self.creation_match = outcome.status;
        if outcome.status.is_none() {
            return;
        }
        self.creation_transformations = outcome.transformations;
        self.creation_transformation_values = outcome.values;
        if !outcome.library_map.is_empty() {
            self.library_map = outcome.library_map;
        }
        self.abi_encoded_constructor_arguments = outcome.abi_encoded_constructor_arguments;
    }
}
