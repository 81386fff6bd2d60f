//! Output of one recompilation.

use crate::metadata::Metadata;
use crucible_core::Bytecode;
use crucible_core::link::ImmutableReferences;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub creation_bytecode: Bytecode,
    pub runtime_bytecode: Bytecode,
    /// Metadata the compiler actually emitted; settings may have been stripped from the input.
    pub metadata: Metadata,
    #[serde(default)]
    pub immutable_references: ImmutableReferences,
}

impl CompiledArtifact {
    /// Abstract contracts and interfaces compile to `0x`.
    pub fn is_empty(&self) -> bool {
        self.creation_bytecode.is_empty() || self.runtime_bytecode.is_empty()
    }
}
