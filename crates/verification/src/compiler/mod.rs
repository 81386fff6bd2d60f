//! Recompilation of checked contracts.

pub mod cache;
pub mod input;
pub mod solc;

use crate::artifact::CompiledArtifact;
use crate::metadata::CheckedContract;
use crate::result::CompilerError;
use async_trait::async_trait;
use std::fmt;

pub use cache::{BinaryFetcher, CompilerCache, HttpFetcher};
pub use solc::{SolcCompiler, SolcConfig};

/// Which build of the compiler runs the compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Platform-native `solc` binary.
    #[default]
    Native,
    /// The JavaScript/WASM build, which differs from native builds for some old
    /// `viaIR` compilations.
    Alternate,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => f.write_str("native"),
            Backend::Alternate => f.write_str("alternate"),
        }
    }
}

#[async_trait]
pub trait Compiler: Send + Sync {
    async fn recompile(
        &self,
        contract: &CheckedContract,
        backend: Backend,
    ) -> Result<CompiledArtifact, CompilerError>;
}
