//! Crucible's verification engine
//!
//! Recompiles a contract from its metadata and sources, compares the result with the
//! code deployed on chain, and records every difference it reconciles as a replayable
//! transformation.

pub mod artifact;
pub mod chain;
pub mod compiler;
pub mod fallback;
pub mod matcher;
pub mod metadata;
pub mod result;
pub mod verdict;
pub mod verifier;

pub use artifact::CompiledArtifact;
pub use compiler::Backend;
pub use metadata::{CheckedContract, Metadata};
pub use result::{ChainError, CompilerError, Error, Result};
pub use verdict::{Create2Args, Match, MatchStatus};
pub use verifier::Verifier;
