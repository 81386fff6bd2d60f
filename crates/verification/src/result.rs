//! Verification results and error types

use thiserror::Error;

/// Main error type for verification operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("The compiled contract bytecode is \"0x\". Are you trying to verify an abstract contract?")]
    AbstractContract,
    #[error("The deployed and recompiled bytecode don't match.")]
    NoMatch,
    #[error(
        "The provided create2 address doesn't match the derived one. Expected: {derived} ; Received: {provided} ;"
    )]
    Create2AddressMismatch { derived: String, provided: String },
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("Compiler error: {0}")]
    Compiler(#[from] CompilerError),
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("Bytecode error: {0}")]
    Core(#[from] crucible_core::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of a [`Compiler`](crate::compiler::Compiler) collaborator.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("no runner configured for the {0} compiler backend")]
    BackendUnavailable(crate::compiler::Backend),
    #[error("invalid compiler version '{0}'")]
    InvalidVersion(String),
    #[error("failed to download solc {version}: {source}")]
    Download {
        version: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("solc {version} is not published for this platform")]
    NotPublished { version: String },
    #[error("compiler exited with {status}: {stderr}")]
    Process { status: String, stderr: String },
    #[error("compilation failed: {0}")]
    Compilation(String),
    #[error("compiler output has no contract {name} in {path}")]
    MissingContract { path: String, name: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Bytecode error: {0}")]
    Core(#[from] crucible_core::Error),
    #[error("Invalid metadata: {0}")]
    Metadata(String),
}

/// Failures of a [`Chain`](crate::chain::Chain) collaborator.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Chain #{0} is temporarily unavailable.")]
    Unavailable(u64),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid RPC endpoint {0}")]
    InvalidUrl(String),
    #[error("transaction {0} not found")]
    TransactionNotFound(String),
    #[error("Bytecode error: {0}")]
    Core(#[from] crucible_core::Error),
}

/// Result type for verification operations
pub type Result<T> = std::result::Result<T, Error>;
