use async_trait::async_trait;
use clap::Subcommand;
use crucible_core::Bytecode;
use std::error::Error;
use std::path::Path;

pub mod address;
pub mod auxdata;
pub mod match_runtime;
pub mod replay;
pub mod verify;

use thiserror::Error;

/// Errors raised while preparing command input.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bytecode could not be read or parsed.
    #[error("bytecode error: {0}")]
    Bytecode(#[from] crucible_core::Error),
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// JSON input could not be parsed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A `--source` argument does not name a file listed in the metadata.
    #[error("source {0} is not listed in the metadata")]
    UnknownSource(String),
}

/// CLI subcommands for Crucible.
#[derive(Subcommand)]
pub enum Cmd {
    /// Recompile a contract and verify it against an address.
    Verify(verify::VerifyArgs),
    /// Match a runtime template against on-chain code offline.
    MatchRuntime(match_runtime::MatchRuntimeArgs),
    /// Derive CREATE and CREATE2 addresses.
    #[command(subcommand)]
    Address(address::AddressCmd),
    /// Rebuild on-chain code from a template and its transformations.
    Replay(replay::ReplayArgs),
    /// Decode the CBOR metadata trailer of bytecode.
    Auxdata(auxdata::AuxdataArgs),
}

/// Trait for executing CLI subcommands.
#[async_trait]
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Verify(args) => args.execute().await,
            Cmd::MatchRuntime(args) => args.execute().await,
            Cmd::Address(cmd) => cmd.execute().await,
            Cmd::Replay(args) => args.execute().await,
            Cmd::Auxdata(args) => args.execute().await,
        }
    }
}

/// Reads bytecode given either inline (`0x...`) or as a path to a file holding hex.
pub(crate) fn read_bytecode(input: &str) -> Result<Bytecode, CliError> {
    let is_file = !input.starts_with("0x") && Path::new(input).is_file();
    Ok(crucible_core::input_to_bytecode(input, is_file)?)
}

/// Reads and parses a JSON file.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
