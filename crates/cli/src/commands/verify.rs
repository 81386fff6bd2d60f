//! Module for the `verify` subcommand, which recompiles a contract from its metadata and
//! sources and matches it against deployed bytecode.
//!
//! Sources are given as `--source <PATH>`, matched to metadata entries by file name, or as
//! `--source <COMPILATION_PATH>=<PATH>` when file names are ambiguous.

use super::CliError;
use async_trait::async_trait;
use clap::Args;
use crucible_verification::chain::{JsonRpcChain, RpcConfig};
use crucible_verification::compiler::{SolcCompiler, SolcConfig};
use crucible_verification::{Backend, CheckedContract, Metadata, Verifier};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arguments for the `verify` subcommand.
#[derive(Args)]
pub struct VerifyArgs {
    /// Solidity metadata JSON file.
    #[arg(long)]
    pub metadata: String,
    /// Source file, optionally prefixed with its compilation path (`path=file`).
    #[arg(long = "source", value_name = "SOURCE")]
    pub sources: Vec<String>,
    /// Address under verification.
    #[arg(long)]
    pub address: String,
    /// Hash of the transaction that created the contract.
    #[arg(long)]
    pub creator_tx: Option<String>,
    /// JSON-RPC endpoints, tried in order.
    #[arg(long = "rpc", env = "CRUCIBLE_RPC_URL", value_delimiter = ',', default_value = "http://127.0.0.1:8545")]
    pub rpc_urls: Vec<String>,
    #[arg(long, default_value_t = 1)]
    pub chain_id: u64,
    /// RPC request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
    /// Directory for downloaded compiler builds.
    #[arg(long, env = "CRUCIBLE_SOLC_CACHE")]
    pub solc_cache: Option<PathBuf>,
    /// Command that runs the alternate (JavaScript) compiler build.
    #[arg(long, env = "CRUCIBLE_ALT_RUNNER")]
    pub alt_runner: Option<String>,
    /// Compile with the alternate backend from the start.
    #[arg(long)]
    pub alternate: bool,
    /// Verify a CREATE2 deployment from this deployer instead of querying the chain.
    #[arg(long, requires = "salt")]
    pub deployer: Option<String>,
    /// CREATE2 salt as 0x-prefixed hex or a decimal number.
    #[arg(long)]
    pub salt: Option<String>,
    /// ABI-encoded constructor arguments of a CREATE2 deployment.
    #[arg(long)]
    pub constructor_args: Option<String>,
}

#[async_trait]
impl super::Command for VerifyArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        // Step 1: Load metadata and sources
        let metadata = Metadata::from_json(&std::fs::read_to_string(&self.metadata)?)?;
        let sources = load_sources(&metadata, &self.sources)?;
        let mut contract = CheckedContract::new(metadata, sources)?;

        // Step 2: Build collaborators
        let mut solc = SolcConfig::default();
        if let Some(dir) = self.solc_cache {
            solc.cache_dir = dir;
        }
        solc.alternate_runner = self.alt_runner;
        let chain = JsonRpcChain::new(RpcConfig {
            chain_id: self.chain_id,
            urls: self.rpc_urls,
            timeout: Duration::from_secs(self.timeout),
        })?;
        let verifier = Verifier::new(SolcCompiler::new(solc), chain);

        // Step 3: Verify
        let verdict = match (self.deployer, self.salt) {
            (Some(deployer), Some(salt)) => {
                verifier
                    .verify_create2(
                        &contract,
                        &deployer,
                        &salt,
                        &self.address,
                        self.constructor_args.as_deref(),
                    )
                    .await?
            }
            _ => {
                let backend = if self.alternate {
                    Backend::Alternate
                } else {
                    Backend::Native
                };
                verifier
                    .verify(&mut contract, &self.address, self.creator_tx.as_deref(), backend)
                    .await?
            }
        };

        println!("{}", serde_json::to_string_pretty(&verdict)?);
        Ok(())
    }
}

/// Maps `--source` arguments to compilation paths listed in the metadata.
fn load_sources(
    metadata: &Metadata,
    args: &[String],
) -> Result<BTreeMap<String, String>, CliError> {
    let mut sources = BTreeMap::new();
    for arg in args {
        let (path, file) = match arg.split_once('=') {
            Some((path, file)) => (path.to_string(), file),
            None => {
                let name = Path::new(arg).file_name().and_then(|name| name.to_str());
                let path = metadata
                    .sources
                    .keys()
                    .find(|key| Path::new(key).file_name().and_then(|n| n.to_str()) == name)
                    .ok_or_else(|| CliError::UnknownSource(arg.clone()))?;
                (path.clone(), arg.as_str())
            }
        };
        tracing::debug!("source {} from {}", path, file);
        sources.insert(path, std::fs::read_to_string(file)?);
    }
    Ok(sources)
}
