//! Module for the `match-runtime` subcommand, which runs the deployed-bytecode matcher on
//! two codes without a compiler or a chain.

use super::{read_bytecode, read_json};
use async_trait::async_trait;
use clap::Args;
use crucible_core::link::ImmutableReferences;
use crucible_verification::matcher::match_runtime;
use serde_json::json;
use std::error::Error;

/// Arguments for the `match-runtime` subcommand.
#[derive(Args)]
pub struct MatchRuntimeArgs {
    /// Recompiled runtime bytecode as a hex string (0x...) or file path containing hex.
    #[arg(long)]
    pub template: String,
    /// On-chain runtime bytecode as a hex string (0x...) or file path containing hex.
    #[arg(long)]
    pub onchain: String,
    /// JSON file with solc's `immutableReferences` for the template.
    #[arg(long)]
    pub immutables: Option<String>,
}

#[async_trait]
impl super::Command for MatchRuntimeArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let template = read_bytecode(&self.template)?;
        let onchain = read_bytecode(&self.onchain)?;
        let immutables: Option<ImmutableReferences> =
            self.immutables.as_deref().map(read_json).transpose()?;

        let outcome = match_runtime(&template, &onchain, immutables.as_ref());
        let report = json!({
            "runtimeMatch": outcome.status,
            "runtimeTransformations": outcome.transformations,
            "runtimeTransformationValues": outcome.values,
            "libraryMap": outcome.library_map,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
