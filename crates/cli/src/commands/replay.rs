//! Module for the `replay` subcommand, which applies recorded transformations to a
//! recompiled template and prints the resulting bytecode.

use super::{read_bytecode, read_json};
use async_trait::async_trait;
use clap::Args;
use crucible_core::transformation::replay;
use crucible_core::{Transformation, TransformationValues};
use std::error::Error;

/// Arguments for the `replay` subcommand.
#[derive(Args)]
pub struct ReplayArgs {
    /// Recompiled template as a hex string (0x...) or file path containing hex.
    #[arg(long)]
    pub template: String,
    /// JSON file with the list of transformations.
    #[arg(long)]
    pub transformations: String,
    /// JSON file with the transformation values.
    #[arg(long)]
    pub values: String,
    /// Compare the replayed code with this bytecode and fail on a difference.
    #[arg(long)]
    pub expect: Option<String>,
}

#[async_trait]
impl super::Command for ReplayArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let template = read_bytecode(&self.template)?;
        let transformations: Vec<Transformation> = read_json(&self.transformations)?;
        let values: TransformationValues = read_json(&self.values)?;

        let replayed = replay(&template, &transformations, &values)?;
        tracing::debug!(
            "applied {} transformations, {} -> {} bytes",
            transformations.len(),
            template.byte_len(),
            replayed.byte_len()
        );

        if let Some(expected) = self.expect {
            let expected = read_bytecode(&expected)?;
            if expected != replayed {
                return Err("replayed bytecode differs from the expected bytecode".into());
            }
            tracing::info!("replayed bytecode matches");
        }
        println!("{replayed}");
        Ok(())
    }
}
