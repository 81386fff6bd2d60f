//! Module for the `auxdata` subcommand, which decodes the CBOR metadata trailer that
//! solc and vyper append to bytecode.

use super::read_bytecode;
use async_trait::async_trait;
use clap::Args;
use crucible_core::auxdata::{decode_auxdata, split_auxdata};
use std::error::Error;

/// Arguments for the `auxdata` subcommand.
#[derive(Args)]
pub struct AuxdataArgs {
    /// Bytecode as a hex string (0x...) or file path containing hex.
    pub input: String,
    /// Print the raw trailer hex instead of the decoded fields.
    #[arg(long)]
    raw: bool,
}

#[async_trait]
impl super::Command for AuxdataArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let code = read_bytecode(&self.input)?;
        if self.raw {
            match split_auxdata(&code) {
                (_, Some(auxdata)) => println!("{auxdata}"),
                (_, None) => return Err("bytecode has no CBOR metadata trailer".into()),
            }
            return Ok(());
        }

        let metadata = decode_auxdata(&code)?;
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        Ok(())
    }
}
