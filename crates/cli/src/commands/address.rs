//! Module for the `address` subcommand, which derives contract addresses the way the EVM
//! does for `CREATE` and `CREATE2`.

use super::read_bytecode;
use async_trait::async_trait;
use clap::Subcommand;
use crucible_core::address::{checksum, create_address, create2_address, parse_address, parse_salt};
use std::error::Error;

/// Address derivations.
#[derive(Subcommand)]
pub enum AddressCmd {
    /// Address created by `sender` at transaction `nonce`.
    Create {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        nonce: u64,
    },
    /// Address created by a `CREATE2` from `deployer`.
    Create2 {
        #[arg(long)]
        deployer: String,
        /// Salt as 0x-prefixed hex or a decimal number.
        #[arg(long)]
        salt: String,
        /// Creation bytecode as a hex string (0x...) or file path containing hex.
        #[arg(long)]
        init_code: String,
        /// ABI-encoded constructor arguments appended to the creation bytecode.
        #[arg(long)]
        constructor_args: Option<String>,
    },
}

#[async_trait]
impl super::Command for AddressCmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let address = match self {
            AddressCmd::Create { sender, nonce } => create_address(parse_address(&sender)?, nonce),
            AddressCmd::Create2 {
                deployer,
                salt,
                init_code,
                constructor_args,
            } => {
                let code = read_bytecode(&init_code)?.to_bytes()?;
                let args = match constructor_args {
                    Some(args) => read_bytecode(&args)?.to_bytes()?,
                    None => Vec::new(),
                };
                create2_address(parse_address(&deployer)?, parse_salt(&salt)?, &code, &args)
            }
        };
        println!("{}", checksum(&address));
        Ok(())
    }
}
