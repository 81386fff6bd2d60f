//! Access to on-chain state needed for verification.

pub mod rpc;

use crate::result::ChainError;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use crucible_core::Bytecode;

pub use rpc::{JsonRpcChain, RpcConfig};

/// Sender and nonce of the transaction that created a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatorTransaction {
    pub sender: Address,
    pub nonce: u64,
}

#[async_trait]
pub trait Chain: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Runtime code at `address`; an empty [`Bytecode`] when nothing is deployed.
    async fn deployed_bytecode(&self, address: Address) -> Result<Bytecode, ChainError>;

    async fn transaction(&self, hash: B256) -> Result<CreatorTransaction, ChainError>;

    /// Input that created `address` in transaction `hash`, when the node can tell.
    async fn creation_bytecode(
        &self,
        address: Address,
        hash: B256,
    ) -> Result<Option<Bytecode>, ChainError>;
}
