//! Ethereum JSON-RPC implementation of [`Chain`] on top of alloy providers.

use super::{Chain, CreatorTransaction};
use crate::result::ChainError;
use alloy::consensus::Transaction as _;
use alloy::network::TransactionResponse as _;
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Transaction;
use alloy::transports::{RpcError, TransportResult};
use async_trait::async_trait;
use crucible_core::Bytecode;
use crucible_core::address::same_address;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Endpoints and limits for [`JsonRpcChain`].
#[derive(Clone, Debug)]
pub struct RpcConfig {
    pub chain_id: u64,
    /// Tried in order; the next one is used when a request fails at the transport level.
    pub urls: Vec<String>,
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            urls: vec!["http://127.0.0.1:8545".to_string()],
            timeout: Duration::from_secs(30),
        }
    }
}

struct Endpoint {
    url: String,
    provider: DynProvider,
}

pub struct JsonRpcChain {
    config: RpcConfig,
    endpoints: Vec<Endpoint>,
}

impl JsonRpcChain {
    pub fn new(config: RpcConfig) -> Result<Self, ChainError> {
        let endpoints = config
            .urls
            .iter()
            .map(|url| {
                let parsed = reqwest::Url::parse(url)
                    .map_err(|err| ChainError::InvalidUrl(format!("{url}: {err}")))?;
                Ok(Endpoint {
                    url: url.clone(),
                    provider: ProviderBuilder::new().connect_http(parsed).erased(),
                })
            })
            .collect::<Result<Vec<_>, ChainError>>()?;
        Ok(Self { config, endpoints })
    }

    /// Runs `call` against each endpoint until one answers.
    ///
    /// A JSON-RPC error response is final; transport failures, undecodable responses and
    /// timeouts move on to the next endpoint.
    async fn request<T, F, Fut>(&self, method: &str, call: F) -> Result<T, ChainError>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        for endpoint in &self.endpoints {
            match tokio::time::timeout(self.config.timeout, call(endpoint.provider.clone())).await {
                Ok(Ok(value)) => {
                    tracing::debug!("{} answered by {}", method, endpoint.url);
                    return Ok(value);
                }
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    return Err(ChainError::Rpc {
                        code: payload.code,
                        message: payload.message.to_string(),
                    });
                }
                Ok(Err(err)) => tracing::warn!("{} via {} failed: {}", method, endpoint.url, err),
                Err(_) => tracing::warn!(
                    "{} via {} timed out after {:?}",
                    method,
                    endpoint.url,
                    self.config.timeout
                ),
            }
        }

        Err(ChainError::Unavailable(self.config.chain_id))
    }

    async fn fetch_transaction(&self, hash: B256) -> Result<Transaction, ChainError> {
        self.request("eth_getTransactionByHash", move |provider| async move {
            provider.get_transaction_by_hash(hash).await
        })
        .await?
        .ok_or_else(|| ChainError::TransactionNotFound(hash.to_string()))
    }
}

/// Init code of the `create` frame that deployed `target`, if the trace has one.
fn create_init<'a>(traces: &'a Value, target: &str) -> Option<&'a str> {
    traces.as_array()?.iter().find_map(|trace| {
        let is_create = trace.get("type").and_then(Value::as_str) == Some("create");
        let created = trace
            .pointer("/result/address")
            .and_then(Value::as_str)
            .is_some_and(|created| same_address(created, target));
        if is_create && created {
            trace.pointer("/action/init").and_then(Value::as_str)
        } else {
            None
        }
    })
}

#[async_trait]
impl Chain for JsonRpcChain {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn deployed_bytecode(&self, address: Address) -> Result<Bytecode, ChainError> {
        let code = self
            .request("eth_getCode", move |provider| async move {
                provider.get_code_at(address).await
            })
            .await?;
        Ok(Bytecode::from_bytes(&code))
    }

    async fn transaction(&self, hash: B256) -> Result<CreatorTransaction, ChainError> {
        let tx = self.fetch_transaction(hash).await?;
        Ok(CreatorTransaction {
            sender: tx.from(),
            nonce: tx.nonce(),
        })
    }

    async fn creation_bytecode(
        &self,
        address: Address,
        hash: B256,
    ) -> Result<Option<Bytecode>, ChainError> {
        let tx = self.fetch_transaction(hash).await?;
        if tx.to().is_none() {
            return Ok(Some(Bytecode::from_bytes(tx.input())));
        }

        // Created by a factory: find the matching create frame in the trace.
        let traces: Value = self
            .request("trace_transaction", move |provider| async move {
                provider
                    .raw_request::<_, Value>("trace_transaction".into(), (hash,))
                    .await
            })
            .await?;
        let target = address.to_string();
        match create_init(&traces, &target) {
            Some(init) => Ok(Some(Bytecode::parse(init)?)),
            None => {
                tracing::debug!("no create trace for {} in {}", target, hash);
                Ok(None)
            }
        }
    }
}
