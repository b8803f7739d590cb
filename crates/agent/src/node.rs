//! Typed surface over the node's JSON-RPC methods.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::rpc::{RpcClient, RpcError, Transport};

/// A basic account as reported by `getAccountByAddress`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub balance: u64,
}

/// Validator details as reported by `getValidatorByAddress`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub address: String,
    /// Own deposit plus delegated stake.
    #[serde(default)]
    pub balance: u64,
    #[serde(default)]
    pub num_stakers: u64,
}

/// Everything needed to register a new validator on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRegistration {
    pub sender: String,
    pub validator_address: String,
    pub signing_key: String,
    pub voting_key: String,
    pub reward_address: String,
    pub signal_data: String,
    pub fee: String,
}

impl ValidatorRegistration {
    fn params(&self) -> Value {
        json!([
            self.sender,
            self.validator_address,
            self.signing_key,
            self.voting_key,
            self.reward_address,
            self.signal_data,
            self.fee,
        ])
    }
}

/// The node methods the agent consumes, behind a seam so tests can
/// script node behavior.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn is_consensus_established(&self) -> Result<bool, RpcError>;
    async fn epoch_number(&self) -> Result<u64, RpcError>;
    /// Address of the node's configured wallet.
    async fn address(&self) -> Result<String, RpcError>;
    async fn account_by_address(&self, address: &str) -> Result<Option<Account>, RpcError>;
    /// Addresses of all currently active validators.
    async fn active_validators(&self) -> Result<Vec<String>, RpcError>;
    async fn validator_by_address(&self, address: &str) -> Result<Option<Validator>, RpcError>;
    /// Imports raw private key material into the node's wallet and
    /// returns the derived address.
    async fn import_raw_key(&self, key: &str) -> Result<String, RpcError>;
    async fn unlock_account(&self, address: &str) -> Result<(), RpcError>;
    /// Submits the new-validator transaction and returns its hash.
    async fn send_new_validator_transaction(
        &self,
        registration: &ValidatorRegistration,
    ) -> Result<String, RpcError>;
}

/// [`NodeClient`] over the bounded-retry JSON-RPC gateway.
pub struct HttpNodeClient<T> {
    rpc: RpcClient<T>,
}

impl<T: Transport> HttpNodeClient<T> {
    pub fn new(rpc: RpcClient<T>) -> Self {
        Self { rpc }
    }

    async fn typed<D: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<D, RpcError> {
        let data = self.rpc.invoke(method, params).await?;
        serde_json::from_value(data).map_err(|e| RpcError::Decode {
            method,
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl<T: Transport> NodeClient for HttpNodeClient<T> {
    async fn is_consensus_established(&self) -> Result<bool, RpcError> {
        self.typed("isConsensusEstablished", json!([])).await
    }

    async fn epoch_number(&self) -> Result<u64, RpcError> {
        self.typed("getEpochNumber", json!([])).await
    }

    async fn address(&self) -> Result<String, RpcError> {
        self.typed("getAddress", json!([])).await
    }

    async fn account_by_address(&self, address: &str) -> Result<Option<Account>, RpcError> {
        match self.typed("getAccountByAddress", json!([address])).await {
            Ok(account) => Ok(Some(account)),
            Err(RpcError::EmptyResult { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn active_validators(&self) -> Result<Vec<String>, RpcError> {
        let method = "getActiveValidators";
        let data = self.rpc.invoke(method, json!([])).await?;
        let Value::Array(items) = data else {
            return Err(RpcError::Decode {
                method,
                detail: "expected an array of validators".into(),
            });
        };
        // Depending on the node version this is either a list of
        // addresses or a list of validator objects.
        let mut addresses = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(address) => addresses.push(address),
                Value::Object(map) => {
                    if let Some(Value::String(address)) = map.get("address") {
                        addresses.push(address.clone());
                    }
                }
                other => warn!(?other, "skipping unrecognized active validator entry"),
            }
        }
        Ok(addresses)
    }

    async fn validator_by_address(&self, address: &str) -> Result<Option<Validator>, RpcError> {
        match self.typed("getValidatorByAddress", json!([address])).await {
            Ok(validator) => Ok(Some(validator)),
            // Unknown validators come back as an empty result or as a
            // node-level error, both of which just mean "not registered".
            Err(RpcError::EmptyResult { .. }) | Err(RpcError::Node { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn import_raw_key(&self, key: &str) -> Result<String, RpcError> {
        self.typed("importRawKey", json!([key])).await
    }

    async fn unlock_account(&self, address: &str) -> Result<(), RpcError> {
        self.rpc.invoke_void("unlockAccount", json!([address])).await
    }

    async fn send_new_validator_transaction(
        &self,
        registration: &ValidatorRegistration,
    ) -> Result<String, RpcError> {
        self.typed("sendNewValidatorTransaction", registration.params())
            .await
    }
}
