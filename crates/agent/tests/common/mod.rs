//! Scripted node and faucet fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use activator_agent::faucet::{FaucetApi, FaucetError};
use activator_agent::keys::ValidatorIdentity;
use activator_agent::node::{Account, NodeClient, Validator, ValidatorRegistration};
use activator_agent::rpc::RpcError;
use async_trait::async_trait;

pub const ADDRESS: &str = "NQ07 0000 0000 0000 0000 0000 0000 0000 0000";

pub fn identity() -> ValidatorIdentity {
    ValidatorIdentity {
        address: ADDRESS.to_string(),
        account_key: "deadbeef".to_string(),
        signing_key: "s1gn1ng".to_string(),
        voting_key: "v0t1ng".to_string(),
        fee_address: ADDRESS.to_string(),
    }
}

/// An RPC failure as the gateway reports it after exhausting retries.
pub fn rpc_failure(method: &'static str) -> RpcError {
    RpcError::EmptyResult { method }
}

#[derive(Default)]
pub struct FakeNode {
    pub address: String,
    /// Scripted consensus responses; drained scripts answer `true`.
    pub consensus_script: Mutex<VecDeque<Result<bool, ()>>>,
    pub consensus_polls: AtomicUsize,
    pub epoch: AtomicU64,
    pub epoch_polls: AtomicUsize,
    pub balance: AtomicU64,
    pub num_stakers: AtomicU64,
    pub active: Mutex<Vec<String>>,
    pub active_polls: AtomicUsize,
    /// Number of upcoming `active_validators` calls that should fail.
    pub fail_active: AtomicUsize,
    pub imported: Mutex<Vec<String>>,
    pub unlocked: Mutex<Vec<String>>,
    pub submissions: Mutex<Vec<ValidatorRegistration>>,
    pub fail_account: AtomicBool,
    pub fail_import: AtomicBool,
    pub fail_submit: AtomicBool,
    /// When set, a successful submission immediately activates the
    /// validator.
    pub activate_on_submit: AtomicBool,
}

impl FakeNode {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Self::default()
        }
    }

    pub fn script_consensus<I: IntoIterator<Item = Result<bool, ()>>>(&self, script: I) {
        self.consensus_script.lock().unwrap().extend(script);
    }

    pub fn set_active(&self, addresses: &[&str]) {
        *self.active.lock().unwrap() = addresses.iter().map(|a| a.to_string()).collect();
    }

    pub fn submissions(&self) -> Vec<ValidatorRegistration> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeClient for FakeNode {
    async fn is_consensus_established(&self) -> Result<bool, RpcError> {
        self.consensus_polls.fetch_add(1, Ordering::SeqCst);
        match self.consensus_script.lock().unwrap().pop_front() {
            Some(Ok(established)) => Ok(established),
            Some(Err(())) => Err(rpc_failure("isConsensusEstablished")),
            None => Ok(true),
        }
    }

    async fn epoch_number(&self) -> Result<u64, RpcError> {
        self.epoch_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    async fn address(&self) -> Result<String, RpcError> {
        Ok(self.address.clone())
    }

    async fn account_by_address(&self, _address: &str) -> Result<Option<Account>, RpcError> {
        if self.fail_account.load(Ordering::SeqCst) {
            return Err(rpc_failure("getAccountByAddress"));
        }
        Ok(Some(Account {
            balance: self.balance.load(Ordering::SeqCst),
        }))
    }

    async fn active_validators(&self) -> Result<Vec<String>, RpcError> {
        self.active_polls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(rpc_failure("getActiveValidators"));
        }
        Ok(self.active.lock().unwrap().clone())
    }

    async fn validator_by_address(&self, address: &str) -> Result<Option<Validator>, RpcError> {
        let active = self.active.lock().unwrap();
        if active.iter().any(|a| a == address) {
            Ok(Some(Validator {
                address: address.to_string(),
                balance: self.balance.load(Ordering::SeqCst),
                num_stakers: self.num_stakers.load(Ordering::SeqCst),
            }))
        } else {
            Ok(None)
        }
    }

    async fn import_raw_key(&self, key: &str) -> Result<String, RpcError> {
        if self.fail_import.load(Ordering::SeqCst) {
            return Err(RpcError::Node {
                method: "importRawKey",
                message: "wallet unavailable".to_string(),
            });
        }
        self.imported.lock().unwrap().push(key.to_string());
        Ok(self.address.clone())
    }

    async fn unlock_account(&self, address: &str) -> Result<(), RpcError> {
        self.unlocked.lock().unwrap().push(address.to_string());
        Ok(())
    }

    async fn send_new_validator_transaction(
        &self,
        registration: &ValidatorRegistration,
    ) -> Result<String, RpcError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(RpcError::Node {
                method: "sendNewValidatorTransaction",
                message: "mempool rejected transaction".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(registration.clone());
        if self.activate_on_submit.load(Ordering::SeqCst) {
            self.active
                .lock()
                .unwrap()
                .push(registration.validator_address.clone());
        }
        Ok("c0ffee".to_string())
    }
}

#[derive(Default)]
pub struct FakeFaucet {
    pub requests: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeFaucet {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FaucetApi for FakeFaucet {
    async fn request_funds(&self, address: &str) -> Result<(), FaucetError> {
        self.requests.lock().unwrap().push(address.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(FaucetError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(())
    }
}

/// Polls `condition` under paused time until it holds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("condition never held: {what}");
}
