//! The activation engine: one attempt to register the validator.
//!
//! A linear state machine per cycle: fund, import the account key,
//! unlock, optionally wait for stake, mark the epoch, submit. A failure
//! in any state aborts the cycle without in-cycle retry; activation is
//! a rare, high-stakes, non-idempotent on-chain action, so retrying at
//! epoch granularity is safer than fine-grained retries that could
//! double-submit. The epoch marker is written immediately *before*
//! submission (optimistic marking): a failed submission consumes the
//! epoch's attempt slot. Shutdown interrupts the stake wait and
//! abandons the attempt before the marker is written, so an
//! interrupted attempt does not consume the epoch.

use metrics::{counter, gauge};
use tokio::sync::watch;
use tracing::{error, info, instrument};

use crate::epoch::{EpochStore, EpochStoreError};
use crate::faucet::FaucetApi;
use crate::funding::FundingManager;
use crate::keys::ValidatorIdentity;
use crate::metrics::{ACTIVATED, CYCLE_ERRORS, LAST_ATTEMPTED_EPOCH};
use crate::node::{NodeClient, ValidatorRegistration};
use crate::rpc::RpcError;

/// The state an activation attempt failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Importing,
    Unlocking,
    /// Writing the epoch marker.
    Marking,
    Submitting,
}

impl EngineState {
    fn stage(self) -> &'static str {
        match self {
            EngineState::Importing => "import",
            EngineState::Unlocking => "unlock",
            EngineState::Marking => "mark",
            EngineState::Submitting => "submit",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    EpochStore(#[from] EpochStoreError),
}

/// Result of one activation attempt, consumed by logging and metrics.
#[derive(Debug)]
pub enum ActivationOutcome {
    Submitted { epoch: u64, tx_hash: String },
    Failed { state: EngineState, error: ActivationError },
    /// Shutdown was signalled mid-attempt, before the epoch marker was
    /// written.
    Aborted,
}

pub struct ActivationEngine {
    funding: FundingManager,
    /// Minimum balance to wait for before submitting; 0 disables the
    /// wait.
    min_stake: u64,
}

impl ActivationEngine {
    pub fn new(funding: FundingManager, min_stake: u64) -> Self {
        Self { funding, min_stake }
    }

    /// Runs one activation attempt for `epoch`. The caller has already
    /// established that the epoch is eligible and the validator is not
    /// active.
    #[instrument(name = "engine::run", skip_all, fields(address = %identity.address, epoch))]
    pub async fn run<N: NodeClient, F: FaucetApi>(
        &self,
        node: &N,
        faucet: &F,
        identity: &ValidatorIdentity,
        epochs: &EpochStore,
        epoch: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ActivationOutcome {
        self.funding
            .ensure_funded(node, faucet, &identity.address)
            .await;

        // Import and unlock unconditionally; unlocking an already
        // unlocked account is idempotent at the node level.
        info!("importing account key into the node wallet");
        if let Err(error) = node.import_raw_key(&identity.account_key).await {
            return Self::fail(EngineState::Importing, error.into());
        }

        info!("unlocking account");
        if let Err(error) = node.unlock_account(&identity.address).await {
            return Self::fail(EngineState::Unlocking, error.into());
        }

        if self.min_stake > 0
            && !self
                .funding
                .wait_for_stake(node, &identity.address, self.min_stake, shutdown)
                .await
        {
            info!("abandoning activation attempt for shutdown");
            return ActivationOutcome::Aborted;
        }

        // Mark the epoch before submitting so a crash racing the
        // in-flight transaction cannot double-submit next startup.
        if let Err(error) = epochs.record_attempt(epoch) {
            return Self::fail(EngineState::Marking, error.into());
        }
        gauge!(LAST_ATTEMPTED_EPOCH).set(epoch as f64);

        info!("submitting new-validator transaction");
        let registration = ValidatorRegistration {
            sender: identity.address.clone(),
            validator_address: identity.address.clone(),
            signing_key: identity.signing_key.clone(),
            voting_key: identity.voting_key.clone(),
            reward_address: identity.fee_address.clone(),
            signal_data: String::new(),
            fee: "0".to_string(),
        };
        match node.send_new_validator_transaction(&registration).await {
            Ok(tx_hash) => {
                gauge!(ACTIVATED, "address" => identity.address.clone()).set(1.0);
                info!(%tx_hash, "activation transaction accepted");
                ActivationOutcome::Submitted { epoch, tx_hash }
            }
            Err(error) => Self::fail(EngineState::Submitting, error.into()),
        }
    }

    fn fail(state: EngineState, error: ActivationError) -> ActivationOutcome {
        counter!(CYCLE_ERRORS, "stage" => state.stage()).increment(1);
        error!(stage = state.stage(), error = %error, "activation attempt failed");
        ActivationOutcome::Failed { state, error }
    }
}
