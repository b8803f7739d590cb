//! The outer polling loop tying the components together.
//!
//! Each cycle: wait for consensus, refresh the epoch, then either
//! monitor an active validator, run one activation attempt, or log that
//! the attempt is suppressed for this epoch. The loop has no terminal
//! state of its own; it runs until shutdown is signalled. Shutdown is
//! only observed at sleep points (including the stake wait inside an
//! attempt), never between the epoch marker write and the submission.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::AgentConfig;
use crate::consensus::ConsensusGate;
use crate::engine::{ActivationEngine, ActivationOutcome};
use crate::epoch::{self, EpochStore};
use crate::faucet::FaucetApi;
use crate::funding::FundingManager;
use crate::keys::ValidatorIdentity;
use crate::metrics::{ACTIVATED, CYCLE_ERRORS, EPOCH_NUMBER, LAST_ATTEMPTED_EPOCH};
use crate::monitor::ActivityMonitor;
use crate::node::NodeClient;

pub struct Driver<N, F> {
    node: Arc<N>,
    faucet: Arc<F>,
    identity: ValidatorIdentity,
    epochs: EpochStore,
    gate: ConsensusGate,
    engine: ActivationEngine,
    monitor: ActivityMonitor,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<N, F> Driver<N, F>
where
    N: NodeClient,
    F: FaucetApi,
{
    pub fn new(
        node: Arc<N>,
        faucet: Arc<F>,
        identity: ValidatorIdentity,
        epochs: EpochStore,
        config: &AgentConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            node,
            faucet,
            identity,
            epochs,
            gate: ConsensusGate::new(
                config.consensus_stable_count,
                config.consensus_poll_interval,
            ),
            engine: ActivationEngine::new(
                FundingManager::new(config.stake_poll_interval),
                config.min_stake,
            ),
            monitor: ActivityMonitor::new(config.monitor_interval),
            poll_interval: config.poll_interval,
            shutdown,
        }
    }

    #[instrument(name = "driver::run", skip_all, fields(address = %self.identity.address))]
    pub async fn run(self) {
        info!("validator activation driver started");
        if let Ok(Some(last)) = self.epochs.last_attempt() {
            gauge!(LAST_ATTEMPTED_EPOCH).set(last as f64);
        }

        let mut shutdown = self.shutdown.clone();
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.gate.wait_for_established(self.node.as_ref()) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        // Sender gone; nothing can ever stop us cleanly.
                        break;
                    }
                    continue;
                }
            }

            self.cycle(&mut shutdown).await;

            // The cycle may have consumed the shutdown notification
            // (stake wait, monitor); do not sleep a full interval on it.
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        info!("validator activation driver stopped");
    }

    async fn cycle(&self, shutdown: &mut watch::Receiver<bool>) {
        let epoch = match self.node.epoch_number().await {
            Ok(epoch) => {
                gauge!(EPOCH_NUMBER).set(epoch as f64);
                epoch
            }
            Err(err) => {
                warn!(error = %err, "could not read epoch number, skipping cycle");
                counter!(CYCLE_ERRORS, "stage" => "epoch").increment(1);
                return;
            }
        };

        // The node's wallet should match the configured identity;
        // anything else means the agent is pointed at the wrong node.
        match self.node.address().await {
            Ok(address) if address != self.identity.address => warn!(
                node_address = %address,
                "node wallet address differs from configured identity"
            ),
            Ok(_) => {}
            Err(err) => debug!(error = %err, "could not resolve node wallet address"),
        }

        let active = match self.node.active_validators().await {
            Ok(active) => active.iter().any(|a| a == &self.identity.address),
            Err(err) => {
                warn!(error = %err, "could not read active validators, skipping cycle");
                counter!(CYCLE_ERRORS, "stage" => "status").increment(1);
                return;
            }
        };

        if active {
            gauge!(ACTIVATED, "address" => self.identity.address.clone()).set(1.0);
            self.monitor
                .watch(self.node.as_ref(), &self.identity.address, shutdown)
                .await;
            return;
        }

        let last = match self.epochs.last_attempt() {
            Ok(last) => last,
            Err(err) => {
                warn!(error = %err, "could not read epoch marker, skipping cycle");
                counter!(CYCLE_ERRORS, "stage" => "epoch_store").increment(1);
                return;
            }
        };

        if !epoch::eligible(last, epoch) {
            info!(epoch, ?last, "activation already attempted this epoch, suppressing");
            return;
        }

        match self
            .engine
            .run(
                self.node.as_ref(),
                self.faucet.as_ref(),
                &self.identity,
                &self.epochs,
                epoch,
                shutdown,
            )
            .await
        {
            ActivationOutcome::Submitted { epoch, tx_hash } => {
                info!(epoch, %tx_hash, "activation submitted");
            }
            // Already logged and counted by the engine; the next
            // eligible epoch retries.
            ActivationOutcome::Failed { .. } => {}
            // The loop observes the shutdown flag at its top and exits.
            ActivationOutcome::Aborted => {}
        }
    }
}
