//! Passive monitoring of an already-active validator.

use std::time::Duration;

use metrics::gauge;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{ACTIVATED, BALANCE, STAKER_COUNT, TOTAL_STAKE};
use crate::node::NodeClient;

pub struct ActivityMonitor {
    sample_interval: Duration,
}

impl ActivityMonitor {
    pub fn new(sample_interval: Duration) -> Self {
        Self { sample_interval }
    }

    /// Samples balance and stake signals while the validator stays
    /// active. Returns on the first *confirmed* inactive observation so
    /// the driver can fall back to the activation engine; a failed
    /// status poll is transient (the gateway already retried it) and
    /// keeps the watch going. Also returns when shutdown is signalled.
    #[instrument(name = "monitor::watch", skip(self, node, shutdown))]
    pub async fn watch<N: NodeClient>(
        &self,
        node: &N,
        address: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        info!("validator active, monitoring");
        loop {
            match node.active_validators().await {
                Ok(active) if !active.iter().any(|a| a == address) => {
                    gauge!(ACTIVATED, "address" => address.to_string()).set(0.0);
                    info!("validator no longer active");
                    return;
                }
                Ok(_) => self.sample(node, address).await,
                Err(err) => warn!(error = %err, "status poll failed, still watching"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.sample_interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn sample<N: NodeClient>(&self, node: &N, address: &str) {
        match node.account_by_address(address).await {
            Ok(account) => {
                let balance = account.map_or(0, |a| a.balance);
                gauge!(BALANCE, "address" => address.to_string()).set(balance as f64);
            }
            Err(err) => debug!(error = %err, "balance sample failed"),
        }

        match node.validator_by_address(address).await {
            Ok(Some(validator)) => {
                gauge!(TOTAL_STAKE, "address" => address.to_string())
                    .set(validator.balance as f64);
                gauge!(STAKER_COUNT, "address" => address.to_string())
                    .set(validator.num_stakers as f64);
            }
            Ok(None) => debug!("validator details not available"),
            Err(err) => debug!(error = %err, "stake sample failed"),
        }
    }
}
