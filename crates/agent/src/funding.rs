//! Account funding: a one-shot faucet tap for empty accounts and an
//! unbounded wait for a minimum stake threshold.

use std::time::Duration;

use metrics::gauge;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::faucet::FaucetApi;
use crate::metrics::BALANCE;
use crate::node::NodeClient;

pub struct FundingManager {
    stake_poll_interval: Duration,
}

impl FundingManager {
    pub fn new(stake_poll_interval: Duration) -> Self {
        Self {
            stake_poll_interval,
        }
    }

    /// Requests funds from the faucet if the account is absent or
    /// empty. Issues at most one request and does not wait for the
    /// funds to land; the next cycle re-checks naturally. Failures here
    /// are never fatal.
    #[instrument(name = "funding::ensure_funded", skip(self, node, faucet))]
    pub async fn ensure_funded<N: NodeClient, F: FaucetApi>(
        &self,
        node: &N,
        faucet: &F,
        address: &str,
    ) {
        let balance = match node.account_by_address(address).await {
            Ok(account) => account.map_or(0, |a| a.balance),
            Err(err) => {
                // Cannot tell; skip the tap rather than risk a spurious
                // faucet request, the next cycle re-checks.
                warn!(error = %err, "could not read account balance");
                return;
            }
        };
        gauge!(BALANCE, "address" => address.to_string()).set(balance as f64);

        if balance > 0 {
            debug!(balance, "account already funded");
            return;
        }

        info!("account unfunded, requesting funds from faucet");
        if let Err(err) = faucet.request_funds(address).await {
            warn!(error = %err, "faucet request failed");
        }
    }

    /// Blocks until the account balance reaches `threshold`, exporting
    /// the balance every iteration. Unbounded by design: the staking
    /// requirement is policy, not something the agent can time out on.
    /// Returns `false` if shutdown is signalled before the threshold is
    /// reached.
    #[instrument(name = "funding::wait_for_stake", skip(self, node, shutdown))]
    pub async fn wait_for_stake<N: NodeClient>(
        &self,
        node: &N,
        address: &str,
        threshold: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            match node.account_by_address(address).await {
                Ok(account) => {
                    let balance = account.map_or(0, |a| a.balance);
                    gauge!(BALANCE, "address" => address.to_string()).set(balance as f64);
                    if balance >= threshold {
                        info!(balance, threshold, "stake threshold reached");
                        return true;
                    }
                    debug!(balance, threshold, "waiting for stake");
                }
                Err(err) => warn!(error = %err, "balance poll failed, still waiting"),
            }
            tokio::select! {
                _ = tokio::time::sleep(self.stake_poll_interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        info!("shutdown requested while waiting for stake");
                        return false;
                    }
                }
            }
        }
    }
}
