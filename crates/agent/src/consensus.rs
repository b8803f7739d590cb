//! Consensus gate: blocks a cycle until the node's view of the chain
//! is stable enough to act on.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::node::NodeClient;

pub struct ConsensusGate {
    stable_count: u32,
    poll_interval: Duration,
}

impl ConsensusGate {
    pub fn new(stable_count: u32, poll_interval: Duration) -> Self {
        Self {
            stable_count,
            poll_interval,
        }
    }

    /// Polls `isConsensusEstablished` until it has been true
    /// `stable_count` times in a row. A false or failed poll resets the
    /// streak, debouncing consensus flaps during node startup. Never
    /// gives up; the validator must not act on an unreliable chain view.
    #[instrument(name = "consensus::wait", skip_all)]
    pub async fn wait_for_established<N: NodeClient>(&self, node: &N) {
        let mut streak = 0;
        loop {
            match node.is_consensus_established().await {
                Ok(true) => {
                    streak += 1;
                    debug!(streak, needed = self.stable_count, "consensus poll positive");
                    if streak >= self.stable_count {
                        info!("consensus established");
                        return;
                    }
                }
                Ok(false) => {
                    if streak > 0 {
                        debug!(lost_streak = streak, "consensus flapped");
                    }
                    streak = 0;
                }
                Err(err) => {
                    warn!(error = %err, "consensus poll failed");
                    streak = 0;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
