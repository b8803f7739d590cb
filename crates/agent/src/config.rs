//! Agent configuration, passed into each component at construction.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::rpc::RpcSettings;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Node JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Faucet tap endpoint for funding on test networks.
    pub faucet_url: Url,
    /// Sleep between driver cycles.
    pub poll_interval: Duration,
    /// Sleep between consensus polls.
    pub consensus_poll_interval: Duration,
    /// Consecutive positive consensus polls required before acting.
    pub consensus_stable_count: u32,
    /// Sleep between activity monitor samples.
    pub monitor_interval: Duration,
    /// Sleep between stake threshold polls.
    pub stake_poll_interval: Duration,
    /// Minimum balance to wait for before submitting the activation
    /// transaction; 0 disables the wait.
    pub min_stake: u64,
    /// File holding the last attempted epoch.
    pub epoch_file: PathBuf,
    /// Account key dump (`Address:` / `Private Key:` lines).
    pub address_key_file: PathBuf,
    /// Signing key dump (`Private Key:` line).
    pub signing_key_file: PathBuf,
    /// BLS voting key dump (`Public Key:` line).
    pub voting_key_file: PathBuf,
    pub rpc: RpcSettings,
}

impl AgentConfig {
    /// Defaults for everything except endpoints and key file locations.
    pub fn new(rpc_url: Url, faucet_url: Url) -> Self {
        Self {
            rpc_url,
            faucet_url,
            poll_interval: Duration::from_secs(600),
            consensus_poll_interval: Duration::from_secs(5),
            consensus_stable_count: 3,
            monitor_interval: Duration::from_secs(60),
            stake_poll_interval: Duration::from_secs(60),
            min_stake: 0,
            epoch_file: PathBuf::from("/keys/last_epoch"),
            address_key_file: PathBuf::from("/keys/address.txt"),
            signing_key_file: PathBuf::from("/keys/signing.txt"),
            voting_key_file: PathBuf::from("/keys/bls.txt"),
            rpc: RpcSettings::default(),
        }
    }
}
