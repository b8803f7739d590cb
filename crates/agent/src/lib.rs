//! Validator lifecycle automation.
//!
//! Brings a validator node online and keeps it registered as active:
//! waits for the node to establish consensus, ensures the operating
//! account is funded (via a test-network faucet), submits the one-time
//! new-validator transaction, then falls back to passive monitoring.
//!
//! Activation attempts are rate-limited to at most one per epoch via a
//! persisted epoch marker, and every node interaction goes through a
//! bounded-retry JSON-RPC gateway so a flaky or still-syncing node
//! never crashes the long-running process.

pub mod config;
pub mod consensus;
pub mod driver;
pub mod engine;
pub mod epoch;
pub mod faucet;
pub mod funding;
pub mod keys;
pub mod metrics;
pub mod monitor;
pub mod node;
pub mod rpc;
