//! Metric names and registration.

use metrics::{describe_counter, describe_gauge};

/// Set to 1 once an activation transaction for the address has been
/// accepted by the node.
pub const ACTIVATED: &str = "activator_activated";
/// Last epoch in which an activation was attempted.
pub const LAST_ATTEMPTED_EPOCH: &str = "activator_last_attempted_epoch";
/// Epoch number as reported by the node each cycle.
pub const EPOCH_NUMBER: &str = "activator_epoch_number";
/// Current balance of the operating account.
pub const BALANCE: &str = "activator_balance";
/// Total stake held by the validator (own deposit plus delegations).
pub const TOTAL_STAKE: &str = "activator_total_stake";
/// Number of stakers delegating to the validator.
pub const STAKER_COUNT: &str = "activator_staker_count";
/// RPC attempts that failed and were retried, per method.
pub const RPC_RETRIES: &str = "activator_rpc_retries";
/// Cycles aborted by an unrecoverable (for this cycle) failure, per stage.
pub const CYCLE_ERRORS: &str = "activator_cycle_errors";

/// Registers descriptions for everything the agent exports. Call once
/// after installing the recorder.
pub fn describe() {
    describe_gauge!(ACTIVATED, "Whether the validator has been activated (1) or not (0)");
    describe_gauge!(
        LAST_ATTEMPTED_EPOCH,
        "Last epoch in which an activation attempt was recorded"
    );
    describe_gauge!(EPOCH_NUMBER, "Current epoch number reported by the node");
    describe_gauge!(BALANCE, "Balance of the validator operating account");
    describe_gauge!(TOTAL_STAKE, "Total stake locked for the validator");
    describe_gauge!(STAKER_COUNT, "Number of stakers delegating to the validator");
    describe_counter!(RPC_RETRIES, "Failed RPC attempts that were retried");
    describe_counter!(CYCLE_ERRORS, "Polling cycles aborted by a failure");
}
