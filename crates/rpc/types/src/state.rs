//! Network-wide summary.

use serde::{Deserialize, Serialize};

use crate::staking::Epoch;

/// Snapshot of the chain and the staking contract at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub sealed_epoch: Epoch,
    /// Height reported by the node.
    pub blocks: u64,
    /// Transactions in the index.
    pub transactions: u64,
    pub validators: u64,
    /// Distinct addresses seen on indexed transactions.
    pub accounts: u64,
    /// Packed as `major << 16 | minor << 8 | patch`.
    pub sfc_version: u64,
}
