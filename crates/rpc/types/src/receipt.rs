//! Transaction receipt shape returned by the full node.

use alloy_primitives::{Address, B256, U64};
use serde::{Deserialize, Serialize};

/// Subset of `eth_getTransactionReceipt` used to complete a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Transaction hash
    pub transaction_hash: B256,
    /// Block hash
    pub block_hash: B256,
    /// Block number
    pub block_number: U64,
    /// Contract address if this was a contract creation
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Status (1 = success, 0 = failure)
    pub status: U64,
}
