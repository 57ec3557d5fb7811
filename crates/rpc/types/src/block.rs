//! Block entity and the block shape returned by the full node.
#![cfg_attr(test, allow(clippy::indexing_slicing))]

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};

/// Block summary as seen by the API.
///
/// Identified by number and by hash interchangeably. Immutable once observed
/// past the confirmation threshold of the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block number/height.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp (Unix seconds).
    pub timestamp: u64,
    /// Gas limit for this block.
    pub gas_limit: u64,
    /// Total gas used in this block.
    pub gas_used: u64,
    /// Hashes of the contained transactions, in block order.
    pub transactions: Vec<B256>,
}

impl Block {
    /// Number of transactions contained in the block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Block as returned by `eth_getBlockByNumber` / `eth_getBlockByHash` with
/// `full_transactions = false`, and by the `newHeads` subscription.
///
/// Only the fields the API consumes are decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block number
    pub number: U64,
    /// Block hash
    pub hash: B256,
    /// Parent block hash
    pub parent_hash: B256,
    /// Gas limit
    pub gas_limit: U64,
    /// Gas used
    pub gas_used: U64,
    /// Block timestamp (Unix seconds)
    pub timestamp: U64,
    /// Transaction hashes; absent on `newHeads` notifications
    #[serde(default)]
    pub transactions: Vec<B256>,
}

impl From<RpcBlock> for Block {
    fn from(block: RpcBlock) -> Self {
        Self {
            number: block.number.to::<u64>(),
            hash: block.hash,
            parent_hash: block.parent_hash,
            timestamp: block.timestamp.to::<u64>(),
            gas_limit: block.gas_limit.to::<u64>(),
            gas_used: block.gas_used.to::<u64>(),
            transactions: block.transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_block_decoding() {
        let json = serde_json::json!({
            "number": "0x64",
            "hash": B256::repeat_byte(0x01),
            "parentHash": B256::repeat_byte(0x02),
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x5208",
            "timestamp": "0x499602d2",
            "miner": "0x0000000000000000000000000000000000000000",
            "transactions": [B256::repeat_byte(0x03)]
        });

        let block: Block = serde_json::from_value::<RpcBlock>(json).unwrap().into();
        assert_eq!(block.number, 100);
        assert_eq!(block.gas_limit, 30_000_000);
        assert_eq!(block.gas_used, 21_000);
        assert_eq!(block.timestamp, 1_234_567_890);
        assert_eq!(block.transactions, vec![B256::repeat_byte(0x03)]);
    }

    #[test]
    fn test_new_heads_without_transactions() {
        let json = serde_json::json!({
            "number": "0x1",
            "hash": B256::repeat_byte(0x01),
            "parentHash": B256::ZERO,
            "gasLimit": "0x0",
            "gasUsed": "0x0",
            "timestamp": "0x0"
        });

        let block: Block = serde_json::from_value::<RpcBlock>(json).unwrap().into();
        assert_eq!(block.transaction_count(), 0);
    }
}
