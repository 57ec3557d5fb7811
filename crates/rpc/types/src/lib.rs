//! Domain and wire types for the Opera read API.
//!
//! Domain entities (`Block`, `Transaction`, `Account`, `Contract`, `Epoch`,
//! `Staker`, `CurrentState`, `Page`) are what the repository hands to the
//! query layer. The `Rpc*` types mirror the JSON shapes returned by the full
//! node and convert into the domain entities.

use alloy_primitives::{Address, Bytes, U64};
use serde::{Deserialize, Serialize};

pub mod account;
pub mod block;
pub mod page;
pub mod receipt;
pub mod staking;
pub mod state;
pub mod transaction;

pub use account::{Account, Contract, ContractMetadata};
pub use block::{Block, RpcBlock};
pub use page::{Cursor, Page, PageRequest, MAX_ORDINAL};
pub use receipt::RpcReceipt;
pub use staking::{Epoch, Staker, StakerKey};
pub use state::CurrentState;
pub use transaction::{
    transaction_ordinal, OrdinalOutOfRange, RpcTransaction, Transaction, TxStatus,
    MAX_ORDINAL_INDEX,
};

/// Block number or tag for RPC requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockNumberOrTag {
    /// Specific block number (hex encoded)
    Number(U64),
    /// Block tag
    Tag(BlockTag),
}

impl Default for BlockNumberOrTag {
    fn default() -> Self {
        BlockNumberOrTag::Tag(BlockTag::Latest)
    }
}

impl From<Option<u64>> for BlockNumberOrTag {
    fn from(number: Option<u64>) -> Self {
        match number {
            Some(n) => BlockNumberOrTag::Number(U64::from(n)),
            None => BlockNumberOrTag::Tag(BlockTag::Latest),
        }
    }
}

/// Standard Ethereum block tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
}

/// Call request for `eth_call` against a contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Sender address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Target address
    pub to: Address,
    /// Input data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: Some(data.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_number_or_tag() {
        let num = BlockNumberOrTag::from(Some(100));
        let json = serde_json::to_string(&num).unwrap();
        assert_eq!(json, "\"0x64\"");

        let tag = BlockNumberOrTag::from(None);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"latest\"");
    }

    #[test]
    fn test_call_request_skips_sender() {
        let request = CallRequest::new(Address::repeat_byte(0xfc), vec![0x01, 0x02]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("from").is_none());
        assert_eq!(json["data"], "0x0102");
    }
}
