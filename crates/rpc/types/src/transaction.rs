//! Transaction entity and the transaction shapes returned by the full node.
#![cfg_attr(test, allow(clippy::indexing_slicing))]

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

use crate::page::MAX_ORDINAL;
use crate::receipt::RpcReceipt;

/// Bits reserved for the in-block index inside a transaction ordinal.
pub const ORDINAL_INDEX_BITS: u32 = 16;

/// Largest in-block index an ordinal can carry.
pub const MAX_ORDINAL_INDEX: u32 = (1 << ORDINAL_INDEX_BITS) - 1;

/// A mined transaction whose position cannot be expressed as an ordinal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transaction {hash} at block {block_number} index {index} is outside the ordinal range")]
pub struct OrdinalOutOfRange {
    pub hash: B256,
    pub block_number: u64,
    pub index: u64,
}

/// Execution status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failure,
    Unknown,
}

impl TxStatus {
    /// Map a receipt status code.
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => TxStatus::Success,
            0 => TxStatus::Failure,
            _ => TxStatus::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TxStatus::Success => 1,
            TxStatus::Failure => 0,
            TxStatus::Unknown => 2,
        }
    }
}

/// Transaction as seen by the API.
///
/// The block reference, index and status are `None` while the transaction is
/// pending; they are set together, exactly once, when it gets mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash.
    pub hash: B256,
    /// Sender address.
    pub from: Address,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    /// Address of the contract deployed by this transaction.
    pub contract_address: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Gas limit.
    pub gas: u64,
    /// Gas price.
    pub gas_price: U256,
    /// Sender nonce.
    pub nonce: u64,
    /// Input data.
    pub input: Bytes,
    /// Containing block hash.
    pub block_hash: Option<B256>,
    /// Containing block number.
    pub block_number: Option<u64>,
    /// Index within the block.
    pub index: Option<u32>,
    /// Execution status.
    pub status: Option<TxStatus>,
}

impl Transaction {
    /// A transaction is confirmed once its block reference is set.
    pub fn is_confirmed(&self) -> bool {
        self.block_hash.is_some()
    }

    /// Sort key of a confirmed transaction across the whole chain.
    pub fn ordinal(&self) -> Option<u64> {
        match (self.block_number, self.index) {
            (Some(number), Some(index)) => transaction_ordinal(number, index),
            _ => None,
        }
    }

    /// Whether this transaction deployed a contract.
    pub fn is_deployment(&self) -> bool {
        self.contract_address.is_some()
    }
}

/// Compose the ordinal of a transaction from its block number and index.
///
/// `None` when the index does not fit [`ORDINAL_INDEX_BITS`] or the result
/// would pass [`MAX_ORDINAL`].
pub fn transaction_ordinal(block_number: u64, index: u32) -> Option<u64> {
    if index > MAX_ORDINAL_INDEX || block_number > MAX_ORDINAL >> ORDINAL_INDEX_BITS {
        return None;
    }
    Some((block_number << ORDINAL_INDEX_BITS) | u64::from(index))
}

/// Transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash
    pub hash: B256,
    /// Nonce
    pub nonce: U64,
    /// Block hash (null if pending)
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// Block number (null if pending)
    #[serde(default)]
    pub block_number: Option<U64>,
    /// Transaction index in block (null if pending)
    #[serde(default)]
    pub transaction_index: Option<U64>,
    /// Sender address
    pub from: Address,
    /// Recipient address (null for contract creation)
    #[serde(default)]
    pub to: Option<Address>,
    /// Value transferred
    pub value: U256,
    /// Gas limit
    pub gas: U64,
    /// Gas price
    #[serde(default)]
    pub gas_price: Option<U256>,
    /// Input data
    pub input: Bytes,
}

impl RpcTransaction {
    /// Merge the transaction with its receipt, if the node has one.
    ///
    /// A mined transaction must have a position that fits an ordinal.
    pub fn try_into_transaction(
        self,
        receipt: Option<RpcReceipt>,
    ) -> Result<Transaction, OrdinalOutOfRange> {
        let confirmed = self.block_hash.is_some();
        let position = match (confirmed, self.block_number, self.transaction_index) {
            (true, Some(number), Some(index)) => {
                let (number, index) = (number.to::<u64>(), index.to::<u64>());
                let fits = u32::try_from(index)
                    .ok()
                    .and_then(|i| transaction_ordinal(number, i).map(|_| i));
                match fits {
                    Some(i) => Some((number, i)),
                    None => {
                        return Err(OrdinalOutOfRange {
                            hash: self.hash,
                            block_number: number,
                            index,
                        })
                    }
                }
            }
            _ => None,
        };
        let (status, contract_address) = match (&receipt, confirmed) {
            (Some(r), true) => (Some(TxStatus::from_code(r.status.to::<u64>())), r.contract_address),
            (None, true) => (Some(TxStatus::Unknown), None),
            (_, false) => (None, None),
        };

        Ok(Transaction {
            hash: self.hash,
            from: self.from,
            to: self.to,
            contract_address,
            value: self.value,
            gas: self.gas.to::<u64>(),
            gas_price: self.gas_price.unwrap_or_default(),
            nonce: self.nonce.to::<u64>(),
            input: self.input,
            block_hash: self.block_hash,
            block_number: position.map(|(number, _)| number),
            index: position.map(|(_, index)| index),
            status,
        })
    }
}
