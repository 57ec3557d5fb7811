//! Account and contract views.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Account view over an address.
///
/// Accounts are not persisted on their own; balance and nonce are read live
/// from the node and the transaction history comes from the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: Address,
    /// Deploying transaction if the address is a known smart contract.
    pub contract_tx: Option<B256>,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            contract_tx: None,
        }
    }

    pub fn is_contract(&self) -> bool {
        self.contract_tx.is_some()
    }
}

/// Smart contract deployed on the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Contract address.
    pub address: Address,
    /// Hash of the deploying transaction.
    pub transaction_hash: B256,
    /// Ordinal of the deploying transaction, used for pagination.
    pub ordinal: u64,
    /// Deployment time (Unix seconds), zero when the block was not resolved.
    pub timestamp: u64,
    /// Verified source details, absent until the contract is validated.
    pub metadata: Option<ContractMetadata>,
}

impl Contract {
    pub fn is_validated(&self) -> bool {
        self.metadata.is_some()
    }
}

/// Details attached to a contract by source validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub name: String,
    pub version: String,
    pub license: String,
    pub compiler: String,
    pub source_code: String,
    pub abi: String,
    /// Validation time (Unix seconds).
    pub validated_at: u64,
}
