//! Staking entities assembled from the SFC contract.

use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

/// Status bit set on stakers caught double-signing.
pub const STATUS_CHEATER_BIT: u64 = 1;
/// Status bit set on stakers that stopped producing events.
pub const STATUS_OFFLINE_BIT: u64 = 1 << 8;

/// Sealed (or in-progress) epoch snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub id: u64,
    pub end_time: U256,
    pub duration: U256,
    pub epoch_fee: U256,
    pub total_base_reward_weight: U256,
    pub total_tx_reward_weight: U256,
    pub base_reward_per_second: U256,
    pub stake_total_amount: U256,
    pub delegations_total_amount: U256,
    pub total_supply: U256,
}

/// Lookup key of a staker; id and address are both valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakerKey {
    Id(u64),
    Address(Address),
}

impl std::fmt::Display for StakerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StakerKey::Id(id) => write!(f, "#{id}"),
            StakerKey::Address(address) => write!(f, "{address}"),
        }
    }
}

/// Staker (validator) tracked by the SFC contract.
///
/// `total_stake`, both delegation limits and the flags are derived; they are
/// recomputed in full whenever the stake figures are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staker {
    pub id: u64,
    pub address: Address,
    /// Self-stake.
    pub stake: U256,
    /// Stake delegated to this staker.
    pub delegated_me: U256,
    /// `stake + delegated_me`.
    pub total_stake: U256,
    /// Maximum amount that may be delegated to this staker.
    pub total_delegated_limit: U256,
    /// Remaining delegation capacity; negative when over-delegated.
    pub delegated_limit: I256,
    pub locked_from_epoch: u64,
    pub locked_until: u64,
    /// Raw status bits from the contract.
    pub status: u64,
    pub is_active: bool,
    pub is_validator: bool,
    pub is_cheater: bool,
    pub is_offline: bool,
    pub is_locked: bool,
    pub created_epoch: u64,
    pub created_time: u64,
    pub deactivated_epoch: u64,
    pub deactivated_time: u64,
    pub paid_until_epoch: u64,
}
