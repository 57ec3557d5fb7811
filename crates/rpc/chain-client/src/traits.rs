//! Capability traits over the full node.
//!
//! Each consumer depends only on the slice of the node it needs: the
//! repository facade reads entities, the orchestrator subscribes, the
//! submission path writes, and staking assembly reads the SFC contract.

use std::pin::Pin;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use futures::Stream;

use opera_api_types::{Block, Epoch, StakerKey, Transaction};

use crate::error::ChainResult;

/// Stream of notifications pushed by the node; it ends on disconnect.
pub type NotificationStream<T> = Pin<Box<dyn Stream<Item = ChainResult<T>> + Send>>;

/// Read access to chain entities.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Number of the latest block known to the node.
    async fn block_height(&self) -> ChainResult<u64>;

    /// Block by number; `None` selects the latest block.
    async fn block_by_number(&self, number: Option<u64>) -> ChainResult<Block>;

    async fn block_by_hash(&self, hash: B256) -> ChainResult<Block>;

    /// Transaction with its receipt data merged in when mined.
    async fn transaction(&self, hash: B256) -> ChainResult<Transaction>;

    async fn balance(&self, address: Address) -> ChainResult<U256>;

    async fn nonce(&self, address: Address) -> ChainResult<u64>;

    /// Gas price the node currently suggests.
    async fn gas_price(&self) -> ChainResult<U256>;
}

/// Transaction submission.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Submit a signed transaction and return its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<B256>;
}

/// Push notifications of new blocks and transactions.
#[async_trait]
pub trait ChainSubscriber: Send + Sync {
    async fn subscribe_blocks(&self) -> ChainResult<NotificationStream<Block>>;

    async fn subscribe_transactions(&self) -> ChainResult<NotificationStream<Transaction>>;
}

/// Raw staker record as stored by the SFC contract.
///
/// `status` is `None` when the contract holds no record for the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakerRecord {
    pub id: u64,
    pub address: Address,
    pub status: Option<u64>,
    pub stake: U256,
    pub delegated_me: U256,
    pub created_epoch: u64,
    pub created_time: u64,
    pub deactivated_epoch: u64,
    pub deactivated_time: u64,
    pub paid_until_epoch: u64,
}

/// Lock window of a staker's self-stake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockWindow {
    pub from_epoch: Option<u64>,
    pub end_time: Option<u64>,
}

/// Low-level accessors of the SFC (special fee contract).
#[async_trait]
pub trait SfcReader: Send + Sync {
    /// Contract version packed as `major << 16 | minor << 8 | patch`.
    async fn sfc_version(&self) -> ChainResult<u64>;

    async fn current_epoch(&self) -> ChainResult<u64>;

    async fn current_sealed_epoch(&self) -> ChainResult<u64>;

    async fn last_staker_id(&self) -> ChainResult<u64>;

    async fn stakers_num(&self) -> ChainResult<u64>;

    async fn staker_record(&self, key: StakerKey) -> ChainResult<StakerRecord>;

    /// Delegation cap relative to self-stake, in millionths.
    async fn max_delegated_ratio(&self) -> ChainResult<U256>;

    async fn locked_stake(&self, staker_id: u64) -> ChainResult<LockWindow>;

    async fn epoch_snapshot(&self, id: u64) -> ChainResult<Epoch>;
}
