//! Full-node client for the Opera read API.
//!
//! The node is reached through capability traits so that each consumer
//! depends only on what it uses:
//!
//! - [`ChainReader`]: blocks, transactions, balances, nonces
//! - [`ChainWriter`]: raw transaction submission
//! - [`ChainSubscriber`]: new block and transaction notifications
//! - [`SfcReader`]: staking contract accessors
//!
//! [`WsChainClient`] implements all of them over a WebSocket connection and
//! [`StakingAssembler`] builds stakers and epochs on top of an `SfcReader`.

pub mod error;
pub mod sfc;
pub mod staking;
pub mod traits;
pub mod ws;

pub use error::{ChainError, ChainResult};
pub use staking::{delegation_limits, StakingAssembler, RATIO_UNIT};
pub use traits::{
    ChainReader, ChainSubscriber, ChainWriter, LockWindow, NotificationStream, SfcReader,
    StakerRecord,
};
pub use ws::{WsChainClient, WsClientConfig};

/// Everything the repository needs from a full node.
pub trait ChainClient: ChainReader + ChainWriter + ChainSubscriber + SfcReader {}

impl<T: ChainReader + ChainWriter + ChainSubscriber + SfcReader> ChainClient for T {}
