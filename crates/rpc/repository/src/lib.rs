//! Data-access core of the Opera read API.
//!
//! Three sources of truth are reconciled here:
//!
//! - the full node, reached through `opera-chain-client` (authoritative, slow)
//! - the document store, a durable index with cursor pagination
//! - the in-process cache, fast and bounded
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Query layer                      │
//! └───────────────────────┬─────────────────────────────┘
//!                         │
//!           ┌─────────────▼─────────────┐
//!           │        Repository         │
//!           │   (cache-aside facade)    │
//!           └─────────────┬─────────────┘
//!                         │
//!         ┌───────────────┼───────────────┐
//!         │               │               │
//!         ▼               ▼               ▼
//! ┌───────────────┐ ┌───────────┐ ┌───────────────┐
//! │   MemCache    │ │  SQLite   │ │   Full node   │
//! │ (CacheBridge) │ │ (Document │ │ (ChainClient) │
//! │               │ │   Store)  │ │               │
//! └───────────────┘ └───────────┘ └───────────────┘
//! ```
//!
//! The orchestrator follows new blocks from the node, persists them with
//! their transactions, warms the cache and republishes both on the live
//! feeds. Transactions entering the pool are announced on the transaction
//! feed as well.

pub mod cache;
pub mod error;
pub mod feeds;
pub mod index;
pub mod orchestrator;
pub mod provider;
pub mod retry;

#[cfg(test)]
mod testing;

pub use cache::{CacheBridge, CacheConfig, MemCache};
pub use error::{
    CacheError, CacheResult, RepositoryError, RepositoryResult, StoreError, StoreResult,
};
pub use feeds::{FeedConfig, FeedHub, FeedSubscription, LiveFeeds, OverflowPolicy};
pub use index::{BalanceSource, DocumentStore, SqliteDocumentStore, SqliteStoreConfig};
pub use orchestrator::Orchestrator;
pub use provider::{
    CollectionReader, EntityReader, FeedRegistry, PaginationConfig, Repository,
    RepositoryConfig, TransactionSubmitter, WarmerConfig,
};
pub use retry::{Backoff, RetryConfig};
