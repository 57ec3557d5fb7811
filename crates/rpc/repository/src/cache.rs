//! In-process cache bridge.
//!
//! Holds recently seen confirmed transactions, the last sealed epoch and
//! balances warmed during indexing. Every entry is stored serialized and
//! stamped with its insertion time; an entry older than its TTL reads as a
//! miss. Capacity bounds are enforced by LRU eviction.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, B256, U256};
use lru::LruCache;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use opera_api_types::{Epoch, Transaction};

use crate::error::{CacheError, CacheResult};

/// Default number of transactions to cache.
const DEFAULT_TX_CACHE_SIZE: usize = 4096;
/// Default number of balances to cache.
const DEFAULT_BALANCE_CACHE_SIZE: usize = 4096;
/// Default largest serialized entry accepted.
const DEFAULT_MAX_ENTRY_SIZE: usize = 64 * 1024;

/// Typed get/put over the in-process cache.
///
/// Absence is always a miss, never an error. A failed put only means the
/// next read goes to the source again.
pub trait CacheBridge: Send + Sync {
    fn pull_transaction(&self, hash: &B256) -> Option<Transaction>;

    fn push_transaction(&self, tx: &Transaction) -> CacheResult<()>;

    fn pull_last_epoch(&self) -> Option<Epoch>;

    fn push_last_epoch(&self, epoch: &Epoch) -> CacheResult<()>;

    fn pull_balance(&self, address: &Address) -> Option<U256>;

    fn push_balance(&self, address: &Address, balance: U256) -> CacheResult<()>;
}

/// Configuration for the in-process cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of transactions to cache.
    pub tx_cache_size: usize,
    /// Number of balances to cache.
    pub balance_cache_size: usize,
    pub tx_ttl: Duration,
    pub epoch_ttl: Duration,
    pub balance_ttl: Duration,
    /// Largest serialized entry accepted, in bytes.
    pub max_entry_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tx_cache_size: DEFAULT_TX_CACHE_SIZE,
            balance_cache_size: DEFAULT_BALANCE_CACHE_SIZE,
            tx_ttl: Duration::from_secs(600),
            epoch_ttl: Duration::from_secs(60),
            balance_ttl: Duration::from_secs(30),
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

struct Entry {
    stored_at: Instant,
    bytes: Vec<u8>,
}

impl Entry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// LRU and TTL bounded in-memory cache.
pub struct MemCache {
    config: CacheConfig,
    transactions: RwLock<LruCache<B256, Entry>>,
    balances: RwLock<LruCache<Address, Entry>>,
    last_epoch: RwLock<Option<Entry>>,
}

impl MemCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = |size: usize| NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN);
        Self {
            transactions: RwLock::new(LruCache::new(capacity(config.tx_cache_size))),
            balances: RwLock::new(LruCache::new(capacity(config.balance_cache_size))),
            last_epoch: RwLock::new(None),
            config,
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    fn encode<T: Serialize>(&self, value: &T) -> CacheResult<Entry> {
        let bytes = serde_json::to_vec(value)?;
        if bytes.len() > self.config.max_entry_size {
            return Err(CacheError::EntryTooLarge {
                size: bytes.len(),
                max: self.config.max_entry_size,
            });
        }
        Ok(Entry {
            stored_at: Instant::now(),
            bytes,
        })
    }

    fn decode<T: DeserializeOwned>(entry: &Entry, ttl: Duration, kind: &str) -> Option<T> {
        if !entry.is_fresh(ttl) {
            tracing::debug!(kind, "cache entry expired");
            return None;
        }
        match serde_json::from_slice(&entry.bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(kind, error = %err, "undecodable cache entry");
                None
            }
        }
    }
}

impl CacheBridge for MemCache {
    fn pull_transaction(&self, hash: &B256) -> Option<Transaction> {
        let mut transactions = self.transactions.write();
        let hit = Self::decode(transactions.get(hash)?, self.config.tx_ttl, "transaction");
        if hit.is_none() {
            transactions.pop(hash);
        }
        hit
    }

    fn push_transaction(&self, tx: &Transaction) -> CacheResult<()> {
        let entry = self.encode(tx)?;
        self.transactions.write().put(tx.hash, entry);
        Ok(())
    }

    fn pull_last_epoch(&self) -> Option<Epoch> {
        let last_epoch = self.last_epoch.read();
        Self::decode(last_epoch.as_ref()?, self.config.epoch_ttl, "epoch")
    }

    fn push_last_epoch(&self, epoch: &Epoch) -> CacheResult<()> {
        let entry = self.encode(epoch)?;
        *self.last_epoch.write() = Some(entry);
        Ok(())
    }

    fn pull_balance(&self, address: &Address) -> Option<U256> {
        let mut balances = self.balances.write();
        let hit = Self::decode(balances.get(address)?, self.config.balance_ttl, "balance");
        if hit.is_none() {
            balances.pop(address);
        }
        hit
    }

    fn push_balance(&self, address: &Address, balance: U256) -> CacheResult<()> {
        let entry = self.encode(&balance)?;
        self.balances.write().put(*address, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use opera_api_types::TxStatus;

    fn make_test_tx(seed: u8) -> Transaction {
        Transaction {
            hash: B256::repeat_byte(seed),
            from: Address::repeat_byte(0x01),
            to: Some(Address::repeat_byte(0x02)),
            contract_address: None,
            value: U256::from(10u64),
            gas: 21_000,
            gas_price: U256::from(1_000_000_000u64),
            nonce: 0,
            input: Bytes::new(),
            block_hash: Some(B256::repeat_byte(0xbb)),
            block_number: Some(7),
            index: Some(0),
            status: Some(TxStatus::Success),
        }
    }

    #[test]
    fn test_transaction_hit_after_push() {
        let cache = MemCache::with_defaults();
        let tx = make_test_tx(1);

        assert!(cache.pull_transaction(&tx.hash).is_none());
        cache.push_transaction(&tx).unwrap();
        assert_eq!(cache.pull_transaction(&tx.hash), Some(tx));
    }

    #[test]
    fn test_expired_entries_read_as_miss() {
        let cache = MemCache::new(CacheConfig {
            balance_ttl: Duration::from_millis(1),
            epoch_ttl: Duration::from_millis(1),
            ..CacheConfig::default()
        });
        let addr = Address::repeat_byte(0x05);
        cache.push_balance(&addr, U256::from(99u64)).unwrap();
        cache.push_last_epoch(&Epoch::default()).unwrap();

        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.pull_balance(&addr).is_none());
        assert!(cache.pull_last_epoch().is_none());
    }

    #[test]
    fn test_oversized_entry_is_rejected() {
        let cache = MemCache::new(CacheConfig {
            max_entry_size: 16,
            ..CacheConfig::default()
        });
        let tx = make_test_tx(1);

        let err = cache.push_transaction(&tx).unwrap_err();
        assert!(matches!(err, CacheError::EntryTooLarge { max: 16, .. }));
        assert!(cache.pull_transaction(&tx.hash).is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache = MemCache::new(CacheConfig {
            tx_cache_size: 2,
            ..CacheConfig::default()
        });
        let (a, b, c) = (make_test_tx(1), make_test_tx(2), make_test_tx(3));
        cache.push_transaction(&a).unwrap();
        cache.push_transaction(&b).unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        assert!(cache.pull_transaction(&a.hash).is_some());
        cache.push_transaction(&c).unwrap();

        assert!(cache.pull_transaction(&a.hash).is_some());
        assert!(cache.pull_transaction(&b.hash).is_none());
        assert!(cache.pull_transaction(&c.hash).is_some());
    }

    #[test]
    fn test_last_epoch_is_replaced() {
        let cache = MemCache::with_defaults();
        cache
            .push_last_epoch(&Epoch {
                id: 4,
                ..Epoch::default()
            })
            .unwrap();
        cache
            .push_last_epoch(&Epoch {
                id: 5,
                ..Epoch::default()
            })
            .unwrap();
        assert_eq!(cache.pull_last_epoch().map(|e| e.id), Some(5));
    }
}
