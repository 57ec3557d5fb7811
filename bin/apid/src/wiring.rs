//! Mapping of the file configuration onto the repository's settings.

use std::path::PathBuf;
use std::time::Duration;

use opera_operations::config::{
    CacheSettings, FeedOverflow, FeedSettings, PaginationSettings, StorageConfig, SyncSettings,
};
use opera_operations::ApiConfig;
use opera_repository::{
    CacheConfig, FeedConfig, OverflowPolicy, PaginationConfig, RepositoryConfig, RetryConfig,
    SqliteStoreConfig, WarmerConfig,
};

pub fn cache_config(settings: &CacheSettings) -> CacheConfig {
    CacheConfig {
        tx_cache_size: settings.transactions,
        balance_cache_size: settings.balances,
        tx_ttl: Duration::from_secs(settings.transaction_ttl_secs),
        epoch_ttl: Duration::from_secs(settings.epoch_ttl_secs),
        balance_ttl: Duration::from_secs(settings.balance_ttl_secs),
        max_entry_size: settings.max_entry_bytes,
    }
}

pub fn store_config(settings: &StorageConfig) -> SqliteStoreConfig {
    SqliteStoreConfig {
        path: PathBuf::from(&settings.path),
        read_pool_size: settings.read_pool_size,
    }
}

pub fn repository_config(config: &ApiConfig) -> RepositoryConfig {
    RepositoryConfig {
        pagination: pagination_config(&config.pagination),
        feeds: feed_config(&config.feeds),
        retry: retry_config(&config.sync),
        warmer: WarmerConfig {
            workers: config.cache.warm_workers,
            queue_capacity: config.cache.warm_queue,
        },
    }
}

fn pagination_config(settings: &PaginationSettings) -> PaginationConfig {
    PaginationConfig {
        max_transactions: settings.max_transactions,
        max_blocks: settings.max_blocks,
        max_contracts: settings.max_contracts,
    }
}

fn feed_config(settings: &FeedSettings) -> FeedConfig {
    FeedConfig {
        buffer: settings.buffer,
        overflow: match settings.overflow {
            FeedOverflow::Drop => OverflowPolicy::Drop,
            FeedOverflow::Disconnect => OverflowPolicy::Disconnect,
        },
    }
}

fn retry_config(settings: &SyncSettings) -> RetryConfig {
    RetryConfig {
        max_attempts: settings.max_attempts,
        initial_delay: Duration::from_millis(settings.initial_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
        multiplier: settings.multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opera_operations::config::load_config_from_str;

    #[test]
    fn test_defaults_match_repository_defaults() {
        let config = load_config_from_str(
            "node:\n  url: ws://127.0.0.1:18546\nstorage:\n  path: db.sqlite\n",
            "inline",
        )
        .unwrap();

        let repository = repository_config(&config);
        assert_eq!(repository.pagination, PaginationConfig::default());
        assert_eq!(repository.feeds.buffer, FeedConfig::default().buffer);
        assert_eq!(repository.feeds.overflow, OverflowPolicy::Drop);
        assert_eq!(repository.retry.max_attempts, RetryConfig::default().max_attempts);
        assert_eq!(repository.retry.initial_delay, RetryConfig::default().initial_delay);
        assert_eq!(repository.retry.max_delay, RetryConfig::default().max_delay);
        assert_eq!(repository.warmer, WarmerConfig::default());

        let cache = cache_config(&config.cache);
        assert_eq!(cache.tx_ttl, Duration::from_secs(600));
        assert_eq!(cache.max_entry_size, 64 * 1024);

        let store = store_config(&config.storage);
        assert_eq!(store.path, PathBuf::from("db.sqlite"));
        assert_eq!(store.read_pool_size, 4);
    }

    #[test]
    fn test_disconnect_policy_carried_over() {
        let settings = FeedSettings {
            buffer: 8,
            overflow: FeedOverflow::Disconnect,
        };
        let feeds = feed_config(&settings);
        assert_eq!(feeds.buffer, 8);
        assert_eq!(feeds.overflow, OverflowPolicy::Disconnect);
    }
}
