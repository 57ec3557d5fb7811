//! Configuration types for the API daemon.

use std::time::Duration;

use serde::Deserialize;

/// Root configuration of the API daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Full node connection.
    pub node: NodeConfig,

    /// Document store configuration.
    pub storage: StorageConfig,

    /// In-process cache configuration.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Page size limits.
    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Live feed configuration.
    #[serde(default)]
    pub feeds: FeedSettings,

    /// Resubscription policy of the synchronization loops.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Operations configuration.
    #[serde(default)]
    pub operations: OperationsConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Full node connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub url: String,

    /// Per-request timeout in seconds. Default: 10.
    #[serde(default = "NodeConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NodeConfig {
    const fn default_request_timeout_secs() -> u64 {
        10
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path of the SQLite database file.
    pub path: String,

    /// Read connections kept in the pool. Default: 4.
    #[serde(default = "StorageConfig::default_read_pool_size")]
    pub read_pool_size: u32,
}

impl StorageConfig {
    const fn default_read_pool_size() -> u32 {
        4
    }
}

/// In-process cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Transactions kept. Default: 4096.
    #[serde(default = "CacheSettings::default_capacity")]
    pub transactions: usize,

    /// Balances kept. Default: 4096.
    #[serde(default = "CacheSettings::default_capacity")]
    pub balances: usize,

    /// Default: 600.
    #[serde(default = "CacheSettings::default_transaction_ttl_secs")]
    pub transaction_ttl_secs: u64,

    /// Default: 60.
    #[serde(default = "CacheSettings::default_epoch_ttl_secs")]
    pub epoch_ttl_secs: u64,

    /// Default: 30.
    #[serde(default = "CacheSettings::default_balance_ttl_secs")]
    pub balance_ttl_secs: u64,

    /// Largest serialized entry in bytes. Default: 64KB.
    #[serde(default = "CacheSettings::default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Tasks fetching balances of freshly indexed accounts. Default: 4.
    #[serde(default = "CacheSettings::default_warm_workers")]
    pub warm_workers: usize,

    /// Addresses waiting for a balance fetch; more are dropped. Default: 1024.
    #[serde(default = "CacheSettings::default_warm_queue")]
    pub warm_queue: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            transactions: Self::default_capacity(),
            balances: Self::default_capacity(),
            transaction_ttl_secs: Self::default_transaction_ttl_secs(),
            epoch_ttl_secs: Self::default_epoch_ttl_secs(),
            balance_ttl_secs: Self::default_balance_ttl_secs(),
            max_entry_bytes: Self::default_max_entry_bytes(),
            warm_workers: Self::default_warm_workers(),
            warm_queue: Self::default_warm_queue(),
        }
    }
}

impl CacheSettings {
    const fn default_capacity() -> usize {
        4096
    }

    const fn default_transaction_ttl_secs() -> u64 {
        600
    }

    const fn default_epoch_ttl_secs() -> u64 {
        60
    }

    const fn default_balance_ttl_secs() -> u64 {
        30
    }

    const fn default_max_entry_bytes() -> usize {
        64 * 1024
    }

    const fn default_warm_workers() -> usize {
        4
    }

    const fn default_warm_queue() -> usize {
        1024
    }
}

/// Largest page per collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationSettings {
    #[serde(default = "PaginationSettings::default_max_page")]
    pub max_transactions: u32,

    #[serde(default = "PaginationSettings::default_max_page")]
    pub max_blocks: u32,

    #[serde(default = "PaginationSettings::default_max_page")]
    pub max_contracts: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            max_transactions: Self::default_max_page(),
            max_blocks: Self::default_max_page(),
            max_contracts: Self::default_max_page(),
        }
    }
}

impl PaginationSettings {
    const fn default_max_page() -> u32 {
        50
    }
}

/// Handling of a subscriber whose buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedOverflow {
    /// Drop the notification for that subscriber.
    #[default]
    Drop,
    /// Disconnect the subscriber.
    Disconnect,
}

/// Live feed configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSettings {
    /// Per-subscriber buffer. Default: 64.
    #[serde(default = "FeedSettings::default_buffer")]
    pub buffer: usize,

    /// Default: drop.
    #[serde(default)]
    pub overflow: FeedOverflow,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            buffer: Self::default_buffer(),
            overflow: FeedOverflow::default(),
        }
    }
}

impl FeedSettings {
    const fn default_buffer() -> usize {
        64
    }
}

/// Resubscription backoff of the synchronization loops.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Consecutive failed attempts before a loop gives up. Default: 10.
    #[serde(default = "SyncSettings::default_max_attempts")]
    pub max_attempts: u32,

    /// Default: 500.
    #[serde(default = "SyncSettings::default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Default: 30000.
    #[serde(default = "SyncSettings::default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Default: 2.0.
    #[serde(default = "SyncSettings::default_multiplier")]
    pub multiplier: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            initial_delay_ms: Self::default_initial_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            multiplier: Self::default_multiplier(),
        }
    }
}

impl SyncSettings {
    const fn default_max_attempts() -> u32 {
        10
    }

    const fn default_initial_delay_ms() -> u64 {
        500
    }

    const fn default_max_delay_ms() -> u64 {
        30_000
    }

    const fn default_multiplier() -> f64 {
        2.0
    }
}

/// Operations configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationsConfig {
    /// Shutdown timeout in seconds. Default: 30.
    #[serde(default = "OperationsConfig::default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: Self::default_shutdown_timeout_secs(),
        }
    }
}

impl OperationsConfig {
    const fn default_shutdown_timeout_secs() -> u64 {
        30
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level: trace, debug, info, warn, error. Default: info.
    #[serde(default = "ObservabilityConfig::default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty. Default: json.
    #[serde(default = "ObservabilityConfig::default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            log_format: Self::default_log_format(),
        }
    }
}

impl ObservabilityConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_log_format() -> String {
        "json".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_settings() {
        let config = CacheSettings::default();
        assert_eq!(config.transactions, 4096);
        assert_eq!(config.balances, 4096);
        assert_eq!(config.transaction_ttl_secs, 600);
        assert_eq!(config.epoch_ttl_secs, 60);
        assert_eq!(config.balance_ttl_secs, 30);
        assert_eq!(config.max_entry_bytes, 64 * 1024);
    }

    #[test]
    fn test_default_operations_config() {
        let config = OperationsConfig::default();
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_sync_settings() {
        let config = SyncSettings::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert_eq!(config.multiplier, 2.0);
    }

    #[test]
    fn test_feed_overflow_parses_lowercase() {
        let settings: FeedSettings = serde_yaml::from_str("overflow: disconnect").unwrap();
        assert_eq!(settings.overflow, FeedOverflow::Disconnect);
        assert_eq!(settings.buffer, 64);

        assert!(serde_yaml::from_str::<FeedSettings>("overflow: block").is_err());
    }
}
