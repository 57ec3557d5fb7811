//! Configuration validation.
//!
//! Validates configuration and collects all errors before returning,
//! enabling users to fix multiple issues in a single iteration.
#![cfg_attr(test, allow(clippy::indexing_slicing))]

use crate::config::types::{
    ApiConfig, CacheSettings, FeedSettings, NodeConfig, ObservabilityConfig, OperationsConfig,
    PaginationSettings, StorageConfig, SyncSettings,
};
use crate::errors::ConfigError;

/// Maximum node request timeout: 300 seconds.
const MAX_REQUEST_TIMEOUT: u64 = 300;

/// Maximum read connections in the store pool.
const MAX_READ_POOL_SIZE: u32 = 64;

/// Minimum accepted cache entry size: 1KB.
const MIN_ENTRY_BYTES: usize = 1024;
/// Maximum accepted cache entry size: 16MB.
const MAX_ENTRY_BYTES: usize = 16 * 1024 * 1024;

/// Largest page any collection may serve.
const MAX_PAGE_SIZE: u32 = 1000;

/// Maximum per-subscriber feed buffer.
const MAX_FEED_BUFFER: usize = 65_536;

/// Minimum shutdown timeout: 1 second.
const MIN_SHUTDOWN_TIMEOUT: u64 = 1;
/// Maximum shutdown timeout: 300 seconds (5 minutes).
const MAX_SHUTDOWN_TIMEOUT: u64 = 300;

/// Validate the entire configuration.
///
/// Collects all validation errors and returns them together, allowing users
/// to fix multiple issues at once.
pub fn validate_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_node_config(&config.node, &mut errors);
    validate_storage_config(&config.storage, &mut errors);
    validate_cache_settings(&config.cache, &mut errors);
    validate_pagination_settings(&config.pagination, &mut errors);
    validate_feed_settings(&config.feeds, &mut errors);
    validate_sync_settings(&config.sync, &mut errors);
    validate_operations_config(&config.operations, &mut errors);
    validate_observability_config(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(errors))
    }
}

fn validate_node_config(config: &NodeConfig, errors: &mut Vec<String>) {
    if config.url.is_empty() {
        errors.push("node.url cannot be empty".to_string());
    } else if !(config.url.starts_with("ws://") || config.url.starts_with("wss://")) {
        errors.push(format!(
            "node.url '{}' must be a ws:// or wss:// endpoint",
            config.url
        ));
    }

    if config.request_timeout_secs == 0 || config.request_timeout_secs > MAX_REQUEST_TIMEOUT {
        errors.push(format!(
            "node.request_timeout_secs must be between 1 and {} seconds",
            MAX_REQUEST_TIMEOUT
        ));
    }
}

fn validate_storage_config(config: &StorageConfig, errors: &mut Vec<String>) {
    if config.path.is_empty() {
        errors.push("storage.path cannot be empty".to_string());
    }

    if config.read_pool_size == 0 || config.read_pool_size > MAX_READ_POOL_SIZE {
        errors.push(format!(
            "storage.read_pool_size must be between 1 and {}",
            MAX_READ_POOL_SIZE
        ));
    }
}

fn validate_cache_settings(config: &CacheSettings, errors: &mut Vec<String>) {
    if config.transactions == 0 {
        errors.push("cache.transactions must be greater than 0".to_string());
    }

    if config.balances == 0 {
        errors.push("cache.balances must be greater than 0".to_string());
    }

    for (name, ttl) in [
        ("transaction_ttl_secs", config.transaction_ttl_secs),
        ("epoch_ttl_secs", config.epoch_ttl_secs),
        ("balance_ttl_secs", config.balance_ttl_secs),
    ] {
        if ttl == 0 {
            errors.push(format!("cache.{name} must be greater than 0"));
        }
    }

    if config.max_entry_bytes < MIN_ENTRY_BYTES || config.max_entry_bytes > MAX_ENTRY_BYTES {
        errors.push(format!(
            "cache.max_entry_bytes must be between {} bytes and {} MB",
            MIN_ENTRY_BYTES,
            MAX_ENTRY_BYTES / (1024 * 1024)
        ));
    }

    if config.warm_workers == 0 || config.warm_queue == 0 {
        errors.push("cache.warm_workers and cache.warm_queue must be greater than 0".to_string());
    }
}

fn validate_pagination_settings(config: &PaginationSettings, errors: &mut Vec<String>) {
    for (name, max) in [
        ("max_transactions", config.max_transactions),
        ("max_blocks", config.max_blocks),
        ("max_contracts", config.max_contracts),
    ] {
        if max == 0 || max > MAX_PAGE_SIZE {
            errors.push(format!(
                "pagination.{name} must be between 1 and {}",
                MAX_PAGE_SIZE
            ));
        }
    }
}

fn validate_feed_settings(config: &FeedSettings, errors: &mut Vec<String>) {
    if config.buffer == 0 || config.buffer > MAX_FEED_BUFFER {
        errors.push(format!(
            "feeds.buffer must be between 1 and {}",
            MAX_FEED_BUFFER
        ));
    }
}

fn validate_sync_settings(config: &SyncSettings, errors: &mut Vec<String>) {
    if config.max_attempts == 0 {
        errors.push("sync.max_attempts must be greater than 0".to_string());
    }

    if config.initial_delay_ms == 0 {
        errors.push("sync.initial_delay_ms must be greater than 0".to_string());
    }

    if config.max_delay_ms < config.initial_delay_ms {
        errors.push(format!(
            "sync.max_delay_ms ({}) must not be below sync.initial_delay_ms ({})",
            config.max_delay_ms, config.initial_delay_ms
        ));
    }

    if !config.multiplier.is_finite() || config.multiplier < 1.0 {
        errors.push(format!(
            "sync.multiplier {} must be a finite number of at least 1.0",
            config.multiplier
        ));
    }
}

fn validate_operations_config(config: &OperationsConfig, errors: &mut Vec<String>) {
    if config.shutdown_timeout_secs < MIN_SHUTDOWN_TIMEOUT {
        errors.push(format!(
            "operations.shutdown_timeout_secs must be at least {} second(s)",
            MIN_SHUTDOWN_TIMEOUT
        ));
    }

    if config.shutdown_timeout_secs > MAX_SHUTDOWN_TIMEOUT {
        errors.push(format!(
            "operations.shutdown_timeout_secs must be at most {} seconds",
            MAX_SHUTDOWN_TIMEOUT
        ));
    }
}

fn validate_observability_config(config: &ObservabilityConfig, errors: &mut Vec<String>) {
    let valid_levels = ["trace", "debug", "info", "warn", "warning", "error"];
    if !valid_levels.contains(&config.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "observability.log_level '{}' is invalid. Valid levels: trace, debug, info, warn, error",
            config.log_level
        ));
    }

    let valid_formats = ["json", "pretty", "text", "human"];
    if !valid_formats.contains(&config.log_format.to_lowercase().as_str()) {
        errors.push(format!(
            "observability.log_format '{}' is invalid. Valid formats: json, pretty",
            config.log_format
        ));
    }
}
