//! Daemon configuration: a YAML document mapped onto [`ApiConfig`], checked
//! as a whole so that every invalid field is reported in one pass.

mod loader;
pub mod types;
mod validation;

pub use loader::{load_config, load_config_from_str};
pub use types::{
    ApiConfig, CacheSettings, FeedOverflow, FeedSettings, NodeConfig, ObservabilityConfig,
    OperationsConfig, PaginationSettings, StorageConfig, SyncSettings,
};
pub use validation::validate_config;
