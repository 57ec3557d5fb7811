//! Operations infrastructure for the Opera API daemon.
//!
//! - **Config**: YAML configuration with fail-fast validation
//! - **Observability**: `tracing` subscriber setup with a reloadable level
//! - **Shutdown**: SIGTERM/SIGINT handling and ordered component shutdown
//!
//! # Example
//!
//! ```no_run
//! use opera_operations::{
//!     config::load_config,
//!     observability::init_tracing_from_config,
//!     shutdown::{ShutdownCoordinator, SignalHandler},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("config.yaml")?;
//!     let _level = init_tracing_from_config(&config.observability)?;
//!
//!     let signal_handler = SignalHandler::new();
//!     let coordinator = ShutdownCoordinator::new(config.operations.shutdown_timeout());
//!
//!     signal_handler.start();
//!     signal_handler.wait().await;
//!
//!     coordinator.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod shutdown;

pub use config::{load_config, ApiConfig, NodeConfig, ObservabilityConfig};
pub use errors::{ConfigError, LoggingError, ShutdownError};
pub use observability::{
    init_tracing, init_tracing_from_config, parse_level, LogFormat, LogLevelSwitch,
};
pub use shutdown::{ShutdownAware, ShutdownCoordinator, ShutdownReason, SignalHandler};
