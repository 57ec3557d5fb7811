//! Observability infrastructure for the API daemon.
//!
//! Structured JSON or human-readable logging through `tracing`, with a
//! level that can be adjusted while the process runs.

pub mod logging;

pub use logging::{
    init_tracing, init_tracing_from_config, parse_level, LogFormat, LogLevelSwitch,
};
