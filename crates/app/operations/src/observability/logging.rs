//! Structured logging with a runtime-adjustable level filter.
//!
//! Installs a `tracing-subscriber` registry as the global default. The
//! `RUST_LOG` environment variable, when set, takes precedence over the
//! configured level.

use crate::config::ObservabilityConfig;
use crate::errors::LoggingError;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Log format for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON format for machine parsing (production).
    #[default]
    Json,
    /// Human-readable format (development).
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Parse from string, case-insensitive. Defaults to Json for unknown values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "pretty" | "text" | "human" => Self::Pretty,
            _ => Self::Json,
        })
    }
}

/// Parse log level from string. Unknown values map to `INFO`.
pub fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn level_to_u8(level: Level) -> u8 {
    match level {
        Level::ERROR => 1,
        Level::WARN => 2,
        Level::INFO => 3,
        Level::DEBUG => 4,
        _ => 5,
    }
}

fn u8_to_level(val: u8) -> Level {
    match val {
        1 => Level::ERROR,
        2 => Level::WARN,
        3 => Level::INFO,
        4 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::new(level.as_str().to_lowercase())
}

/// Handle for runtime log level adjustment.
pub struct LogLevelSwitch {
    handle: reload::Handle<EnvFilter, Registry>,
    level: AtomicU8,
}

impl LogLevelSwitch {
    /// Replace the active filter with one at `level`.
    ///
    /// Directives taken from `RUST_LOG` at startup are discarded.
    pub fn set_level(&self, level: Level) -> Result<(), LoggingError> {
        self.handle
            .reload(filter_for(level))
            .map_err(|e| LoggingError::Reload(e.to_string()))?;
        self.level.store(level_to_u8(level), Ordering::SeqCst);
        Ok(())
    }

    /// Get the level last applied through this switch.
    pub fn level(&self) -> Level {
        u8_to_level(self.level.load(Ordering::SeqCst))
    }
}

fn reloadable_filter(
    level: Level,
) -> (reload::Layer<EnvFilter, Registry>, LogLevelSwitch) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level));
    let (layer, handle) = reload::Layer::new(filter);
    let switch = LogLevelSwitch {
        handle,
        level: AtomicU8::new(level_to_u8(level)),
    };
    (layer, switch)
}

/// Install the global subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(level: Level, format: LogFormat) -> Result<LogLevelSwitch, LoggingError> {
    let (filter, switch) = reloadable_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    installed.map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(switch)
}

/// Install the global subscriber from the `observability` config section.
pub fn init_tracing_from_config(
    config: &ObservabilityConfig,
) -> Result<LogLevelSwitch, LoggingError> {
    let level = parse_level(&config.log_level);
    let format: LogFormat = config.log_format.parse().unwrap_or_default();
    init_tracing(level, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("Info"), Level::INFO);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("unknown"), Level::INFO);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("unknown".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_level_roundtrip() {
        for level in [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ] {
            assert_eq!(u8_to_level(level_to_u8(level)), level);
        }
    }

    #[test]
    fn test_switch_changes_active_filter() {
        let (filter, switch) = reloadable_filter(Level::INFO);
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            switch.set_level(Level::WARN).unwrap();
            assert_eq!(switch.level(), Level::WARN);
            assert!(!tracing::enabled!(Level::INFO));
            assert!(tracing::enabled!(Level::WARN));

            switch.set_level(Level::DEBUG).unwrap();
            assert!(tracing::enabled!(Level::DEBUG));
        });
    }
}
