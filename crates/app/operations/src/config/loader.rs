//! Configuration file loading.

use crate::config::types::ApiConfig;
use crate::config::validation::validate_config;
use crate::errors::ConfigError;
use std::path::Path;

/// Read, parse and validate the daemon configuration at `path`.
///
/// Fails with [`ConfigError::FileRead`], [`ConfigError::Parse`] or
/// [`ConfigError::ValidationFailed`], the latter listing every problem found.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ApiConfig, ConfigError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path_str.clone(),
        source: e,
    })?;

    load_config_from_str(&content, &path_str)
}

/// Parse and validate configuration held in memory; `source_name` labels errors.
pub fn load_config_from_str(content: &str, source_name: &str) -> Result<ApiConfig, ConfigError> {
    let config: ApiConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
        path: source_name.to_string(),
        source: e,
    })?;

    validate_config(&config)?;

    Ok(config)
}
