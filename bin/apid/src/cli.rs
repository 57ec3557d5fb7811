use std::path::PathBuf;

use clap::Parser;
use opera_operations::config::{load_config, validate_config};
use opera_operations::{ApiConfig, ConfigError};

pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

#[derive(Debug, Clone, Parser)]
#[command(name = "apid", version, about = "Opera read API daemon")]
pub struct Cli {
    /// Config YAML path
    #[arg(long, env = "APID_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Full node WebSocket endpoint override
    #[arg(long, env = "APID_NODE_URL")]
    pub node_url: Option<String>,

    /// Document store path override
    #[arg(long)]
    pub data_path: Option<String>,

    /// Log level override
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format override (json or pretty)
    #[arg(long)]
    pub log_format: Option<String>,
}

/// Resolve the configuration: YAML file < CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<ApiConfig, ConfigError> {
    let mut config = load_config(&cli.config)?;

    if let Some(ref v) = cli.node_url {
        config.node.url = v.clone();
    }
    if let Some(ref v) = cli.data_path {
        config.storage.path = v.clone();
    }
    if let Some(ref v) = cli.log_level {
        config.observability.log_level = v.clone();
    }
    if let Some(ref v) = cli.log_format {
        config.observability.log_format = v.clone();
    }

    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
node:
  url: "ws://127.0.0.1:18546"
storage:
  path: "./data/opera-api.sqlite"
"#;

    fn cli_for(path: PathBuf) -> Cli {
        Cli {
            config: path,
            node_url: None,
            data_path: None,
            log_level: None,
            log_format: None,
        }
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();

        let mut cli = cli_for(path);
        cli.node_url = Some("wss://rpc.example.org".to_string());
        cli.data_path = Some("/var/lib/apid/db.sqlite".to_string());
        cli.log_level = Some("debug".to_string());

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.node.url, "wss://rpc.example.org");
        assert_eq!(config.storage.path, "/var/lib/apid/db.sqlite");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();

        let mut cli = cli_for(path);
        cli.node_url = Some("http://127.0.0.1:18545".to_string());

        assert!(matches!(
            resolve_config(&cli),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_parses_command_line() {
        let cli = Cli::try_parse_from(["apid", "--config", "/etc/apid.yaml", "--log-level", "warn"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/apid.yaml"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }
}
