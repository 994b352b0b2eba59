use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tokio::net::TcpListener;
use tracing::Level;

use crate::models::service_model::ServiceConfig;
use canlog::CanlogError;

pub const CONFIG_ENV: &str = "CANLOG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "canlog.json";

pub struct Startup {
    pub config: ServiceConfig,
    /// `None` when no config file was found and defaults apply.
    pub config_file: Option<PathBuf>,
    pub listener: TcpListener,
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Read the config at `path`; a missing file yields the defaults.
pub async fn load_config(path: &Path) -> Result<Option<ServiceConfig>> {
    let data = match fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("File read error: {}", path.display())),
    };

    let config = serde_json::from_str(&data)
        .with_context(|| format!("JSON parse error: {}", path.display()))?;
    Ok(Some(config))
}

/// Bind the configured address and write the port actually bound back into `config`.
pub async fn bind(config: &mut ServiceConfig) -> Result<TcpListener> {
    let bind_addr = format!("{}:{}", config.connection.ip, config.connection.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Bind failed: {}", bind_addr))?;

    config.connection.port = listener.local_addr().context("Addr error")?.port();
    Ok(listener)
}

pub async fn init_config_and_bind() -> Result<Startup> {
    let path = config_path();
    let loaded = load_config(&path).await?;
    let config_file = loaded.is_some().then(|| path.clone());
    let mut config = loaded.unwrap_or_default();

    let listener = bind(&mut config).await?;

    Ok(Startup {
        config,
        config_file,
        listener,
    })
}

pub fn parse_level(level: &str) -> canlog::Result<Level> {
    Level::from_str(level.trim())
        .map_err(|_| CanlogError::Config(format!("unknown log level {:?}", level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(&dir.path().join("canlog.json")).await.unwrap();
        assert!(loaded.is_none());
        let config = loaded.unwrap_or_default();
        assert_eq!(config.connection.port, 0);
        assert_eq!(config.max_errors, 100);
    }

    #[tokio::test]
    async fn test_partial_config_and_port_patch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canlog.json");
        std::fs::write(
            &path,
            r#"{"name": "pit-wall", "max_errors": 0, "connection": {"ip": "127.0.0.1", "port": 0}}"#,
        )
        .unwrap();

        let mut config = load_config(&path).await.unwrap().unwrap();
        assert_eq!(config.name, "pit-wall");
        assert_eq!(config.max_errors, 0);
        assert_eq!(config.log_level, "info");

        let listener = bind(&mut config).await.unwrap();
        assert_ne!(config.connection.port, 0);
        assert_eq!(listener.local_addr().unwrap().port(), config.connection.port);
    }

    #[tokio::test]
    async fn test_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canlog.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_config(&path).await.is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), Level::WARN);
        assert!(matches!(parse_level("loud"), Err(CanlogError::Config(_))));
    }
}
