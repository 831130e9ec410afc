//! Runtime configuration.
//!
//! Values come from an optional YAML file named by `DAO_CONFIG`, then from
//! individual environment variables:
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `DAO_STORE` — contract backend: "memory" (default) or "sqlite"
//! - `DAO_DB_PATH` — SQLite file (default: `data/agent_dao.db`)
//! - `DAO_CHAIN_ID` — chain id reported by the local wallet (default: 31337)
//! - `DAO_WALLET_KEY` — hex private key of the connected wallet (optional)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wallet::session::DEFAULT_SESSION_DAYS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: String, value: String },
}

/// Which contract backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(()),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub db_path: PathBuf,
    pub chain_id: u64,
    #[serde(skip_serializing)]
    pub wallet_key: Option<String>,
    /// Simulated decryption latency after the wallet signs.
    pub decrypt_delay_ms: u64,
    /// How long a success banner stays up.
    pub success_dismiss_ms: u64,
    /// How long an error banner stays up.
    pub error_dismiss_ms: u64,
    pub session_duration_days: u32,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            store: StoreBackend::Memory,
            db_path: PathBuf::from("data/agent_dao.db"),
            chain_id: 31337,
            wallet_key: None,
            decrypt_delay_ms: 1500,
            success_dismiss_ms: 2000,
            error_dismiss_ms: 3000,
            session_duration_days: DEFAULT_SESSION_DAYS,
        }
    }
}

impl fmt::Debug for DaoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaoConfig")
            .field("port", &self.port)
            .field("store", &self.store)
            .field("db_path", &self.db_path)
            .field("chain_id", &self.chain_id)
            .field("wallet_key", &self.wallet_key.as_ref().map(|_| "<redacted>"))
            .field("decrypt_delay_ms", &self.decrypt_delay_ms)
            .field("success_dismiss_ms", &self.success_dismiss_ms)
            .field("error_dismiss_ms", &self.error_dismiss_ms)
            .field("session_duration_days", &self.session_duration_days)
            .finish()
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}

impl DaoConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = lookup("DAO_STORE") {
            self.store = parse_var("DAO_STORE", &v)?;
        }
        if let Some(v) = lookup("DAO_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DAO_CHAIN_ID") {
            self.chain_id = parse_var("DAO_CHAIN_ID", &v)?;
        }
        if let Some(v) = lookup("DAO_WALLET_KEY") {
            if !v.trim().is_empty() {
                self.wallet_key = Some(v);
            }
        }
        Ok(())
    }

    /// Load from `DAO_CONFIG` (if set) and the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("DAO_CONFIG") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn decrypt_delay(&self) -> Duration {
        Duration::from_millis(self.decrypt_delay_ms)
    }

    pub fn success_dismiss(&self) -> Duration {
        Duration::from_millis(self.success_dismiss_ms)
    }

    pub fn error_dismiss(&self) -> Duration {
        Duration::from_millis(self.error_dismiss_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaoConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.decrypt_delay(), Duration::from_millis(1500));
        assert_eq!(config.success_dismiss(), Duration::from_secs(2));
        assert_eq!(config.error_dismiss(), Duration::from_secs(3));
        assert_eq!(config.session_duration_days, 30);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DaoConfig::from_yaml_str("port: 9000\nstore: sqlite\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.chain_id, 31337);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("DAO_STORE", "SQLite"),
            ("DAO_DB_PATH", "/tmp/x.db"),
            ("DAO_CHAIN_ID", "11155111"),
            ("DAO_WALLET_KEY", "0xabc"),
        ]
        .into_iter()
        .collect();

        let mut config = DaoConfig::default();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.wallet_key.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = DaoConfig::default();
        let err = config
            .apply_env(|k| (k == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_debug_redacts_wallet_key() {
        let config = DaoConfig {
            wallet_key: Some("0xsecret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("0xsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
