//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `STORAGE_BACKEND` | `sql` (`sql` or `collection`) |
//! | `DATABASE_URL` | `sqlite://notes.db` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `COLLECTION_DATA_PATH` | `rumi_data/collections.json` |
//! | `MAX_BODY_BYTES` | `1048576` |
//!
//! Logging variables (`LOG_FORMAT`, `LOG_FILE`, `LOG_ANSI`, `RUST_LOG`) are
//! read by the binary when it installs the subscriber.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use rumi_core::{defaults, Error, Result};
use rumi_db::{StorageBackend, StorageConfig};

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            max_body_bytes: defaults::MAX_BODY_BYTES,
            storage: StorageConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Config(format!("{} has invalid value '{}'", name, raw))
        }),
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match var("STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>()?,
            None => defaults.storage.backend,
        };

        let storage = StorageConfig {
            backend,
            database_url: var("DATABASE_URL").unwrap_or(defaults.storage.database_url),
            max_connections: parse_var(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                defaults.storage.max_connections,
            )?,
            collection_path: var("COLLECTION_DATA_PATH")
                .map(PathBuf::from)
                .or(defaults.storage.collection_path),
        };

        if storage.max_connections == 0 {
            return Err(Error::Config(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", var("PORT"), defaults.port)?,
            max_body_bytes: parse_var(
                "MAX_BODY_BYTES",
                var("MAX_BODY_BYTES"),
                defaults.max_body_bytes,
            )?,
            storage,
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sql);
        assert_eq!(config.storage.database_url, "sqlite://notes.db");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("STORAGE_BACKEND", "collection"),
            ("COLLECTION_DATA_PATH", "/tmp/notes.json"),
            ("DB_MAX_CONNECTIONS", "3"),
            ("MAX_BODY_BYTES", "2048"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.storage.backend, StorageBackend::Collection);
        assert_eq!(
            config.storage.collection_path,
            Some(PathBuf::from("/tmp/notes.json"))
        );
        assert_eq!(config.storage.max_connections, 3);
        assert_eq!(config.max_body_bytes, 2048);
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            [("PORT", "eighty")],
            [("STORAGE_BACKEND", "mongo")],
            [("DB_MAX_CONNECTIONS", "0")],
        ] {
            let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{:?}", pairs);
        }
    }
}
