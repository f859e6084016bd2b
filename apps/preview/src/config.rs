use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_DEBOUNCE_MS: u64 = 400;
const MIN_DEBOUNCE_MS: u64 = 50;
const MAX_DEBOUNCE_MS: u64 = 5000;

/// Where persisted preview state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File { dir: PathBuf },
    Redis { url: String },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::File { .. } => "file",
            StoreBackend::Redis { .. } => "redis",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup aborts if a variable is present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub store: StoreBackend,
    pub debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "file".to_string());
        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "file" => StoreBackend::File {
                dir: PathBuf::from(lookup("STORE_DIR").unwrap_or_else(|| "./data".to_string())),
            },
            "redis" => StoreBackend::Redis {
                url: require(&lookup, "REDIS_URL")?,
            },
            other => bail!("STORE_BACKEND must be one of memory, file, redis (got '{other}')"),
        };

        let debounce_ms = match lookup("PREVIEW_DEBOUNCE_MS") {
            Some(raw) => parse_num::<u64>(&raw, "PREVIEW_DEBOUNCE_MS")?,
            None => DEFAULT_DEBOUNCE_MS,
        };

        Ok(Config {
            port,
            rust_log,
            store,
            debounce: Duration::from_millis(debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS)),
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_num<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a number (got '{raw}')"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(
            config.store,
            StoreBackend::File {
                dir: PathBuf::from("./data")
            }
        );
        assert_eq!(config.debounce, Duration::from_millis(400));
    }

    #[test]
    fn test_debounce_is_clamped() {
        let config = config_from(&[("PREVIEW_DEBOUNCE_MS", "5")]).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(50));
        let config = config_from(&[("PREVIEW_DEBOUNCE_MS", "60000")]).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(5000));
        assert!(config_from(&[("PREVIEW_DEBOUNCE_MS", "soon")]).is_err());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        assert!(config_from(&[("STORE_BACKEND", "redis")]).is_err());
        let config = config_from(&[
            ("STORE_BACKEND", "redis"),
            ("REDIS_URL", "redis://127.0.0.1/"),
        ])
        .unwrap();
        assert_eq!(config.store.name(), "redis");
    }

    #[test]
    fn test_invalid_port_and_backend_rejected() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
    }
}
