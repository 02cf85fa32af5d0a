// Application configuration assembled from the environment (and a .env file when present)

use crate::api::{ClientConfig, ClientError};
use crate::query_cache::CacheConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub cache: CacheConfig,
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, ClientError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ClientError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Same rules as from_env with an injectable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        let base_url = lookup("DARIMAIDS_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        config.client.base_url = match base_url {
            Some(url) => url,
            None => {
                let port: u16 = parse_var("DARIMAIDS_BASE_PORT", lookup("DARIMAIDS_BASE_PORT"))?
                    .unwrap_or(DEFAULT_PORT);
                format!("http://localhost:{}", port)
            }
        };

        if let Some(timeout_ms) = parse_var::<u64>("DARIMAIDS_TIMEOUT_MS", lookup("DARIMAIDS_TIMEOUT_MS"))? {
            if timeout_ms == 0 {
                return Err(ClientError::ConfigError(
                    "DARIMAIDS_TIMEOUT_MS must be greater than zero".to_string(),
                ));
            }
            config.client.timeout_ms = timeout_ms;
        }
        if let Some(secs) = parse_var::<u64>("DARIMAIDS_CACHE_STALE_SECS", lookup("DARIMAIDS_CACHE_STALE_SECS"))? {
            config.cache.stale_time = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("DARIMAIDS_CACHE_GC_SECS", lookup("DARIMAIDS_CACHE_GC_SECS"))? {
            config.cache.gc_time = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
