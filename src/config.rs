//! Field device configuration, read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the field console
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    /// SQLite file holding the survey queue
    pub db_path: PathBuf,
    /// Census API root; surveys are posted to `{api_base_url}/surveys`
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
    /// Initial value of the connectivity signal
    pub start_online: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("census_field.db"),
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            request_timeout: Duration::from_secs(15),
            log_dir: PathBuf::from("logs"),
            start_online: true,
        }
    }
}

impl FieldConfig {
    /// Defaults overridden by `CENSUS_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("CENSUS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("CENSUS_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CENSUS_HTTP_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("CENSUS_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(online) = parse_var::<bool>(&lookup, "CENSUS_START_ONLINE")? {
            config.start_online = online;
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
