use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::utils;

pub const TIMEZONE_ENV: &str = "CONCERT_DRAFT_TZ";
pub const FETCH_TIMEOUT_ENV: &str = "CONCERT_DRAFT_FETCH_TIMEOUT";

const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
const DEFAULT_BACKUP_RETENTION: usize = 10;
const DEFAULT_USER_AGENT: &str = "concert-draft/0.1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone: {0}")]
    Timezone(String),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config mutex poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// IANA zone deciding "today" and the year of year-less dates.
    pub timezone: String,
    pub fetch_timeout_secs: u64,
    /// Database backups kept before the oldest is pruned.
    pub backup_retention: usize,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AppConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(tz) = std::env::var(TIMEZONE_ENV) {
            self.timezone = tz;
        }
        if let Some(secs) = std::env::var(FETCH_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.fetch_timeout_secs = secs;
        }
        self
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    pub fn load_from(path: PathBuf) -> Self {
        let data = read_config(&path)
            .unwrap_or_else(|err| {
                warn!("ignoring unreadable config {:?}: {err}", path);
                AppConfig::default()
            })
            .with_env_overrides();
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.data.lock().map_err(|_| ConfigError::Poisoned)?;
        let mut next = guard.clone();
        transform(&mut next);
        next.tz()?;
        write_config(&self.path, &next)?;
        *guard = next.clone();
        Ok(next)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
