use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Overrides the data directory (handy for scratch stores).
pub const HOME_ENV: &str = "CONCERT_DRAFT_HOME";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let root = match std::env::var_os(HOME_ENV) {
        Some(home) => PathBuf::from(home),
        None => data_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
            .join("concert-draft"),
    };
    if let Err(err) = fs::create_dir_all(&root) {
        warn!("failed to create data root {:?}: {err}", root);
    }
    root
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path() -> PathBuf {
    data_root().join("concerts.sqlite")
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

pub fn backups_dir() -> PathBuf {
    data_root().join("backups")
}

pub fn logs_dir() -> PathBuf {
    data_root().join("logs")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("failed to create parent {:?}: {err}", parent);
        }
    }
}
