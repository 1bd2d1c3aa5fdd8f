mod config;
pub mod database;
pub mod remote;

pub use config::{Config, ProgressConfig, RemoteConfig, SessionConfig, SoundConfig};
pub use database::{Database, HistoryRecord, HistoryStats};
pub use remote::RemoteHistory;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `BREATHROOM_DATA_DIR` wins when set. Otherwise `~/.config/breathroom`,
/// or `~/.config/breathroom-dev` with `BREATHROOM_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BREATHROOM_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BREATHROOM_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("breathroom-dev")
            } else {
                base_dir.join("breathroom")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
