//! Environment-backed configuration loading.
//!
//! The loader reads from an injected key lookup rather than the process
//! environment directly, so tests never mutate global state.
//! [`Config::from_env`] is the thin wrapper the binary uses after
//! loading any `.env` file.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{AnilistConfig, Config, CrunchyrollConfig, SyncConfig};

pub const ENV_CRUNCHYROLL_ACCESS_TOKEN: &str = "CRUNCHYROLL_ACCESS_TOKEN";
pub const ENV_CRUNCHYROLL_USER_ID: &str = "CRUNCHYROLL_USER_ID";
pub const ENV_ANILIST_ACCESS_TOKEN: &str = "ANILIST_ACCESS_TOKEN";
pub const ENV_COMPLETION_THRESHOLD: &str = "EPISYNC_COMPLETION_THRESHOLD";
pub const ENV_MAX_BATCH_SIZE: &str = "EPISYNC_MAX_BATCH_SIZE";
pub const ENV_CACHE_DIR: &str = "EPISYNC_CACHE_DIR";

// Defaults mirror the engine's policy constants.
const DEFAULT_COMPLETION_THRESHOLD: f32 = 0.9;
const DEFAULT_MAX_BATCH_SIZE: usize = 25;
const DEFAULT_CACHE_DIR: &str = ".episync-cache";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Load configuration from any key lookup.
pub fn load_from<F>(get: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| -> Result<String, ConfigError> {
        get(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingVar(key))
    };

    let completion_threshold = match get(ENV_COMPLETION_THRESHOLD) {
        None => DEFAULT_COMPLETION_THRESHOLD,
        Some(raw) => {
            let parsed: f32 = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: ENV_COMPLETION_THRESHOLD,
                    reason: format!("not a number: {raw:?}"),
                }
            })?;
            if parsed <= 0.0 || parsed > 1.0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_COMPLETION_THRESHOLD,
                    reason: "must be in (0, 1]".to_string(),
                });
            }
            parsed
        }
    };

    let max_batch_size = match get(ENV_MAX_BATCH_SIZE) {
        None => DEFAULT_MAX_BATCH_SIZE,
        Some(raw) => {
            let parsed: usize = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: ENV_MAX_BATCH_SIZE,
                    reason: format!("not an integer: {raw:?}"),
                }
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_MAX_BATCH_SIZE,
                    reason: "must be at least 1".to_string(),
                });
            }
            parsed
        }
    };

    let cache_dir = get(ENV_CACHE_DIR)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    Ok(Config {
        crunchyroll: CrunchyrollConfig {
            access_token: required(ENV_CRUNCHYROLL_ACCESS_TOKEN)?,
            user_id: required(ENV_CRUNCHYROLL_USER_ID)?,
        },
        anilist: AnilistConfig {
            access_token: required(ENV_ANILIST_ACCESS_TOKEN)?,
        },
        sync: SyncConfig { completion_threshold, max_batch_size, cache_dir },
    })
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_from(|key| std::env::var(key).ok())
    }
}
