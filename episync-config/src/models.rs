use std::path::{Path, PathBuf};

/// Full configuration for one synchronization run.
#[derive(Debug, Clone)]
pub struct Config {
    pub crunchyroll: CrunchyrollConfig,
    pub anilist: AnilistConfig,
    pub sync: SyncConfig,
}

impl Config {
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.sync.cache_dir)?;
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.sync.cache_dir
    }
}

/// Credentials for the streaming-history side.
#[derive(Debug, Clone)]
pub struct CrunchyrollConfig {
    pub access_token: String,
    pub user_id: String,
}

/// Credentials for the list-tracking side.
#[derive(Debug, Clone)]
pub struct AnilistConfig {
    pub access_token: String,
}

/// Sync policy knobs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Fraction of an episode that must be watched to count as
    /// completed, in `(0, 1]`. Matches the engine default when unset.
    pub completion_threshold: f32,
    /// Largest number of updates multiplexed into one combined mutation.
    pub max_batch_size: usize,
    /// Directory for the on-disk watch-history cache.
    pub cache_dir: PathBuf,
}
