//! On-disk caching for history sources.
//!
//! Wraps any [`HistorySource`] with a `cacache`-backed store of the
//! normalized events, so repeated runs against a slow or rate-limited
//! history API reuse the last fetch. The engine never sees the
//! difference; cache invalidation policy stays outside the core
//! pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::history::WatchEvent;
use crate::traits::HistorySource;

/// Stable, versioned index key for the cached event set.
const HISTORY_CACHE_KEY: &str = "history/v1/watch-events";

/// Decorator serving `fetch_history` from an on-disk cache when present,
/// delegating to the wrapped source otherwise.
///
/// A corrupt or unreadable cache entry falls back to a fresh fetch; a
/// failed cache write is logged and ignored. Only [`invalidate`] errors
/// surface, since it is an explicit user action.
///
/// [`invalidate`]: CachedHistorySource::invalidate
#[derive(Debug)]
pub struct CachedHistorySource<S> {
    inner: S,
    cache_dir: PathBuf,
}

impl<S> CachedHistorySource<S> {
    pub fn new(inner: S, cache_dir: impl Into<PathBuf>) -> Self {
        Self { inner, cache_dir: cache_dir.into() }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Drop the cached event set so the next fetch hits the source.
    pub async fn invalidate(&self) -> Result<()> {
        let opts = cacache::index::RemoveOpts::new().remove_fully(true);
        opts.remove(&self.cache_dir, HISTORY_CACHE_KEY)
            .await
            .map_err(|e| SyncError::Cache(format!("cache remove failed: {e}")))
    }
}

#[async_trait]
impl<S: HistorySource> HistorySource for CachedHistorySource<S> {
    async fn fetch_history(&self) -> Result<Vec<WatchEvent>> {
        match cacache::read(&self.cache_dir, HISTORY_CACHE_KEY).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<WatchEvent>>(&bytes) {
                Ok(events) => {
                    tracing::info!(
                        events = events.len(),
                        "serving watch history from cache"
                    );
                    return Ok(events);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding corrupt history cache entry");
                }
            },
            Err(cacache::Error::EntryNotFound(_, _)) => {}
            Err(err) => {
                tracing::warn!(error = %err, "history cache read failed");
            }
        }

        let events = self.inner.fetch_history().await?;
        let bytes = serde_json::to_vec(&events)?;
        if let Err(err) =
            cacache::write(&self.cache_dir, HISTORY_CACHE_KEY, &bytes).await
        {
            // Not worth failing the run over; next run just refetches.
            tracing::warn!(error = %err, "history cache write failed");
        }
        Ok(events)
    }
}
