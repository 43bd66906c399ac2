use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::history::WatchEvent;
use crate::traits::HistorySource;

const CRUNCHYROLL_BASE: &str = "https://www.crunchyroll.com";
const HISTORY_PAGE_SIZE: u32 = 1000;

/// The history endpoint sits behind bot protection that rejects
/// non-browser clients, so requests carry a browser profile.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

const RATE_LIMIT_ATTEMPTS: u32 = 3;
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(300);

/// Watch-history client for the streaming service.
///
/// Fetches the viewer's history in one page and normalizes each raw
/// entry into a [`WatchEvent`]. Entries without a series title or episode
/// number (films, specials) are skipped.
#[derive(Debug)]
pub struct CrunchyrollProvider {
    client: reqwest::Client,
    access_token: String,
    user_id: String,
}

impl CrunchyrollProvider {
    pub fn new(
        access_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            user_id: user_id.into(),
        }
    }

    fn history_url(&self) -> String {
        format!("{CRUNCHYROLL_BASE}/content/v2/{}/watch-history", self.user_id)
    }

    async fn fetch_raw(&self) -> Result<Vec<HistoryEntry>> {
        let url = self.history_url();
        let page_size = HISTORY_PAGE_SIZE.to_string();
        for attempt in 1..=RATE_LIMIT_ATTEMPTS {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("page_size", page_size.as_str()),
                    ("preferred_audio_language", "ja-JP"),
                    ("locale", "en-US"),
                ])
                .bearer_auth(&self.access_token)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .header("Referer", "https://www.crunchyroll.com/")
                .header("Origin", "https://www.crunchyroll.com")
                .header("Sec-Fetch-Site", "same-origin")
                .send()
                .await?;

            if response.status() == 401 {
                return Err(SyncError::InvalidToken);
            }
            if response.status() == 429 {
                tracing::warn!(
                    attempt,
                    delay_secs = RATE_LIMIT_DELAY.as_secs(),
                    "history API rate limited, backing off"
                );
                tokio::time::sleep(RATE_LIMIT_DELAY).await;
                continue;
            }
            if !response.status().is_success() {
                return Err(SyncError::Api(format!(
                    "history API returned status {}",
                    response.status()
                )));
            }

            let payload: HistoryResponse = response.json().await?;
            return Ok(payload.data);
        }
        Err(SyncError::RateLimited)
    }
}

#[async_trait]
impl HistorySource for CrunchyrollProvider {
    async fn fetch_history(&self) -> Result<Vec<WatchEvent>> {
        let entries = self.fetch_raw().await?;
        tracing::info!(entries = entries.len(), "fetched raw watch history");
        Ok(entries.into_iter().filter_map(normalize).collect())
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    fully_watched: bool,
    /// Playback position in seconds.
    #[serde(default)]
    playhead: f64,
    panel: Option<Panel>,
}

#[derive(Debug, Deserialize)]
struct Panel {
    episode_metadata: Option<EpisodeMetadata>,
}

#[derive(Debug, Deserialize)]
struct EpisodeMetadata {
    series_title: Option<String>,
    episode_number: Option<u32>,
    duration_ms: Option<u64>,
}

/// Normalize one raw history entry. `fully_watched` overrides the
/// playhead, which can sit just short of the duration on a finished
/// episode (credits, preview stingers).
fn normalize(entry: HistoryEntry) -> Option<WatchEvent> {
    let meta = entry.panel?.episode_metadata?;
    let title = meta.series_title.filter(|t| !t.is_empty())?;
    let episode = meta.episode_number.filter(|&e| e > 0)?;
    let fraction = if entry.fully_watched {
        1.0
    } else {
        match meta.duration_ms {
            Some(ms) if ms > 0 => {
                (entry.playhead * 1000.0 / ms as f64) as f32
            }
            _ => 0.0,
        }
    };
    Some(WatchEvent::new(title, episode, fraction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> HistoryEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn fully_watched_maps_to_full_fraction() {
        let event = normalize(entry(json!({
            "fully_watched": true,
            "playhead": 12,
            "panel": {"episode_metadata": {
                "series_title": "SeriesA",
                "episode_number": 3,
                "duration_ms": 1_440_000,
            }}
        })))
        .unwrap();
        assert_eq!(event.series_key, "SeriesA");
        assert_eq!(event.episode_number, 3);
        assert_eq!(event.watched_fraction, 1.0);
    }

    #[test]
    fn partial_playhead_maps_to_fraction_of_duration() {
        let event = normalize(entry(json!({
            "playhead": 720,
            "panel": {"episode_metadata": {
                "series_title": "SeriesA",
                "episode_number": 1,
                "duration_ms": 1_440_000,
            }}
        })))
        .unwrap();
        assert!((event.watched_fraction - 0.5).abs() < 1e-6);
    }

    #[test]
    fn entries_without_series_metadata_are_skipped() {
        assert!(normalize(entry(json!({"playhead": 10}))).is_none());
        assert!(
            normalize(entry(json!({
                "panel": {"episode_metadata": {"episode_number": 2}}
            })))
            .is_none()
        );
        assert!(
            normalize(entry(json!({
                "panel": {"episode_metadata": {"series_title": "A"}}
            })))
            .is_none()
        );
    }

    #[test]
    fn zero_duration_counts_as_unwatched() {
        let event = normalize(entry(json!({
            "playhead": 500,
            "panel": {"episode_metadata": {
                "series_title": "SeriesA",
                "episode_number": 1,
                "duration_ms": 0,
            }}
        })))
        .unwrap();
        assert_eq!(event.watched_fraction, 0.0);
    }
}
