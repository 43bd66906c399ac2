//! Series progress reducer.
//!
//! Folds the full watch-event collection into one "last fully completed
//! episode" fact per series. A series without any episode at or above the
//! completion threshold is omitted from the output; that is a normal
//! outcome, not an error.

use std::collections::BTreeMap;

use crate::history::WatchEvent;

/// Fraction of an episode's duration that must be watched for the episode
/// to count as fully watched.
pub const DEFAULT_COMPLETION_THRESHOLD: f32 = 0.9;

/// Highest fully-watched episode for one series, derived once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLocalProgress {
    pub series_key: String,
    /// Highest episode number whose best-known watched fraction met the
    /// threshold. Lower episodes are not required to meet it.
    pub completed_episode: u32,
}

/// Reduce watch events to per-series local progress.
///
/// Grouping is order-independent: permuting `events` never changes the
/// result. Within a series, the best-known fraction per episode is the
/// maximum across duplicate events, and the reported episode is the
/// highest one meeting `threshold`. The search walks episode numbers
/// descending and accepts gaps, so watching episode 5 out of order still
/// reports 5.
pub fn reduce_history(
    events: &[WatchEvent],
    threshold: f32,
) -> BTreeMap<String, SeriesLocalProgress> {
    // series -> episode -> best-known fraction
    let mut grouped: BTreeMap<&str, BTreeMap<u32, f32>> = BTreeMap::new();
    for event in events {
        let best = grouped
            .entry(event.series_key.as_str())
            .or_default()
            .entry(event.episode_number)
            .or_insert(0.0);
        if event.watched_fraction > *best {
            *best = event.watched_fraction;
        }
    }

    let mut progress = BTreeMap::new();
    for (series_key, episodes) in grouped {
        let completed = episodes
            .iter()
            .rev()
            .find(|(_, fraction)| **fraction >= threshold)
            .map(|(episode, _)| *episode);

        match completed {
            Some(completed_episode) => {
                progress.insert(
                    series_key.to_string(),
                    SeriesLocalProgress {
                        series_key: series_key.to_string(),
                        completed_episode,
                    },
                );
            }
            None => {
                tracing::debug!(series = series_key, "no fully watched episode");
            }
        }
    }
    progress
}
