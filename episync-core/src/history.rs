use serde::{Deserialize, Serialize};

/// One raw episode-watch event from the source history.
///
/// Multiple events may reference the same `(series_key, episode_number)`
/// pair; the reducer takes the most-complete one. `watched_fraction` is
/// the viewed share of the episode's duration, clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Identifier grouping all episodes of one show (the series title in
    /// the source history).
    pub series_key: String,
    /// Episode number within the series. Positive, possibly
    /// non-contiguous across events.
    pub episode_number: u32,
    /// How much of the episode was viewed, in `[0, 1]`.
    pub watched_fraction: f32,
}

impl WatchEvent {
    /// Create a watch event, clamping the fraction into `[0, 1]`.
    pub fn new(
        series_key: impl Into<String>,
        episode_number: u32,
        watched_fraction: f32,
    ) -> Self {
        Self {
            series_key: series_key.into(),
            episode_number,
            watched_fraction: watched_fraction.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(WatchEvent::new("A", 1, 1.7).watched_fraction, 1.0);
        assert_eq!(WatchEvent::new("A", 1, -0.3).watched_fraction, 0.0);
        assert_eq!(WatchEvent::new("A", 1, 0.42).watched_fraction, 0.42);
    }
}
