//! Delta planner.
//!
//! Joins local progress with resolved remote state and decides which
//! series need an update. Only forward progress is ever planned: the
//! update sets remote progress to exactly the local completed episode, so
//! re-running with the same snapshots plans the same work (idempotent).

use std::collections::BTreeMap;

use crate::lookup::RemoteMediaMatch;
use crate::progress::SeriesLocalProgress;

/// A pending decision to raise one series' tracked progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlanItem {
    pub series_key: String,
    pub remote_media_id: i64,
    /// Absolute value to set remotely; always the local completed
    /// episode, never an increment.
    pub target_progress: u32,
}

/// Plan one series. `None` when remote progress already meets or exceeds
/// local progress.
pub fn plan_update(
    local: &SeriesLocalProgress,
    remote: &RemoteMediaMatch,
) -> Option<UpdatePlanItem> {
    if local.completed_episode > remote.remote_progress {
        Some(UpdatePlanItem {
            series_key: local.series_key.clone(),
            remote_media_id: remote.remote_media_id,
            target_progress: local.completed_episode,
        })
    } else {
        None
    }
}

/// Plan the whole run: inner join of the two maps on series key, one
/// item per series whose local progress strictly exceeds remote. Output
/// order follows the (sorted) local map, so plans are deterministic.
pub fn plan_updates(
    local: &BTreeMap<String, SeriesLocalProgress>,
    remote: &BTreeMap<String, Option<RemoteMediaMatch>>,
) -> Vec<UpdatePlanItem> {
    local
        .values()
        .filter_map(|progress| {
            let matched = remote.get(&progress.series_key)?.as_ref()?;
            plan_update(progress, matched)
        })
        .collect()
}
