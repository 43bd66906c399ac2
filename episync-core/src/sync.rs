//! The synchronization pipeline.
//!
//! One run is a full recompute: fetch history, reduce it to per-series
//! local progress, resolve remote identities and progress in one combined
//! query, plan forward-only deltas, apply them in combined mutations, and
//! report a structured per-series outcome. There is no local database and
//! no cross-run state; re-running after a partial failure re-plans only
//! what is still behind, because every update is an absolute set.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::lookup::LookupBatch;
use crate::planner::{UpdatePlanItem, plan_updates};
use crate::progress::{DEFAULT_COMPLETION_THRESHOLD, reduce_history};
use crate::traits::{HistorySource, ListService};
use crate::update::{
    BatchFailure, DEFAULT_MAX_BATCH_SIZE, UpdateResult, apply_plan,
};

/// A matched series whose remote progress already covers local progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSeries {
    pub series_key: String,
    pub completed_episode: u32,
    pub remote_progress: u32,
}

/// Everything decided before any mutation is submitted.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Series seen in history with no episode at the completion
    /// threshold. Informational, not an error.
    pub no_completed_episode: Vec<String>,
    /// Series with local progress but no remote catalog match.
    pub unmatched: Vec<String>,
    /// Matched series needing no update (remote >= local).
    pub skipped: Vec<SkippedSeries>,
    /// Updates to submit, in deterministic series order.
    pub items: Vec<UpdatePlanItem>,
}

/// Structured outcome of one full run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub no_completed_episode: Vec<String>,
    pub unmatched: Vec<String>,
    pub skipped: Vec<SkippedSeries>,
    /// The plan that was submitted, one item per attempted update.
    pub planned: Vec<UpdatePlanItem>,
    /// One result per planned item.
    pub results: Vec<UpdateResult>,
    /// Whole-sub-batch transport failures, retryable at sub-batch
    /// granularity.
    pub batch_failures: Vec<BatchFailure>,
}

impl SyncReport {
    pub fn updated_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded).count()
    }

    /// Whether anything in the run needs attention or a retry.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0 || !self.batch_failures.is_empty()
    }
}

/// Watch-history reconciliation engine, generic over its collaborators.
///
/// Collaborators are injected at construction so the engine can run
/// against fakes in tests and against multiple credential sets in one
/// process.
#[derive(Debug)]
pub struct SyncEngine<H, L> {
    history: H,
    list_service: L,
    completion_threshold: f32,
    max_batch_size: usize,
}

impl<H, L> SyncEngine<H, L>
where
    H: HistorySource,
    L: ListService,
{
    pub fn new(history: H, list_service: L) -> Self {
        Self {
            history,
            list_service,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_completion_threshold(mut self, threshold: f32) -> Self {
        self.completion_threshold = threshold;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn list_service(&self) -> &L {
        &self.list_service
    }

    /// Compute the update plan without submitting any mutation.
    ///
    /// Errors only when history cannot be fetched or the combined lookup
    /// request fails outright; per-series conditions land in the plan.
    pub async fn plan(&self) -> Result<SyncPlan> {
        let events = self.history.fetch_history().await?;
        tracing::info!(events = events.len(), "fetched watch history");

        let local = reduce_history(&events, self.completion_threshold);
        let seen: BTreeSet<&str> =
            events.iter().map(|e| e.series_key.as_str()).collect();
        let no_completed_episode: Vec<String> = seen
            .iter()
            .filter(|key| !local.contains_key(**key))
            .map(|key| key.to_string())
            .collect();

        if local.is_empty() {
            tracing::info!("no series with completed episodes; nothing to do");
            return Ok(SyncPlan { no_completed_episode, ..SyncPlan::default() });
        }

        let batch = LookupBatch::build(local.keys().cloned())
            .expect("non-empty local progress");
        tracing::info!(series = batch.len(), "resolving series against remote catalog");
        tracing::debug!(query = batch.document().query.as_str(), "combined lookup");
        let response =
            self.list_service.submit_combined_query(batch.document()).await?;
        let remote = batch.resolve(&response);

        let items = plan_updates(&local, &remote);
        let mut unmatched = Vec::new();
        let mut skipped = Vec::new();
        for (key, progress) in &local {
            match remote.get(key) {
                Some(Some(matched)) => {
                    if progress.completed_episode <= matched.remote_progress {
                        skipped.push(SkippedSeries {
                            series_key: key.clone(),
                            completed_episode: progress.completed_episode,
                            remote_progress: matched.remote_progress,
                        });
                    }
                }
                _ => unmatched.push(key.clone()),
            }
        }

        Ok(SyncPlan { no_completed_episode, unmatched, skipped, items })
    }

    /// Run the full pipeline and report per-series outcomes.
    pub async fn run(&self) -> Result<SyncReport> {
        let plan = self.plan().await?;
        let outcome = if plan.items.is_empty() {
            tracing::info!("remote progress is already current");
            Default::default()
        } else {
            tracing::info!(updates = plan.items.len(), "applying update plan");
            apply_plan(&self.list_service, &plan.items, self.max_batch_size)
                .await
        };

        Ok(SyncReport {
            no_completed_episode: plan.no_completed_episode,
            unmatched: plan.unmatched,
            skipped: plan.skipped,
            planned: plan.items,
            results: outcome.results,
            batch_failures: outcome.batch_failures,
        })
    }
}
