//! Update batcher.
//!
//! Applies planned updates with combined mutations, one alias per item
//! (`u0`, `u1`, ...). Plans larger than the per-request bound are split
//! into sequential sub-batches; each sub-batch is built and submitted
//! independently so one transport failure never poisons its siblings.

use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::graphql::{CombinedResponse, GraphqlDocument};
use crate::planner::UpdatePlanItem;
use crate::traits::ListService;

/// Largest number of mutations multiplexed into one request. The remote
/// service limits per-request query complexity, not request count.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Outcome of one submitted plan item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub series_key: String,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

/// Whole-request failure of one sub-batch, kept alongside the per-item
/// results so a caller can retry exactly that slice of the plan.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based index of the sub-batch within the run.
    pub batch_index: usize,
    pub error: SyncError,
}

/// Per-item results plus any whole-sub-batch failures for one applied
/// plan.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub results: Vec<UpdateResult>,
    pub batch_failures: Vec<BatchFailure>,
}

/// One combined mutation over a sub-batch of plan items.
#[derive(Debug, Clone)]
pub struct UpdateBatch {
    document: GraphqlDocument,
    /// Index i corresponds to alias `u{i}`.
    items: Vec<UpdatePlanItem>,
}

fn alias(index: usize) -> String {
    format!("u{index}")
}

impl UpdateBatch {
    /// Build one combined mutation. Returns `None` for an empty slice.
    pub fn build(items: &[UpdatePlanItem]) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let mut declarations = Vec::with_capacity(items.len() * 2);
        let mut body = String::new();
        let mut variables = Map::new();
        for (i, item) in items.iter().enumerate() {
            let media_var = format!("mediaId{i}");
            let progress_var = format!("progress{i}");
            declarations.push(format!("${media_var}: Int!"));
            declarations.push(format!("${progress_var}: Int!"));
            body.push_str(&format!(
                "{alias}: SaveMediaListEntry(mediaId: ${media_var}, progress: ${progress_var}) {{ id progress }}\n",
                alias = alias(i),
            ));
            variables
                .insert(media_var, Value::from(item.remote_media_id));
            variables
                .insert(progress_var, Value::from(item.target_progress));
        }

        let query =
            format!("mutation ({}) {{\n{}}}", declarations.join(", "), body);
        Some(Self {
            document: GraphqlDocument { query, variables },
            items: items.to_vec(),
        })
    }

    /// The combined request to submit.
    pub fn document(&self) -> &GraphqlDocument {
        &self.document
    }

    /// Parse a combined response into one result per item.
    ///
    /// An alias reporting a remote error fails only its own item. An
    /// alias missing from the response is a protocol anomaly, logged and
    /// recorded as a failure for that item alone; when the service
    /// rejected the request before execution (`data: null`) the
    /// rejection message arrives as a path-less error, which is used as
    /// the detail instead of the generic anomaly text.
    pub fn resolve(&self, response: &CombinedResponse) -> Vec<UpdateResult> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let alias = alias(i);
                match response.field(&alias) {
                    Some(value) if !value.is_null() => UpdateResult {
                        series_key: item.series_key.clone(),
                        succeeded: true,
                        error_detail: None,
                    },
                    Some(_) => {
                        let detail = response
                            .error_for(&alias)
                            .map(|e| e.message.clone())
                            .unwrap_or_else(|| {
                                "remote reported no result for this update"
                                    .to_string()
                            });
                        UpdateResult {
                            series_key: item.series_key.clone(),
                            succeeded: false,
                            error_detail: Some(detail),
                        }
                    }
                    None => {
                        tracing::warn!(
                            series = item.series_key.as_str(),
                            alias = alias.as_str(),
                            "mutation response is missing an alias"
                        );
                        let detail = response
                            .errors
                            .iter()
                            .find(|e| e.path.is_empty())
                            .map(|e| e.message.clone())
                            .unwrap_or_else(|| {
                                "alias missing from combined response"
                                    .to_string()
                            });
                        UpdateResult {
                            series_key: item.series_key.clone(),
                            succeeded: false,
                            error_detail: Some(detail),
                        }
                    }
                }
            })
            .collect()
    }

    /// Mark every item in the sub-batch failed with the same detail.
    /// Used when the whole request could not be completed.
    pub fn fail_all(&self, detail: &str) -> Vec<UpdateResult> {
        self.items
            .iter()
            .map(|item| UpdateResult {
                series_key: item.series_key.clone(),
                succeeded: false,
                error_detail: Some(detail.to_string()),
            })
            .collect()
    }
}

/// Apply a plan in sub-batches of at most `max_batch_size` items.
///
/// Sub-batches are submitted sequentially. A transport failure marks
/// every item of that sub-batch failed and records a [`BatchFailure`];
/// the remaining sub-batches still run.
pub async fn apply_plan<S>(
    service: &S,
    plan: &[UpdatePlanItem],
    max_batch_size: usize,
) -> UpdateOutcome
where
    S: ListService + ?Sized,
{
    let max_batch_size = max_batch_size.max(1);
    let mut outcome = UpdateOutcome::default();
    for (batch_index, chunk) in plan.chunks(max_batch_size).enumerate() {
        let Some(batch) = UpdateBatch::build(chunk) else {
            continue;
        };
        match service.submit_combined_mutation(batch.document()).await {
            Ok(response) => {
                outcome.results.extend(batch.resolve(&response));
            }
            Err(error) => {
                tracing::warn!(
                    batch = batch_index,
                    items = chunk.len(),
                    error = %error,
                    "combined mutation failed"
                );
                outcome
                    .results
                    .extend(batch.fail_all(&format!("transport error: {error}")));
                outcome.batch_failures.push(BatchFailure { batch_index, error });
            }
        }
    }
    outcome
}
