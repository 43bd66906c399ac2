use async_trait::async_trait;

use crate::error::Result;
use crate::graphql::{CombinedResponse, GraphqlDocument};
use crate::history::WatchEvent;

/// Source of raw watch events.
///
/// Implementations may fetch fresh data or serve a local cache; the
/// engine works identically either way.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(&self) -> Result<Vec<WatchEvent>>;
}

/// Remote catalog/list collaborator speaking the combined-request
/// aliasing contract.
///
/// Both operations encode N independent sub-operations keyed by
/// caller-assigned aliases and return a response whose top-level fields
/// are those same aliases.
#[async_trait]
pub trait ListService: Send + Sync {
    /// Submit a combined read query.
    async fn submit_combined_query(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse>;

    /// Submit a combined write mutation.
    async fn submit_combined_mutation(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse>;
}
