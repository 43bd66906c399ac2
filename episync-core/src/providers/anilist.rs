use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::graphql::{CombinedResponse, GraphqlDocument};
use crate::traits::ListService;

const ANILIST_GRAPHQL_URL: &str = "https://graphql.anilist.co/";

const RATE_LIMIT_ATTEMPTS: u32 = 3;
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(300);

/// GraphQL executor for the list-tracking service.
///
/// Queries and mutations go to the same endpoint; the aliasing contract
/// lives in the documents the batchers build, so this client only moves
/// envelopes. Rate-limit responses are retried a bounded number of
/// times; per-alias errors inside a 2xx response are passed through
/// untouched for the batchers to correlate.
#[derive(Debug)]
pub struct AnilistClient {
    client: reqwest::Client,
    access_token: String,
}

impl AnilistClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
        }
    }

    async fn submit(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse> {
        for attempt in 1..=RATE_LIMIT_ATTEMPTS {
            let response = self
                .client
                .post(ANILIST_GRAPHQL_URL)
                .bearer_auth(&self.access_token)
                .json(document)
                .send()
                .await?;

            if response.status() == 401 {
                return Err(SyncError::InvalidToken);
            }
            if response.status() == 429 {
                tracing::warn!(
                    attempt,
                    delay_secs = RATE_LIMIT_DELAY.as_secs(),
                    "list API rate limited, backing off"
                );
                tokio::time::sleep(RATE_LIMIT_DELAY).await;
                continue;
            }
            if !response.status().is_success() {
                return Err(SyncError::Api(format!(
                    "list API returned status {}",
                    response.status()
                )));
            }

            return Ok(response.json::<CombinedResponse>().await?);
        }
        Err(SyncError::RateLimited)
    }
}

#[async_trait]
impl ListService for AnilistClient {
    async fn submit_combined_query(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse> {
        self.submit(document).await
    }

    async fn submit_combined_mutation(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse> {
        self.submit(document).await
    }
}
