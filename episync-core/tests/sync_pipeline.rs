//! End-to-end pipeline tests against in-memory collaborators.
//!
//! The fakes answer combined requests the same way the real service
//! does: by walking the submitted variables and keying sub-results under
//! the caller's aliases. That keeps alias assignment and resolution
//! honest without any network.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use episync_core::{
    CombinedResponse, GraphqlDocument, HistorySource, ListService, Result,
    SyncEngine, SyncError, WatchEvent,
};

struct FakeHistory {
    events: Vec<WatchEvent>,
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn fetch_history(&self) -> Result<Vec<WatchEvent>> {
        Ok(self.events.clone())
    }
}

struct FailingHistory;

#[async_trait]
impl HistorySource for FailingHistory {
    async fn fetch_history(&self) -> Result<Vec<WatchEvent>> {
        Err(SyncError::History("history backend offline".to_string()))
    }
}

/// Canned remote-side state for one series title.
#[derive(Clone)]
enum RemoteSeries {
    /// Title resolves; `progress` is the current tracked episode count,
    /// `None` meaning the viewer has no list entry yet.
    Match { id: i64, progress: Option<u32> },
    /// Title search finds nothing.
    NoMatch,
    /// Alias omitted from the response entirely (protocol anomaly).
    OmitAlias,
}

#[derive(Default)]
struct FakeListService {
    catalog: HashMap<String, RemoteSeries>,
    /// Media ids whose updates the remote rejects, with the message.
    failing_updates: HashMap<i64, String>,
    /// When set, every combined mutation fails at the request level.
    mutation_transport_error: bool,
    queries: Mutex<Vec<GraphqlDocument>>,
    mutations: Mutex<Vec<GraphqlDocument>>,
}

impl FakeListService {
    fn with_catalog(
        catalog: impl IntoIterator<Item = (&'static str, RemoteSeries)>,
    ) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Self::default()
        }
    }

    fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    /// Number of updates multiplexed into each recorded mutation.
    fn mutation_batch_sizes(&self) -> Vec<usize> {
        self.mutations
            .lock()
            .unwrap()
            .iter()
            .map(|doc| {
                doc.variables
                    .keys()
                    .filter(|key| key.starts_with("mediaId"))
                    .count()
            })
            .collect()
    }
}

#[async_trait]
impl ListService for FakeListService {
    async fn submit_combined_query(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse> {
        self.queries.lock().unwrap().push(document.clone());

        let mut data = Map::new();
        for index in 0.. {
            let Some(title) = document.variables.get(&format!("title{index}"))
            else {
                break;
            };
            let title = title.as_str().expect("title variables are strings");
            let alias = format!("s{index}");
            match self.catalog.get(title) {
                Some(RemoteSeries::Match { id, progress }) => {
                    let entry = (*progress)
                        .map(|p| json!({ "progress": p }))
                        .unwrap_or(Value::Null);
                    data.insert(
                        alias,
                        json!({
                            "id": id,
                            "title": { "romaji": title, "english": title },
                            "mediaListEntry": entry,
                        }),
                    );
                }
                Some(RemoteSeries::OmitAlias) => {}
                Some(RemoteSeries::NoMatch) | None => {
                    data.insert(alias, Value::Null);
                }
            }
        }
        Ok(CombinedResponse { data: Some(data), errors: Vec::new() })
    }

    async fn submit_combined_mutation(
        &self,
        document: &GraphqlDocument,
    ) -> Result<CombinedResponse> {
        self.mutations.lock().unwrap().push(document.clone());
        if self.mutation_transport_error {
            return Err(SyncError::Api("no response received".to_string()));
        }

        let mut data = Map::new();
        let mut errors = Vec::new();
        for index in 0.. {
            let Some(media_id) =
                document.variables.get(&format!("mediaId{index}"))
            else {
                break;
            };
            let media_id = media_id.as_i64().expect("media ids are integers");
            let progress = document
                .variables
                .get(&format!("progress{index}"))
                .and_then(Value::as_u64)
                .expect("progress variables are integers");
            let alias = format!("u{index}");
            if let Some(message) = self.failing_updates.get(&media_id) {
                data.insert(alias.clone(), Value::Null);
                errors.push(json!({ "message": message, "path": [alias] }));
            } else {
                data.insert(
                    alias,
                    json!({ "id": media_id, "progress": progress }),
                );
            }
        }

        let response = json!({ "data": data, "errors": errors });
        Ok(serde_json::from_value(response).expect("valid response shape"))
    }
}

fn event(series: &str, episode: u32, fraction: f32) -> WatchEvent {
    WatchEvent::new(series, episode, fraction)
}

#[tokio::test]
async fn updates_only_series_that_are_behind() {
    let history = FakeHistory {
        events: vec![
            event("Ahead", 8, 1.0),
            event("Ahead", 3, 0.95),
            event("Current", 2, 0.92),
            event("Unknown", 3, 1.0),
            event("Barely", 1, 0.4),
        ],
    };
    let service = FakeListService::with_catalog([
        ("Ahead", RemoteSeries::Match { id: 100, progress: Some(5) }),
        ("Current", RemoteSeries::Match { id: 200, progress: Some(2) }),
        ("Unknown", RemoteSeries::NoMatch),
    ]);

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert_eq!(report.no_completed_episode, vec!["Barely".to_string()]);
    assert_eq!(report.unmatched, vec!["Unknown".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].series_key, "Current");

    assert_eq!(report.planned.len(), 1);
    assert_eq!(report.planned[0].series_key, "Ahead");
    assert_eq!(report.planned[0].remote_media_id, 100);
    assert_eq!(report.planned[0].target_progress, 8);

    assert_eq!(report.updated_count(), 1);
    assert_eq!(report.failed_count(), 0);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn viewer_without_list_entry_counts_as_zero_progress() {
    let history =
        FakeHistory { events: vec![event("Fresh", 4, 1.0)] };
    let service = FakeListService::with_catalog([(
        "Fresh",
        RemoteSeries::Match { id: 300, progress: None },
    )]);

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert_eq!(report.planned.len(), 1);
    assert_eq!(report.planned[0].target_progress, 4);
    assert_eq!(report.updated_count(), 1);
}

#[tokio::test]
async fn one_rejected_update_leaves_siblings_untouched() {
    let history = FakeHistory {
        events: vec![
            event("Alpha", 5, 1.0),
            event("Beta", 6, 1.0),
            event("Gamma", 7, 1.0),
        ],
    };
    let mut service = FakeListService::with_catalog([
        ("Alpha", RemoteSeries::Match { id: 1, progress: Some(0) }),
        ("Beta", RemoteSeries::Match { id: 2, progress: Some(0) }),
        ("Gamma", RemoteSeries::Match { id: 3, progress: Some(0) }),
    ]);
    service
        .failing_updates
        .insert(2, "private list entry".to_string());

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    let by_series: BTreeMap<_, _> = report
        .results
        .iter()
        .map(|r| (r.series_key.as_str(), r))
        .collect();
    assert!(by_series["Alpha"].succeeded);
    assert!(!by_series["Beta"].succeeded);
    assert_eq!(
        by_series["Beta"].error_detail.as_deref(),
        Some("private list entry")
    );
    assert!(by_series["Gamma"].succeeded);
    assert!(report.batch_failures.is_empty());
    assert!(report.has_failures());
}

#[tokio::test]
async fn plans_are_split_into_bounded_sub_batches() {
    let titles = ["S1", "S2", "S3", "S4", "S5"];
    let history = FakeHistory {
        events: titles.iter().map(|t| event(t, 10, 1.0)).collect(),
    };
    let service = FakeListService::with_catalog(
        titles.iter().enumerate().map(|(i, t)| {
            (*t, RemoteSeries::Match { id: i as i64 + 1, progress: Some(0) })
        }),
    );

    let engine =
        SyncEngine::new(history, service).with_max_batch_size(2);
    let report = engine.run().await.unwrap();

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.updated_count(), 5);
    assert_eq!(engine.list_service().mutation_count(), 3);
    assert_eq!(engine.list_service().mutation_batch_sizes(), vec![2, 2, 1]);
}

#[tokio::test]
async fn mutation_transport_failure_fails_the_whole_sub_batch() {
    let history = FakeHistory {
        events: vec![event("Alpha", 5, 1.0), event("Beta", 6, 1.0)],
    };
    let mut service = FakeListService::with_catalog([
        ("Alpha", RemoteSeries::Match { id: 1, progress: Some(0) }),
        ("Beta", RemoteSeries::Match { id: 2, progress: Some(0) }),
    ]);
    service.mutation_transport_error = true;

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| !r.succeeded));
    assert!(
        report.results.iter().all(|r| r
            .error_detail
            .as_deref()
            .unwrap()
            .contains("no response received"))
    );
    assert_eq!(report.batch_failures.len(), 1);
    assert_eq!(report.batch_failures[0].batch_index, 0);
}

#[tokio::test]
async fn omitted_alias_is_reported_as_unmatched() {
    let history = FakeHistory {
        events: vec![event("Ghost", 2, 1.0), event("Solid", 3, 1.0)],
    };
    let service = FakeListService::with_catalog([
        ("Ghost", RemoteSeries::OmitAlias),
        ("Solid", RemoteSeries::Match { id: 9, progress: Some(3) }),
    ]);

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert_eq!(report.unmatched, vec!["Ghost".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.planned.is_empty());
}

#[tokio::test]
async fn empty_history_makes_no_remote_calls() {
    let history = FakeHistory { events: Vec::new() };
    let service = FakeListService::default();

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert!(report.planned.is_empty());
    assert!(report.results.is_empty());
    assert!(!report.has_failures());
    assert_eq!(engine.list_service().query_count(), 0);
    assert_eq!(engine.list_service().mutation_count(), 0);
}

#[tokio::test]
async fn tie_everywhere_submits_no_mutation() {
    let history = FakeHistory { events: vec![event("Even", 2, 1.0)] };
    let service = FakeListService::with_catalog([(
        "Even",
        RemoteSeries::Match { id: 4, progress: Some(2) },
    )]);

    let engine = SyncEngine::new(history, service);
    let report = engine.run().await.unwrap();

    assert!(report.planned.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(engine.list_service().query_count(), 1);
    assert_eq!(engine.list_service().mutation_count(), 0);
}

#[tokio::test]
async fn history_failure_aborts_the_run() {
    let engine = SyncEngine::new(FailingHistory, FakeListService::default());
    let error = engine.run().await.unwrap_err();
    assert!(matches!(error, SyncError::History(_)));
}
