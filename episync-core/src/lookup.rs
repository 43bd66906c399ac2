//! Remote lookup batcher.
//!
//! Resolves a set of series keys against the remote catalog with one
//! combined query. Each series gets a deterministic alias (`s0`, `s1`,
//! ...) derived from its index; the alias-to-key mapping is kept on the
//! batch and used to resolve the response, never reconstructed from
//! response field order.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::graphql::{CombinedResponse, GraphqlDocument};

/// Remote identity and tracked progress for one matched series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMediaMatch {
    /// Tracking-service catalog id of the first/best title match.
    pub remote_media_id: i64,
    /// Episode count currently tracked remotely; 0 when the viewer has no
    /// list entry for the title yet.
    pub remote_progress: u32,
}

/// One combined lookup query over a batch of series keys.
#[derive(Debug, Clone)]
pub struct LookupBatch {
    document: GraphqlDocument,
    /// Index i corresponds to alias `s{i}`.
    series_keys: Vec<String>,
}

fn alias(index: usize) -> String {
    format!("s{index}")
}

impl LookupBatch {
    /// Build one combined query for the given series keys. Returns `None`
    /// for an empty batch.
    pub fn build<I, S>(series_keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let series_keys: Vec<String> =
            series_keys.into_iter().map(Into::into).collect();
        if series_keys.is_empty() {
            return None;
        }

        let mut declarations = Vec::with_capacity(series_keys.len());
        let mut body = String::new();
        let mut variables = Map::new();
        for (i, key) in series_keys.iter().enumerate() {
            let var = format!("title{i}");
            declarations.push(format!("${var}: String!"));
            body.push_str(&format!(
                "{alias}: Media(search: ${var}, type: ANIME) {{ id title {{ romaji english }} mediaListEntry {{ progress }} }}\n",
                alias = alias(i),
            ));
            variables.insert(var, Value::String(key.clone()));
        }

        let query =
            format!("query ({}) {{\n{}}}", declarations.join(", "), body);
        Some(Self {
            document: GraphqlDocument { query, variables },
            series_keys,
        })
    }

    /// The combined request to submit.
    pub fn document(&self) -> &GraphqlDocument {
        &self.document
    }

    /// Number of series in the batch.
    pub fn len(&self) -> usize {
        self.series_keys.len()
    }

    /// Whether the batch is empty. Never true for a built batch.
    pub fn is_empty(&self) -> bool {
        self.series_keys.is_empty()
    }

    /// Resolve a combined response back into per-series remote state.
    ///
    /// A sub-query with no match yields `None` for that key only. A
    /// malformed or missing alias is a protocol anomaly: logged at warn
    /// and treated as absent, never fatal to the batch.
    pub fn resolve(
        &self,
        response: &CombinedResponse,
    ) -> BTreeMap<String, Option<RemoteMediaMatch>> {
        let mut matches = BTreeMap::new();
        for (i, key) in self.series_keys.iter().enumerate() {
            let alias = alias(i);
            let resolved = match response.field(&alias) {
                None => {
                    tracing::warn!(
                        series = key.as_str(),
                        alias = alias.as_str(),
                        "lookup response is missing an alias"
                    );
                    None
                }
                Some(Value::Null) => None,
                Some(value) => match serde_json::from_value::<MediaPayload>(
                    value.clone(),
                ) {
                    Ok(media) => Some(RemoteMediaMatch {
                        remote_media_id: media.id,
                        remote_progress: media
                            .media_list_entry
                            .map(|entry| entry.progress)
                            .unwrap_or(0),
                    }),
                    Err(err) => {
                        tracing::warn!(
                            series = key.as_str(),
                            alias = alias.as_str(),
                            error = %err,
                            "malformed lookup sub-result"
                        );
                        None
                    }
                },
            };
            matches.insert(key.clone(), resolved);
        }
        matches
    }
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    id: i64,
    #[serde(rename = "mediaListEntry")]
    media_list_entry: Option<ListEntryPayload>,
}

#[derive(Debug, Deserialize)]
struct ListEntryPayload {
    #[serde(default)]
    progress: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> CombinedResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_batch_is_not_built() {
        assert!(LookupBatch::build(Vec::<String>::new()).is_none());
    }

    #[test]
    fn aliases_are_deterministic_and_distinct() {
        let batch =
            LookupBatch::build(["Frieren", "Dandadan", "Mushoku"]).unwrap();
        let query = &batch.document().query;
        assert!(query.contains("s0: Media(search: $title0, type: ANIME)"));
        assert!(query.contains("s1: Media(search: $title1, type: ANIME)"));
        assert!(query.contains("s2: Media(search: $title2, type: ANIME)"));
        assert!(query.starts_with(
            "query ($title0: String!, $title1: String!, $title2: String!)"
        ));
        assert_eq!(
            batch.document().variables.get("title1"),
            Some(&json!("Dandadan"))
        );
    }

    #[test]
    fn resolves_each_key_under_its_own_alias() {
        let batch = LookupBatch::build(["A", "B"]).unwrap();
        let matches = batch.resolve(&response(json!({
            "data": {
                "s0": {"id": 101, "mediaListEntry": {"progress": 4}},
                "s1": {"id": 202, "mediaListEntry": null},
            }
        })));
        assert_eq!(
            matches["A"],
            Some(RemoteMediaMatch { remote_media_id: 101, remote_progress: 4 })
        );
        // No list entry yet means zero tracked progress, not absence.
        assert_eq!(
            matches["B"],
            Some(RemoteMediaMatch { remote_media_id: 202, remote_progress: 0 })
        );
    }

    #[test]
    fn null_sub_result_means_no_match() {
        let batch = LookupBatch::build(["A"]).unwrap();
        let matches =
            batch.resolve(&response(json!({"data": {"s0": null}})));
        assert_eq!(matches["A"], None);
    }

    #[test]
    fn missing_alias_is_absent_not_fatal() {
        let batch = LookupBatch::build(["A", "B"]).unwrap();
        let matches = batch.resolve(&response(json!({
            "data": {"s0": {"id": 7, "mediaListEntry": {"progress": 1}}}
        })));
        assert_eq!(matches["A"].as_ref().unwrap().remote_media_id, 7);
        assert_eq!(matches["B"], None);
    }

    #[test]
    fn malformed_sub_result_is_absent_not_fatal() {
        let batch = LookupBatch::build(["A"]).unwrap();
        let matches = batch
            .resolve(&response(json!({"data": {"s0": {"unexpected": true}}})));
        assert_eq!(matches["A"], None);
    }
}
