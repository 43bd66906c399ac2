//! Combined GraphQL request/response envelopes.
//!
//! The remote list service has no native batch endpoint, so independent
//! operations are multiplexed into one request body under caller-assigned
//! aliases. These types model the `{query, variables}` request and the
//! `{data, errors}` response; the batchers in [`crate::lookup`] and
//! [`crate::update`] own alias assignment and resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One combined GraphQL request: a query or mutation document plus its
/// variable bindings.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlDocument {
    pub query: String,
    pub variables: Map<String, Value>,
}

/// One entry of a GraphQL `errors` array.
///
/// Path elements can be field names or list indices; only the leading
/// field name matters for correlating an error back to its alias.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<Value>,
}

impl GraphqlError {
    /// Whether this error is rooted at the given top-level alias.
    pub fn is_for_alias(&self, alias: &str) -> bool {
        self.path.first().and_then(Value::as_str) == Some(alias)
    }
}

/// A combined response: top-level `data` fields keyed by the aliases the
/// caller assigned, plus any per-alias errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombinedResponse {
    /// `null` when the whole request was rejected before execution.
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl CombinedResponse {
    /// Look up the sub-result stored under an alias. `None` means the
    /// alias is missing from the response entirely.
    pub fn field(&self, alias: &str) -> Option<&Value> {
        self.data.as_ref()?.get(alias)
    }

    /// First error correlated to the given alias, if any.
    pub fn error_for(&self, alias: &str) -> Option<&GraphqlError> {
        self.errors.iter().find(|e| e.is_for_alias(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_correlates_by_leading_path_element() {
        let error: GraphqlError = serde_json::from_value(serde_json::json!({
            "message": "boom",
            "path": ["u1", "progress"]
        }))
        .unwrap();
        assert!(error.is_for_alias("u1"));
        assert!(!error.is_for_alias("u0"));
    }

    #[test]
    fn integer_path_elements_do_not_match_aliases() {
        let error: GraphqlError = serde_json::from_value(serde_json::json!({
            "message": "boom",
            "path": [0, "u1"]
        }))
        .unwrap();
        assert!(!error.is_for_alias("u1"));
    }

    #[test]
    fn null_data_deserializes() {
        let response: CombinedResponse = serde_json::from_value(serde_json::json!({
            "data": null,
            "errors": [{"message": "rejected"}]
        }))
        .unwrap();
        assert!(response.field("s0").is_none());
        assert_eq!(response.errors.len(), 1);
    }

    #[test]
    fn field_distinguishes_null_from_missing() {
        let response: CombinedResponse = serde_json::from_value(serde_json::json!({
            "data": {"s0": null}
        }))
        .unwrap();
        assert!(matches!(response.field("s0"), Some(Value::Null)));
        assert!(response.field("s1").is_none());
    }
}
