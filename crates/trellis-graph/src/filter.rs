//! Structural query filters and temporal axes.
//!
//! Filters are forwarded to the Graph API verbatim, with one exception:
//! cosine-distance leaves may carry a natural-language string which must be
//! replaced by an embedding vector before the query leaves the process
//! (see `trellis_core::ontology::rewrite_semantic_filter`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One side of a filter comparison: either a path into the queried record
/// or a literal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterExpression {
    Path(Vec<Value>),
    Parameter(Value),
}

impl FilterExpression {
    pub fn path(segments: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::Path(segments.into_iter().map(Into::into).collect())
    }

    pub fn parameter(value: impl Into<Value>) -> Self {
        Self::Parameter(value.into())
    }
}

/// A structural query filter. The Graph API owns evaluation; this type only
/// needs to compose and traverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    All(Vec<Filter>),
    Any(Vec<Filter>),
    Not(Box<Filter>),
    /// `[path, parameter]` equality.
    Equal(Vec<FilterExpression>),
    /// `[path, embedding-or-text parameter, max-distance parameter]`.
    CosineDistance(Vec<FilterExpression>),
}

impl Filter {
    /// Equality between a record path and a literal value.
    pub fn equal(
        path: impl IntoIterator<Item = impl Into<Value>>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Equal(vec![
            FilterExpression::path(path),
            FilterExpression::parameter(value),
        ])
    }

    /// Filter ontology records on their versioned URL.
    pub fn for_versioned_url(url: &crate::types::VersionedUrl) -> Self {
        Self::equal(["versionedUrl"], url.as_str())
    }
}

/// Temporal axes pinning a structural query to a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemporalAxes {
    pub pinned: PinnedTemporalAxis,
    pub variable: VariableTemporalAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedTemporalAxis {
    pub axis: String,
    /// `None` pins to the latest revision.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableTemporalAxis {
    pub axis: String,
    pub interval: TemporalInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalInterval {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl QueryTemporalAxes {
    /// Resolve the query against the current instant on the decision-time
    /// axis, pinned to the latest transaction time.
    pub fn current_time_instant() -> Self {
        Self {
            pinned: PinnedTemporalAxis {
                axis: "transactionTime".to_string(),
                timestamp: None,
            },
            variable: VariableTemporalAxis {
                axis: "decisionTime".to_string(),
                interval: TemporalInterval {
                    start: None,
                    end: None,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_filter_serializes_to_wire_shape() {
        let filter = Filter::equal(["versionedUrl"], "https://example.com/t/v/1");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "equal": [
                    { "path": ["versionedUrl"] },
                    { "parameter": "https://example.com/t/v/1" }
                ]
            })
        );
    }

    #[test]
    fn wire_shape_deserializes_back_into_the_filter() {
        let json = serde_json::json!({
            "equal": [
                { "path": ["versionedUrl"] },
                { "parameter": "https://example.com/t/v/1" }
            ]
        });
        let filter: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(filter, Filter::equal(["versionedUrl"], "https://example.com/t/v/1"));
    }

    #[test]
    fn current_instant_axes_have_unbounded_interval() {
        let axes = QueryTemporalAxes::current_time_instant();
        let json = serde_json::to_value(&axes).unwrap();
        assert_eq!(json["pinned"]["axis"], "transactionTime");
        assert_eq!(json["pinned"]["timestamp"], Value::Null);
        assert_eq!(json["variable"]["interval"]["start"], Value::Null);
        assert_eq!(json["variable"]["interval"]["end"], Value::Null);
    }
}
