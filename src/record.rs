//! Records handed to job callbacks and the query arguments used to page them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single item fetched from a [`RecordSource`](crate::RecordSource).
///
/// Every source adapter ("term", "post", "user", ...) yields this shape: a
/// stable identifier used to address the per-record marker, plus whatever
/// payload the source chooses to expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier unique within the record type.
    pub id: String,
    /// Source-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl Record {
    /// Create a record with the given id and payload.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Look up a top-level field of the payload.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Arguments passed verbatim to a record source's paging query.
///
/// `number` is the page size and `offset` the base offset of the job. Every
/// other key is a source-specific filter and is flattened on (de)serialization,
/// so `{"number": 3, "taxonomy": "category"}` round-trips as expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    /// Page size. Absent or zero means "no limit".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,

    /// Position of the first record to return.
    #[serde(default)]
    pub offset: u64,

    /// Source-specific filters.
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl QueryArgs {
    /// Empty arguments: no limit, no offset, no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    #[must_use]
    pub fn number(mut self, number: u64) -> Self {
        self.number = Some(number);
        self
    }

    /// Set the base offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Add a source-specific filter.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Effective page size, `None` meaning "all remaining records".
    #[must_use]
    pub fn page_size(&self) -> Option<u64> {
        self.number.filter(|n| *n > 0)
    }

    /// Copy of these arguments with the offset replaced.
    #[must_use]
    pub fn with_offset(&self, offset: u64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_size_treats_zero_as_unlimited() {
        assert_eq!(QueryArgs::new().page_size(), None);
        assert_eq!(QueryArgs::new().number(0).page_size(), None);
        assert_eq!(QueryArgs::new().number(3).page_size(), Some(3));
    }

    #[test]
    fn with_offset_keeps_filters_and_number() {
        let args = QueryArgs::new()
            .number(3)
            .offset(5)
            .filter("taxonomy", "category");

        let moved = args.with_offset(8);
        assert_eq!(moved.offset, 8);
        assert_eq!(moved.number, Some(3));
        assert_eq!(moved.filters.get("taxonomy"), Some(&json!("category")));
        assert_eq!(args.offset, 5);
    }

    #[test]
    fn filters_are_flattened_in_json() {
        let args: QueryArgs = serde_json::from_value(json!({
            "number": 10,
            "taxonomy": "category",
            "hide_empty": false,
        }))
        .unwrap();

        assert_eq!(args.number, Some(10));
        assert_eq!(args.offset, 0);
        assert_eq!(args.filters.len(), 2);
        assert_eq!(args.filters.get("hide_empty"), Some(&json!(false)));
    }

    #[test]
    fn record_field_reads_payload() {
        let record = Record::new("7", json!({ "taxonomy": "post_tag" }));
        assert_eq!(record.field("taxonomy"), Some(&json!("post_tag")));
        assert_eq!(record.field("missing"), None);
    }
}
