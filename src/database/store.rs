use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: a JSON object whose temporal values are already encoded as strings.
pub type Document = Map<String, Value>;

/// Every document carries its opaque identifier under this key.
pub const ID_FIELD: &str = "id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Write not acknowledged: {0}")]
    Unacknowledged(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    /// Half-open string range `[gte, lt)` on a top-level field.
    Range {
        field: String,
        gte: String,
        lt: String,
    },
}

impl Filter {
    pub fn by_id(id: &str) -> Self {
        Filter::Eq(ID_FIELD.to_string(), Value::String(id.to_string()))
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => document.get(field) == Some(expected),
            Filter::Range { field, gte, lt } => match document.get(field) {
                Some(Value::String(value)) => {
                    value.as_str() >= gte.as_str() && value.as_str() < lt.as_str()
                }
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Merge the given top-level fields into the document.
    Set(Document),
    Push { field: String, value: Value },
    /// Remove the element at `index`; only applies when that element exists.
    PullAt { field: String, index: usize },
    /// Overwrite the element at `index`; only applies when that element exists.
    ReplaceAt {
        field: String,
        index: usize,
        value: Value,
    },
}

impl Update {
    /// Applies the update in place. Returns false, leaving the document untouched,
    /// when a positional update targets a missing element.
    pub fn apply(&self, document: &mut Document) -> bool {
        match self {
            Update::Set(fields) => {
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
                true
            }
            Update::Push { field, value } => {
                let slot = document
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }

                match slot {
                    Value::Array(items) => {
                        items.push(value.clone());
                        true
                    }
                    _ => false,
                }
            }
            Update::PullAt { field, index } => match document.get_mut(field) {
                Some(Value::Array(items)) if *index < items.len() => {
                    items.remove(*index);
                    true
                }
                _ => false,
            },
            Update::ReplaceAt {
                field,
                index,
                value,
            } => match document.get_mut(field) {
                Some(Value::Array(items)) if *index < items.len() => {
                    items[*index] = value.clone();
                    true
                }
                _ => false,
            },
        }
    }
}

/// A named collection of schema-less documents addressed by filters.
///
/// `update_one` and `delete_one` act on the first matching document in insertion
/// order and report how many documents were changed (0 or 1). A positional update
/// whose index does not exist changes nothing and reports 0.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>>;

    async fn insert_one(&self, document: Document) -> StoreResult<()>;

    async fn update_one(&self, filter: &Filter, update: &Update) -> StoreResult<u64>;

    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64>;

    /// Release the underlying connection, if any.
    async fn close(&self) {}
}

pub(crate) fn document_id(document: &Document) -> StoreResult<&str> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("document has no string `{}`", ID_FIELD)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn range_filter_is_half_open() {
        let filter = Filter::Range {
            field: "date".to_string(),
            gte: "2024-12-01".to_string(),
            lt: "2025-01-01".to_string(),
        };

        assert!(filter.matches(&doc(json!({ "date": "2024-12-01" }))));
        assert!(filter.matches(&doc(json!({ "date": "2024-12-31" }))));
        assert!(!filter.matches(&doc(json!({ "date": "2025-01-01" }))));
        assert!(!filter.matches(&doc(json!({ "date": 20241201 }))));
        assert!(!filter.matches(&doc(json!({}))));
    }

    #[test]
    fn push_creates_missing_sequence() {
        let mut document = doc(json!({ "id": "a" }));
        let update = Update::Push {
            field: "incidents".to_string(),
            value: json!({ "type": "general" }),
        };

        assert!(update.apply(&mut document));
        assert_eq!(document["incidents"], json!([{ "type": "general" }]));
    }

    #[test]
    fn push_onto_null_sequence_starts_a_new_one() {
        let mut document = doc(json!({ "id": "a", "incidents": null }));
        let update = Update::Push {
            field: "incidents".to_string(),
            value: json!({ "type": "general" }),
        };

        assert!(update.apply(&mut document));
        assert_eq!(document["incidents"], json!([{ "type": "general" }]));

        let mut scalar = doc(json!({ "id": "b", "incidents": 3 }));
        assert!(!update.apply(&mut scalar));
        assert_eq!(scalar["incidents"], json!(3));
    }

    #[test]
    fn positional_updates_ignore_missing_index() {
        let mut document = doc(json!({ "incidents": [1, 2] }));

        let pull = Update::PullAt {
            field: "incidents".to_string(),
            index: 2,
        };
        assert!(!pull.apply(&mut document));

        let replace = Update::ReplaceAt {
            field: "incidents".to_string(),
            index: 1,
            value: json!(5),
        };
        assert!(replace.apply(&mut document));

        let pull = Update::PullAt {
            field: "incidents".to_string(),
            index: 0,
        };
        assert!(pull.apply(&mut document));
        assert_eq!(document["incidents"], json!([5]));
    }

    #[test]
    fn document_id_requires_string() {
        assert_eq!(document_id(&doc(json!({ "id": "abc" }))).ok(), Some("abc"));
        assert!(document_id(&doc(json!({ "id": 7 }))).is_err());
    }
}
