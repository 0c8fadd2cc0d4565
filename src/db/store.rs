// src/db/store.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::collection::Collection;

/// A schema-less record as it lives in a collection. Always carries an `id`.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document in '{0}' has no valid id")]
    MissingId(Collection),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// =========================================================================
//  FILTERS
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field == value` (JSON equality).
    Eq(String, Value),
    /// String field is one of the given values.
    In(String, Vec<String>),
    /// Field present and not null.
    Exists(String),
    /// Field absent or null.
    Missing(String),
    /// Case-insensitive substring match on any of the fields.
    Search(Vec<String>, String),
    /// Lexicographic range on a string field (ISO dates compare correctly).
    Range {
        field: String,
        gte: Option<String>,
        lte: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    /// Foreign keys are stored as the string form of the UUID everywhere.
    pub fn eq_id(self, field: &str, id: Uuid) -> Self {
        self.eq(field, id.to_string())
    }

    pub fn any_of(mut self, field: &str, values: Vec<String>) -> Self {
        self.conditions.push(Condition::In(field.to_string(), values));
        self
    }

    pub fn exists(mut self, field: &str) -> Self {
        self.conditions.push(Condition::Exists(field.to_string()));
        self
    }

    pub fn missing(mut self, field: &str) -> Self {
        self.conditions.push(Condition::Missing(field.to_string()));
        self
    }

    pub fn search(mut self, fields: &[&str], term: &str) -> Self {
        let term = term.trim();
        if !term.is_empty() {
            self.conditions.push(Condition::Search(
                fields.iter().map(|f| f.to_string()).collect(),
                term.to_string(),
            ));
        }
        self
    }

    pub fn range(mut self, field: &str, gte: Option<String>, lte: Option<String>) -> Self {
        self.conditions.push(Condition::Range { field: field.to_string(), gte, lte });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the filter against a document in memory.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| condition_matches(c, doc))
    }
}

fn present(doc: &Document, field: &str) -> bool {
    doc.get(field).is_some_and(|v| !v.is_null())
}

fn condition_matches(condition: &Condition, doc: &Document) -> bool {
    match condition {
        Condition::Eq(field, value) => doc.get(field) == Some(value),
        Condition::In(field, values) => doc
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| values.iter().any(|v| v == s)),
        Condition::Exists(field) => present(doc, field),
        Condition::Missing(field) => !present(doc, field),
        Condition::Search(fields, term) => {
            let needle = term.to_lowercase();
            fields.iter().any(|f| {
                doc.get(f)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
        }
        Condition::Range { field, gte, lte } => match doc.get(field).and_then(Value::as_str) {
            Some(s) => {
                gte.as_deref().is_none_or(|lower| s >= lower)
                    && lte.as_deref().is_none_or(|upper| s <= upper)
            }
            None => false,
        },
    }
}

// =========================================================================
//  QUERIES & PATCHES
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn filter(filter: Filter) -> Self {
        Self { filter, ..Self::default() }
    }

    pub fn sorted(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some(Sort { field: field.to_string(), order });
        self
    }

    pub fn paginate(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Partial update: fields to merge in and fields to remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Map<String, Value>,
    pub unset: Vec<String>,
}

impl Patch {
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    pub fn merge(mut self, fields: Map<String, Value>) -> Self {
        self.set.extend(fields);
        self
    }

    /// Applies the patch to an in-memory document.
    pub fn apply(&self, doc: &mut Document) {
        for field in &self.unset {
            doc.remove(field);
        }
        for (k, v) in &self.set {
            doc.insert(k.clone(), v.clone());
        }
    }
}

// =========================================================================
//  THE STORE
// =========================================================================

/// CRUD over named collections. The only seam between the portal and its database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Inserts a document that already carries its `id`.
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError>;

    /// Applies the patch to one document and returns it, or `None` if it does not exist.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Patch,
    ) -> Result<Option<Document>, StoreError>;

    /// Applies the patch to every matching document. Returns the number touched.
    async fn update_many(&self, collection: Collection, filter: &Filter, patch: &Patch) -> Result<u64, StoreError>;

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;
}

/// Reads the `id` field of a document.
pub fn document_id(doc: &Document) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_and_in_match_string_foreign_keys() {
        let id = Uuid::new_v4();
        let d = doc(json!({ "id": Uuid::new_v4().to_string(), "customerId": id.to_string() }));

        assert!(Filter::new().eq_id("customerId", id).matches(&d));
        assert!(!Filter::new().eq_id("customerId", Uuid::new_v4()).matches(&d));
        assert!(Filter::new().any_of("customerId", vec!["x".into(), id.to_string()]).matches(&d));
    }

    #[test]
    fn null_counts_as_missing() {
        let d = doc(json!({ "assigneeId": null, "title": "a" }));
        assert!(Filter::new().missing("assigneeId").matches(&d));
        assert!(!Filter::new().exists("assigneeId").matches(&d));
        assert!(Filter::new().exists("title").matches(&d));
    }

    #[test]
    fn search_is_case_insensitive_and_blank_terms_are_ignored() {
        let d = doc(json!({ "legalName": "Müller GmbH", "taxId": "DE123" }));
        assert!(Filter::new().search(&["legalName", "taxId"], "müller").matches(&d));
        assert!(Filter::new().search(&["legalName"], "   ").is_empty());
        assert!(!Filter::new().search(&["taxId"], "AT").matches(&d));
    }

    #[test]
    fn range_compares_iso_strings() {
        let d = doc(json!({ "dueDate": "2026-03-10T12:00:00Z" }));
        let hit = Filter::new().range(
            "dueDate",
            Some("2026-03-10T00:00:00Z".into()),
            Some("2026-03-11T00:00:00Z".into()),
        );
        let miss = Filter::new().range("dueDate", Some("2026-03-11T00:00:00Z".into()), None);
        assert!(hit.matches(&d));
        assert!(!miss.matches(&d));
    }

    #[test]
    fn patch_unsets_before_setting() {
        let mut d = doc(json!({ "assigneeId": "u1", "title": "old" }));
        Patch::default().unset("assigneeId").set("title", "new").apply(&mut d);
        assert_eq!(d.get("assigneeId"), None);
        assert_eq!(d.get("title"), Some(&json!("new")));
    }
}
