// src/db/repository.rs

use std::{marker::PhantomData, sync::Arc};

use chrono::Utc;
use serde::{de::DeserializeOwned, ser::Error as _, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{
    collection::Collection,
    store::{Document, DocumentStore, Filter, FindQuery, Patch, StoreError},
};
use crate::models::pagination::Paginated;

/// A typed document that lives in exactly one collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Serialization(serde_json::Error::custom(
            "record must serialize to a JSON object",
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Server-side `updatedAt` stamp, in the same format chrono's serde uses for records.
pub fn now_value() -> Value {
    serde_json::to_value(Utc::now()).unwrap_or(Value::Null)
}

/// One handle per collection, typed at the edges.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), _record: PhantomData }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, _record: PhantomData }
    }

    pub async fn find(&self, query: &FindQuery) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        let query = FindQuery::filter(filter).paginate(0, 1);
        Ok(self.find(&query).await?.into_iter().next())
    }

    /// Count + page in one call, for list endpoints.
    pub async fn find_page(&self, query: FindQuery, page: u64) -> Result<Paginated<T>, StoreError> {
        let total = self.store.count(T::COLLECTION, &query.filter).await?;
        let limit = query.limit.unwrap_or(total);
        let items = self.find(&query).await?;

        Ok(Paginated { items, total, page, limit })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.store.find_by_id(T::COLLECTION, id).await?.is_some())
    }

    pub async fn insert(&self, record: &T) -> Result<T, StoreError> {
        let doc = to_document(record)?;
        from_document(self.store.insert(T::COLLECTION, doc).await?)
    }

    /// Partial-field merge with a refreshed `updatedAt`.
    pub async fn update(&self, id: Uuid, fields: Map<String, Value>) -> Result<Option<T>, StoreError> {
        self.patch(id, Patch::default().merge(fields)).await
    }

    pub async fn patch(&self, id: Uuid, patch: Patch) -> Result<Option<T>, StoreError> {
        let patch = patch.set("updatedAt", now_value());
        self.store
            .update_by_id(T::COLLECTION, id, &patch)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        self.store.delete_by_id(T::COLLECTION, id).await
    }
}
