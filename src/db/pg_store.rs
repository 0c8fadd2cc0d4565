// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    collection::Collection,
    store::{document_id, Condition, Document, DocumentStore, Filter, FindQuery, Patch, SortOrder, StoreError},
};

/// `DocumentStore` over Postgres: one `(id UUID, data JSONB)` table per collection.
/// Field names always travel as bind parameters (`data -> $n`), never as SQL text.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    if filter.is_empty() {
        return;
    }
    qb.push(" WHERE ");

    for (i, condition) in filter.conditions.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        match condition {
            // String equality goes through `->>` so the expression indexes apply.
            Condition::Eq(field, Value::String(s)) => {
                qb.push("data ->> ");
                qb.push_bind(field.clone());
                qb.push(" = ");
                qb.push_bind(s.clone());
            }
            Condition::Eq(field, value) => {
                qb.push("data -> ");
                qb.push_bind(field.clone());
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
            }
            Condition::In(field, values) => {
                qb.push("data ->> ");
                qb.push_bind(field.clone());
                qb.push(" = ANY(");
                qb.push_bind(values.clone());
                qb.push(")");
            }
            Condition::Exists(field) => {
                qb.push("COALESCE(jsonb_typeof(data -> ");
                qb.push_bind(field.clone());
                qb.push("), 'null') <> 'null'");
            }
            Condition::Missing(field) => {
                qb.push("COALESCE(jsonb_typeof(data -> ");
                qb.push_bind(field.clone());
                qb.push("), 'null') = 'null'");
            }
            Condition::Search(fields, term) => {
                let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
                qb.push("(");
                for (j, field) in fields.iter().enumerate() {
                    if j > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("data ->> ");
                    qb.push_bind(field.clone());
                    qb.push(" ILIKE ");
                    qb.push_bind(pattern.clone());
                }
                qb.push(")");
            }
            Condition::Range { field, gte, lte } => {
                qb.push("data ->> ");
                qb.push_bind(field.clone());
                qb.push(" IS NOT NULL");
                if let Some(lower) = gte {
                    qb.push(" AND data ->> ");
                    qb.push_bind(field.clone());
                    qb.push(" >= ");
                    qb.push_bind(lower.clone());
                }
                if let Some(upper) = lte {
                    qb.push(" AND data ->> ");
                    qb.push_bind(field.clone());
                    qb.push(" <= ");
                    qb.push_bind(upper.clone());
                }
            }
        }
    }
}

pub(crate) fn select_query(collection: Collection, query: &FindQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT data FROM {}", collection.table()));
    push_where(&mut qb, &query.filter);

    if let Some(sort) = &query.sort {
        qb.push(" ORDER BY data ->> ");
        qb.push_bind(sort.field.clone());
        qb.push(match sort.order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        });
        qb.push(", id ASC");
    }
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if query.skip > 0 {
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));
    }
    qb
}

pub(crate) fn update_query(collection: Collection, filter: &Filter, patch: &Patch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET data = (data - ", collection.table()));
    qb.push_bind(patch.unset.clone());
    qb.push("::text[]) || ");
    qb.push_bind(Json(patch.set.clone()));
    push_where(&mut qb, filter);
    qb
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let rows = select_query(collection, query)
            .build_query_scalar::<Json<Document>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", collection.table());
        let row = sqlx::query_scalar::<_, Json<Document>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", collection.table()));
        push_where(&mut qb, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError> {
        let id = document_id(&doc).ok_or(StoreError::MissingId(collection))?;
        let sql = format!("INSERT INTO {} (id, data) VALUES ($1, $2) RETURNING data", collection.table());

        let Json(stored) = sqlx::query_scalar::<_, Json<Document>>(&sql)
            .bind(id)
            .bind(Json(doc))
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Patch,
    ) -> Result<Option<Document>, StoreError> {
        let mut qb = update_query(collection, &Filter::new(), patch);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING data");

        let row = qb
            .build_query_scalar::<Json<Document>>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn update_many(&self, collection: Collection, filter: &Filter, patch: &Patch) -> Result<u64, StoreError> {
        let result = update_query(collection, filter, patch).build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", collection.table()));
        push_where(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn select_binds_field_names_instead_of_inlining_them() {
        let query = FindQuery::filter(
            Filter::new()
                .eq_id("customerId", Uuid::new_v4())
                .search(&["legalName"], "acme"),
        )
        .sorted("createdAt", SortOrder::Desc)
        .paginate(40, 20);

        let qb = select_query(Collection::Customers, &query);
        assert_eq!(
            qb.sql(),
            "SELECT data FROM customers WHERE data ->> $1 = $2 AND (data ->> $3 ILIKE $4) \
             ORDER BY data ->> $5 DESC, id ASC LIMIT $6 OFFSET $7"
        );
    }

    #[test]
    fn non_string_equality_compares_jsonb() {
        let qb = select_query(Collection::Notifications, &FindQuery::filter(Filter::new().eq("read", false)));
        assert_eq!(qb.sql(), "SELECT data FROM notifications WHERE data -> $1 = $2");
    }

    #[test]
    fn audit_logs_use_snake_case_table() {
        let qb = select_query(Collection::AuditLogs, &FindQuery::default());
        assert_eq!(qb.sql(), "SELECT data FROM audit_logs");
    }

    #[test]
    fn detach_update_removes_keys_and_merges_in_one_statement() {
        let patch = Patch::default().unset("assigneeId").set("updatedAt", "2026-01-01T00:00:00Z");
        let qb = update_query(Collection::Tasks, &Filter::new().eq("assigneeId", "u"), &patch);
        assert_eq!(
            qb.sql(),
            "UPDATE tasks SET data = (data - $1::text[]) || $2 WHERE data ->> $3 = $4"
        );
    }
}
