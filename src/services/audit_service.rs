// src/services/audit_service.rs

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::{
        repository::Repository,
        store::{Filter, FindQuery, StoreError},
    },
    models::{
        audit::{Actor, AuditLogEntry, AuditLogFilterParams},
        pagination::{ListParams, Paginated},
    },
};

#[derive(Clone)]
pub struct AuditService {
    repo: Repository<AuditLogEntry>,
}

impl AuditService {
    pub fn new(repo: Repository<AuditLogEntry>) -> Self {
        Self { repo }
    }

    /// Appends one entry. Callers that must not proceed without a trail propagate the error.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: Value,
    ) -> Result<AuditLogEntry, StoreError> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            user_id: actor.user_id.to_string(),
            user_email: actor.email.clone(),
            details,
            timestamp: Utc::now(),
            ip_address: actor.ip_address.clone(),
        };

        self.repo.insert(&entry).await
    }

    /// For create/update trails: a failed audit write is logged, the mutation stands.
    pub async fn record_best_effort(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        details: Value,
    ) {
        if let Err(e) = self
            .record(actor, action, entity_type, &entity_id.to_string(), details)
            .await
        {
            tracing::warn!("audit entry {} for {} {} not written: {}", action, entity_type, entity_id, e);
        }
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filters: &AuditLogFilterParams,
    ) -> Result<Paginated<AuditLogEntry>, StoreError> {
        let mut filter = Filter::new();
        if let Some(entity_type) = &filters.entity_type {
            filter = filter.eq("entityType", entity_type.clone());
        }
        if let Some(entity_id) = &filters.entity_id {
            filter = filter.eq("entityId", entity_id.clone());
        }
        if let Some(user_id) = &filters.user_id {
            filter = filter.eq("userId", user_id.clone());
        }
        if let Some(action) = &filters.action {
            filter = filter.eq("action", action.clone());
        }
        if let Some(term) = &params.search {
            filter = filter.search(&["userEmail", "action", "entityId"], term);
        }

        let query = FindQuery::filter(filter)
            .sorted("timestamp", params.order())
            .paginate(params.skip(), params.limit());

        self.repo.find_page(query, params.page()).await
    }
}
