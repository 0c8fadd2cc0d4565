// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::{collection::Collection, repository::Record};
use crate::models::auth::User;

/// Immutable compliance record. Append-only: nothing in the portal updates or deletes it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    #[schema(example = "DELETE_CUSTOMER")]
    pub action: String,
    #[schema(example = "customer")]
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: String,
    pub user_email: String,
    #[schema(value_type = Object)]
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
}

impl Record for AuditLogEntry {
    const COLLECTION: Collection = Collection::AuditLogs;
}

/// Who performed an audited action, and from where.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub ip_address: String,
}

impl Actor {
    pub fn from_user(user: &User, ip_address: impl Into<String>) -> Self {
        Self { user_id: user.id, email: user.email.clone(), ip_address: ip_address.into() }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditLogFilterParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
    pub action: Option<String>,
}
