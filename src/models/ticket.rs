// src/models/ticket.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::nullable;
use crate::db::{collection::Collection, repository::Record};
use crate::models::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Waiting,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Ticket {
    const COLLECTION: Collection = Collection::Tickets;
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Heizung fällt nachts aus")]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "required"))]
    pub description: String,
    pub priority: Option<Priority>,
    /// Ignored for consumers: their own customer is always used.
    pub customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 10000, message = "required"))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable::deserialize", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Uuid>)]
    pub assignee_id: Option<Option<Uuid>>,
}

/// What changed on a ticket, for the change notice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub changed_by: String,
    pub changes: Vec<String>,
}

impl ChangeSummary {
    pub fn between(before: &Ticket, after: &Ticket, changed_by: &str) -> Self {
        let mut changes = Vec::new();
        if before.status != after.status {
            changes.push(format!("Status: {:?} → {:?}", before.status, after.status));
        }
        if before.priority != after.priority {
            changes.push(format!("Priorität: {:?} → {:?}", before.priority, after.priority));
        }
        if before.assignee_id != after.assignee_id {
            changes.push("Zuständigkeit geändert".to_string());
        }
        if before.title != after.title {
            changes.push(format!("Titel: {}", after.title));
        }
        if before.description != after.description {
            changes.push("Beschreibung aktualisiert".to_string());
        }
        Self { changed_by: changed_by.to_string(), changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
