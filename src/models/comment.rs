// src/models/comment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::{collection::Collection, repository::Record};

/// The kind of record a comment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentTarget {
    Task,
    Ticket,
}

impl CommentTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentTarget::Task => "task",
            CommentTarget::Ticket => "ticket",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub entity_type: CommentTarget,
    pub entity_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Comment {
    const COLLECTION: Collection = Collection::Comments;
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentPayload {
    #[validate(length(min = 1, max = 10000, message = "required"))]
    pub content: String,
}
