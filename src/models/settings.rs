// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::{collection::Collection, repository::Record};

/// The portal keeps a single settings document under a fixed id.
pub const SETTINGS_ID: Uuid = Uuid::nil();

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[schema(ignore)]
    pub id: Uuid,

    #[schema(example = "Servecta GmbH")]
    pub company_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "support@servecta.de")]
    pub support_email: Option<String>,

    #[schema(example = "de")]
    pub default_locale: String,

    pub deadline_notifications_enabled: bool,

    /// How far ahead of a due date the deadline notice goes out
    #[schema(example = 24)]
    pub deadline_lead_hours: u32,

    pub updated_at: DateTime<Utc>,
}

impl Record for SystemSettings {
    const COLLECTION: Collection = Collection::Settings;
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            id: SETTINGS_ID,
            company_name: "Servecta".to_string(),
            support_email: None,
            default_locale: "de".to_string(),
            deadline_notifications_enabled: true,
            deadline_lead_hours: 24,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "invalid_email"))]
    pub support_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 2, message = "invalid_locale"))]
    pub default_locale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_notifications_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 168, message = "out_of_range"))]
    pub deadline_lead_hours: Option<u32>,
}
