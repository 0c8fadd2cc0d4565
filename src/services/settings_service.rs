// src/services/settings_service.rs

use serde_json::json;

use crate::{
    common::error::AppError,
    db::repository::{to_document, Repository},
    models::{
        audit::Actor,
        settings::{SystemSettings, UpdateSettingsRequest, SETTINGS_ID},
    },
    services::audit_service::AuditService,
};

#[derive(Clone)]
pub struct SettingsService {
    repo: Repository<SystemSettings>,
    audit: AuditService,
}

impl SettingsService {
    pub fn new(repo: Repository<SystemSettings>, audit: AuditService) -> Self {
        Self { repo, audit }
    }

    /// Stored settings, or the defaults when nothing was saved yet.
    pub async fn get(&self) -> Result<SystemSettings, AppError> {
        Ok(self.repo.get(SETTINGS_ID).await?.unwrap_or_default())
    }

    pub async fn update(&self, payload: UpdateSettingsRequest, actor: &Actor) -> Result<SystemSettings, AppError> {
        if self.repo.get(SETTINGS_ID).await?.is_none() {
            self.repo.insert(&SystemSettings::default()).await?;
        }

        let changes = to_document(&payload)?;
        let settings = self
            .repo
            .update(SETTINGS_ID, changes.clone())
            .await?
            .ok_or_else(|| anyhow::anyhow!("settings document vanished during update"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_SETTINGS", "settings", SETTINGS_ID, json!({ "changes": changes }))
            .await;
        Ok(settings)
    }
}
