// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        client_ip::ClientIp,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole, StaffOnly},
    },
    models::{
        audit::Actor,
        settings::{SystemSettings, UpdateSettingsRequest},
    },
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses((status = 200, description = "Portal settings", body = SystemSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_service
        .get()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = SystemSettings),
        (status = 403, description = "Admin only")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(admin, _): RequireRole<AdminOnly>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .settings_service
        .update(payload, &Actor::from_user(&admin, ip.0))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(updated)))
}
