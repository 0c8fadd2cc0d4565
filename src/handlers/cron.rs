// src/handlers/cron.rs

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::notification::SweepReport,
};

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// POST /api/cron/deadline-notifications
#[utoipa::path(
    post,
    path = "/api/cron/deadline-notifications",
    tag = "Cron",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 401, description = "Missing or wrong cron secret")
    ),
    security(("cron_secret" = []))
)]
pub async fn deadline_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let authorized = match (&app_state.config.cron_secret, bearer(&headers)) {
        (Some(secret), Some(given)) => secret == given,
        _ => false,
    };
    if !authorized {
        tracing::warn!("cron call rejected");
        return Err(AppError::Unauthorized.to_api_error(&locale, &app_state.i18n_store));
    }

    let report = app_state
        .notification_service
        .run_deadline_sweep()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
