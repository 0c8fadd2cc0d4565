// src/handlers/audit_logs.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
    },
    models::{
        audit::{AuditLogEntry, AuditLogFilterParams},
        pagination::{ListParams, Paginated},
    },
};

// GET /api/audit-logs
#[utoipa::path(
    get,
    path = "/api/audit-logs",
    tag = "Audit",
    params(ListParams, AuditLogFilterParams),
    responses(
        (status = 200, description = "Audit trail, newest first", body = Paginated<AuditLogEntry>),
        (status = 403, description = "Admin only")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    Query(params): Query<ListParams>,
    Query(filters): Query<AuditLogFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .audit_service
        .list(&params, &filters)
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}
