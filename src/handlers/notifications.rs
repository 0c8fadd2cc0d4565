// src/handlers/notifications.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        notification::Notification,
        pagination::{ListParams, Paginated},
    },
};

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(ListParams),
    responses((status = 200, description = "The caller's notifications", body = Paginated<Notification>)),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .notification_service
        .list_for_user(user.id, &params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// POST /api/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = Notification),
        (status = 404, description = "Unknown notification")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = app_state
        .notification_service
        .mark_read(user.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(notification)))
}
