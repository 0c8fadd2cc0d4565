// src/handlers/comments.rs
//
// Tasks and tickets share one comment collection; the routes differ only in
// the owner kind they pass down.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, client_ip::ClientIp, i18n::Locale},
    models::comment::{Comment, CommentTarget, CreateCommentPayload},
    services::cascade::CascadeReport,
};

async fn list(
    app_state: AppState,
    locale: Locale,
    user: AuthenticatedUser,
    target: CommentTarget,
    owner_id: Uuid,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let service = &app_state.comment_service;
    let result: Result<Vec<Comment>, AppError> = async {
        service.authorize_owner(target, owner_id, &user.0).await?;
        service.list(target, owner_id).await
    }
    .await;

    result
        .map(Json)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
}

async fn create(
    app_state: AppState,
    locale: Locale,
    user: AuthenticatedUser,
    target: CommentTarget,
    owner_id: Uuid,
    payload: CreateCommentPayload,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let service = &app_state.comment_service;
    let result: Result<Comment, AppError> = async {
        service.authorize_owner(target, owner_id, &user.0).await?;
        service.create(target, owner_id, payload, &user.0).await
    }
    .await;

    result
        .map(|comment| (StatusCode::CREATED, Json(comment)))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
}

async fn delete(
    app_state: AppState,
    locale: Locale,
    ip: ClientIp,
    user: AuthenticatedUser,
    target: CommentTarget,
    owner_id: Uuid,
    comment_id: Uuid,
) -> Result<Json<CascadeReport>, ApiError> {
    app_state
        .comment_service
        .delete(target, owner_id, comment_id, &user.0, user.actor(&ip))
        .await
        .map(Json)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
}

// =============================================================================
//  TASK COMMENTS
// =============================================================================

// GET /api/tasks/{id}/comments
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<Comment>),
        (status = 404, description = "Unknown task")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_task_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    list(app_state, locale, user, CommentTarget::Task, id).await
}

// POST /api/tasks/{id}/comments
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = CreateCommentPayload,
    responses((status = 201, description = "Comment added", body = Comment)),
    security(("api_jwt" = []))
)]
pub async fn create_task_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    create(app_state, locale, user, CommentTarget::Task, id, payload).await
}

// DELETE /api/tasks/{id}/comments/{comment_id}
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Task id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment deleted", body = CascadeReport),
        (status = 403, description = "Neither author nor manager/admin"),
        (status = 404, description = "No such comment on this task")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_task_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    user: AuthenticatedUser,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    delete(app_state, locale, ip, user, CommentTarget::Task, id, comment_id).await
}

// =============================================================================
//  TICKET COMMENTS
// =============================================================================

// GET /api/tickets/{id}/comments
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<Comment>),
        (status = 404, description = "Unknown ticket")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_ticket_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    list(app_state, locale, user, CommentTarget::Ticket, id).await
}

// POST /api/tickets/{id}/comments
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = CreateCommentPayload,
    responses((status = 201, description = "Comment added", body = Comment)),
    security(("api_jwt" = []))
)]
pub async fn create_ticket_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    create(app_state, locale, user, CommentTarget::Ticket, id, payload).await
}

// DELETE /api/tickets/{id}/comments/{comment_id}
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Ticket id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment deleted", body = CascadeReport),
        (status = 403, description = "Neither author nor manager/admin"),
        (status = 404, description = "No such comment on this ticket")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_ticket_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    user: AuthenticatedUser,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    delete(app_state, locale, ip, user, CommentTarget::Ticket, id, comment_id).await
}
