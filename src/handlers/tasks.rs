// src/handlers/tasks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        client_ip::ClientIp,
        i18n::Locale,
        rbac::{ManagerOrAdmin, RequireRole, StaffOnly},
    },
    models::{
        audit::Actor,
        pagination::{ListParams, Paginated},
        task::{CreateTaskPayload, Task, TaskFilterParams, UpdateTaskPayload},
    },
    services::cascade::CascadeReport,
};

// GET /api/tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    params(ListParams, TaskFilterParams),
    responses((status = 200, description = "Top-level tasks", body = Paginated<Task>)),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Query(params): Query<ListParams>,
    Query(filters): Query<TaskFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .task_service
        .list(&params, &filters)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "The task", body = Task),
        (status = 404, description = "Unknown task")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(task)))
}

// GET /api/tasks/{id}/subtasks
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/subtasks",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Parent task id")),
    responses((status = 200, description = "Subtasks, oldest first", body = Vec<Task>)),
    security(("api_jwt" = []))
)]
pub async fn list_subtasks(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let subtasks = app_state
        .task_service
        .list_subtasks(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subtasks)))
}

// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = CreateTaskPayload,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid payload, unknown reference or nested subtask")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<StaffOnly>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let task = app_state
        .task_service
        .create(payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(task)))
}

// PUT /api/tasks/{id}
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = UpdateTaskPayload,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 404, description = "Unknown task")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let task = app_state
        .task_service
        .update(id, payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(task)))
}

// DELETE /api/tasks/{id}
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task, its subtasks and comments deleted", body = CascadeReport),
        (status = 404, description = "Unknown task")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_task(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .task_service
        .delete(id, Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
