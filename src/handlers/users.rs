// src/handlers/users.rs

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
        rbac::{AdminOnly, RequireRole},
    },
    models::{
        audit::Actor,
        auth::{CreateConsumerPayload, CreateStaffPayload, UpdateUserPayload, User},
        pagination::{ListParams, Paginated},
    },
    services::cascade::CascadeReport,
};

// GET /api/users/staff
#[utoipa::path(
    get,
    path = "/api/users/staff",
    tag = "Users",
    params(ListParams),
    responses((status = 200, description = "Staff accounts", body = Paginated<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .user_service
        .list_staff(&params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// POST /api/users/staff
#[utoipa::path(
    post,
    path = "/api/users/staff",
    tag = "Users",
    request_body = CreateStaffPayload,
    responses(
        (status = 201, description = "Staff account created", body = User),
        (status = 409, description = "E-mail already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(admin, _): RequireRole<AdminOnly>,
    Json(payload): Json<CreateStaffPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .user_service
        .create_staff(payload, &Actor::from_user(&admin, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/consumers
#[utoipa::path(
    get,
    path = "/api/users/consumers",
    tag = "Users",
    params(ListParams),
    responses((status = 200, description = "Consumer accounts", body = Paginated<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_consumers(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .user_service
        .list_consumers(&params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// POST /api/users/consumers
#[utoipa::path(
    post,
    path = "/api/users/consumers",
    tag = "Users",
    request_body = CreateConsumerPayload,
    responses(
        (status = 201, description = "Consumer account created", body = User),
        (status = 400, description = "Invalid payload or unknown customer"),
        (status = 409, description = "E-mail already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_consumer(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(admin, _): RequireRole<AdminOnly>,
    Json(payload): Json<CreateConsumerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .user_service
        .create_consumer(payload, &Actor::from_user(&admin, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The account", body = User),
        (status = 404, description = "Unknown user")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(user)))
}

// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, description = "Role not allowed for this user type"),
        (status = 404, description = "Unknown user")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(admin, _): RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .user_service
        .update(id, payload, &Actor::from_user(&admin, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(user)))
}

// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deleted, assignments cleared", body = CascadeReport),
        (status = 403, description = "Admins cannot delete themselves"),
        (status = 404, description = "Unknown user")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(admin, _): RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .user_service
        .delete(id, Actor::from_user(&admin, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
