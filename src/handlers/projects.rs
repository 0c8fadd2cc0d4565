// src/handlers/projects.rs

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
        auth::AuthenticatedUser,
        client_ip::ClientIp,
        i18n::Locale,
        rbac::{ManagerOrAdmin, RequireRole, StaffOnly},
    },
    models::{
        audit::Actor,
        pagination::{ListParams, Paginated},
        project::{CreateProjectPayload, CreateQuotePayload, Project, Quote, UpdateProjectPayload},
    },
    services::cascade::CascadeReport,
};

// GET /api/projects
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    params(ListParams),
    responses((status = 200, description = "Projects visible to the caller", body = Paginated<Project>)),
    security(("api_jwt" = []))
)]
pub async fn list_projects(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .project_service
        .list(&params, user.customer_scope())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/projects/{id}
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = Project),
        (status = 403, description = "Another customer's project"),
        (status = 404, description = "Unknown project")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_project(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = app_state
        .project_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if !user.can_access_customer(Some(project.customer_id)) {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    }
    Ok((StatusCode::OK, Json(project)))
}

// POST /api/projects
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "Projects",
    request_body = CreateProjectPayload,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid payload or unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Json(payload): Json<CreateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let project = app_state
        .project_service
        .create(payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(project)))
}

// PUT /api/projects/{id}
#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = UpdateProjectPayload,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 404, description = "Unknown project")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_project(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let project = app_state
        .project_service
        .update(id, payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(project)))
}

// DELETE /api/projects/{id}
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project, its tasks, tickets and quotes deleted", body = CascadeReport),
        (status = 404, description = "Unknown project")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_project(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .project_service
        .delete(id, Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/projects/{id}/quotes
#[utoipa::path(
    get,
    path = "/api/projects/{id}/quotes",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Quotes of the project", body = Vec<Quote>)),
    security(("api_jwt" = []))
)]
pub async fn list_quotes(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let quotes = app_state
        .project_service
        .list_quotes(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotes)))
}

// POST /api/projects/{id}/quotes
#[utoipa::path(
    post,
    path = "/api/projects/{id}/quotes",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = CreateQuotePayload,
    responses((status = 201, description = "Quote created", body = Quote)),
    security(("api_jwt" = []))
)]
pub async fn create_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateQuotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let quote = app_state
        .project_service
        .add_quote(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(quote)))
}
