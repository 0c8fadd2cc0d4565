// src/handlers/tickets.rs

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
        ticket::{CreateTicketPayload, Ticket, UpdateTicketPayload},
    },
    services::cascade::CascadeReport,
};

// GET /api/tickets
#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "Tickets",
    params(ListParams),
    responses((status = 200, description = "Tickets visible to the caller", body = Paginated<Ticket>)),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .ticket_service
        .list(&params, user.customer_scope())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/tickets/{id}
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "The ticket", body = Ticket),
        (status = 403, description = "Another customer's ticket"),
        (status = 404, description = "Unknown ticket")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = app_state
        .ticket_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if !user.can_access_customer(ticket.customer_id) {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    }
    Ok((StatusCode::OK, Json(ticket)))
}

// POST /api/tickets
#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "Tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Ticket filed", body = Ticket),
        (status = 400, description = "Invalid payload or unknown reference")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .create(payload, &user.0, &user.actor(&ip))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

// PUT /api/tickets/{id}
#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = UpdateTicketPayload,
    responses(
        (status = 200, description = "Ticket updated; the creator is notified", body = Ticket),
        (status = 404, description = "Unknown ticket")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let actor = Actor::from_user(&user, ip.0);
    let ticket = app_state
        .ticket_service
        .update(id, payload, &user, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// DELETE /api/tickets/{id}
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket and its comments deleted", body = CascadeReport),
        (status = 404, description = "Unknown ticket")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .ticket_service
        .delete(id, Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
