// src/handlers/customers.rs

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
        customer::{
            Address, Contact, CreateAddressPayload, CreateContactPayload, CreateCustomerPayload, Customer,
            UpdateCustomerPayload,
        },
        pagination::{ListParams, Paginated},
    },
    services::cascade::CascadeReport,
};

// =============================================================================
//  CUSTOMERS
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(ListParams),
    responses(
        (status = 200, description = "Customers visible to the caller", body = Paginated<Customer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .customer_service
        .list(&params, user.customer_scope())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "The customer", body = Customer),
        (status = 403, description = "Another customer's record"),
        (status = 404, description = "Unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.can_access_customer(Some(id)) {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    }

    let customer = app_state
        .customer_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Manager or admin only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .create(payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerPayload,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .update(id, payload, &Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer and everything it owns deleted", body = CascadeReport),
        (status = 403, description = "Manager or admin only"),
        (status = 404, description = "Unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ip: ClientIp,
    RequireRole(user, _): RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .customer_service
        .delete(id, Actor::from_user(&user, ip.0))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// =============================================================================
//  ADDRESSES
// =============================================================================

// GET /api/customers/{id}/addresses
#[utoipa::path(
    get,
    path = "/api/customers/{id}/addresses",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Addresses of the customer", body = Vec<Address>)),
    security(("api_jwt" = []))
)]
pub async fn list_addresses(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = app_state
        .customer_service
        .list_addresses(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(addresses)))
}

// POST /api/customers/{id}/addresses
#[utoipa::path(
    post,
    path = "/api/customers/{id}/addresses",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CreateAddressPayload,
    responses(
        (status = 201, description = "Address added", body = Address),
        (status = 404, description = "Unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_address(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAddressPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let address = app_state
        .customer_service
        .add_address(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(address)))
}

// DELETE /api/customers/{id}/addresses/{address_id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}/addresses/{address_id}",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "Customer id"),
        ("address_id" = Uuid, Path, description = "Address id")
    ),
    responses(
        (status = 204, description = "Address removed"),
        (status = 404, description = "Unknown address")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_address(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<ManagerOrAdmin>,
    Path((id, address_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_address(id, address_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  CONTACTS
// =============================================================================

// GET /api/customers/{id}/contacts
#[utoipa::path(
    get,
    path = "/api/customers/{id}/contacts",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Contacts of the customer", body = Vec<Contact>)),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    locale: Locale,
    _staff: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = app_state
        .customer_service
        .list_contacts(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(contacts)))
}

// POST /api/customers/{id}/contacts
#[utoipa::path(
    post,
    path = "/api/customers/{id}/contacts",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CreateContactPayload,
    responses(
        (status = 201, description = "Contact added", body = Contact),
        (status = 404, description = "Unknown customer")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<ManagerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let contact = app_state
        .customer_service
        .add_contact(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(contact)))
}

// DELETE /api/customers/{id}/contacts/{contact_id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}/contacts/{contact_id}",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "Customer id"),
        ("contact_id" = Uuid, Path, description = "Contact id")
    ),
    responses(
        (status = 204, description = "Contact removed"),
        (status = 404, description = "Unknown contact")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<ManagerOrAdmin>,
    Path((id, contact_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_contact(id, contact_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
