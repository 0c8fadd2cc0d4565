// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::client_ip::ClientIp,
    models::{audit::Actor, auth::User},
};

/// Resolves the bearer token to the current user and stores it in the request extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or(AppError::InvalidToken)?;

    let user = app_state.auth_service.validate_token(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extractor for the authenticated user inside handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// Identity stamped into audit entries.
    pub fn actor(&self, ip: &ClientIp) -> Actor {
        Actor::from_user(&self.0, ip.0.clone())
    }

    /// The only customer a consumer may see; `None` for staff (no restriction).
    pub fn customer_scope(&self) -> Option<Uuid> {
        if self.0.role.is_staff() { None } else { Some(self.0.customer_id.unwrap_or_else(Uuid::nil)) }
    }

    pub fn can_access_customer(&self, customer_id: Option<Uuid>) -> bool {
        match self.customer_scope() {
            None => true,
            Some(own) => customer_id == Some(own),
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
