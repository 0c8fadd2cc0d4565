// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{Role, User},
    services::auth::require_role,
};

/// A named set of roles allowed through.
pub trait RoleGate: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// Extractor that only succeeds for users holding one of `G::allowed()`.
pub struct RequireRole<G>(pub User, pub PhantomData<G>);

impl<G, S> FromRequestParts<S> for RequireRole<G>
where
    G: RoleGate,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_parts(parts);

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized.to_api_error(&locale, &app_state.i18n_store))?;

        require_role(&user.0, G::allowed()).map_err(|e| {
            tracing::debug!("role {} rejected for {:?}", user.0.role.as_str(), G::allowed());
            e.to_api_error(&locale, &app_state.i18n_store)
        })?;

        Ok(RequireRole(user.0.clone(), PhantomData))
    }
}

// ---
// ROLE GATES
// ---

pub struct AdminOnly;
impl RoleGate for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}

pub struct ManagerOrAdmin;
impl RoleGate for ManagerOrAdmin {
    fn allowed() -> &'static [Role] {
        &[Role::Admin, Role::Manager]
    }
}

pub struct StaffOnly;
impl RoleGate for StaffOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin, Role::Manager, Role::Mitarbeiter]
    }
}
