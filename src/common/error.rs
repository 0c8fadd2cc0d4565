// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    db::store::StoreError,
    middleware::i18n::Locale,
    services::cascade::CascadeError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("not signed in")]
    Unauthorized,

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    /// The entity key (`customer`, `task`, ...) of what was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("e-mail already exists")]
    EmailAlreadyExists,

    /// A foreign key in the payload points at nothing.
    #[error("invalid reference: {0}")]
    InvalidReference(&'static str),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cascade failed: {0}")]
    Cascade(#[from] CascadeError),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

/// The JSON error body every handler returns.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidToken | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::Cascade(CascadeError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error in the caller's language.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        let (error, details) = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_deref().unwrap_or(e.code.as_ref());
                            i18n.translate(lang, &format!("validation.{code}"))
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (i18n.translate(lang, "error.validation"), Some(json!(details)))
            }
            AppError::Unauthorized => (i18n.translate(lang, "error.unauthorized"), None),
            AppError::InvalidToken => (i18n.translate(lang, "error.invalid_token"), None),
            AppError::InvalidCredentials => (i18n.translate(lang, "error.invalid_credentials"), None),
            AppError::Forbidden => (i18n.translate(lang, "error.forbidden"), None),
            AppError::NotFound(entity) => (not_found(i18n, lang, entity), None),
            AppError::Cascade(CascadeError::NotFound { kind, .. }) => {
                (not_found(i18n, lang, kind.entity_type()), None)
            }
            AppError::EmailAlreadyExists => (i18n.translate(lang, "error.email_exists"), None),
            AppError::InvalidReference(field) => (
                i18n.translate_with(lang, "error.invalid_reference", &[("field", field)]),
                None,
            ),
            // Everything else is a 500. The detail goes to the log, not to the client.
            e => {
                tracing::error!("internal server error: {}", e);
                (i18n.translate(lang, "error.internal"), None)
            }
        };

        ApiError { status, error, details }
    }
}

fn not_found(i18n: &I18nStore, lang: &str, entity: &str) -> String {
    let name = i18n.translate(lang, &format!("entity.{entity}"));
    i18n.translate_with(lang, "error.not_found", &[("entity", &name)])
}

// Used where no locale is at hand (middleware rejections).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale(DEFAULT_LANG.to_string()), &I18nStore::new())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    fn en() -> Locale {
        Locale("en".to_string())
    }

    #[test]
    fn taxonomy_maps_to_conventional_status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("task").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Store(StoreError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&en(), &I18nStore::new());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "One or more fields are invalid.");
        assert_eq!(api.details.unwrap()["name"][0], "required");
    }

    #[test]
    fn not_found_names_the_entity() {
        let api = AppError::NotFound("project").to_api_error(&Locale("de".into()), &I18nStore::new());
        assert_eq!(api.error, "Projekt nicht gefunden.");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let api = AppError::Store(StoreError::Unavailable("password=secret".into()))
            .to_api_error(&en(), &I18nStore::new());
        assert_eq!(api.error, "An unexpected error occurred.");
        assert!(api.details.is_none());
    }
}
