// src/services.rs

pub mod audit_service;
pub use audit_service::AuditService;
pub mod auth;
pub use auth::AuthService;
pub mod cascade;
pub use cascade::CascadeDeleter;
pub mod comment_service;
pub use comment_service::CommentService;
pub mod customer_service;
pub use customer_service::CustomerService;
pub mod mailer;
pub mod notification_service;
pub use notification_service::NotificationService;
pub mod project_service;
pub use project_service::ProjectService;
pub mod settings_service;
pub use settings_service::SettingsService;
pub mod task_service;
pub use task_service::TaskService;
pub mod ticket_service;
pub use ticket_service::TicketService;
pub mod user_service;
pub use user_service::UserService;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::{Record, Repository},
};

/// Fails with `InvalidReference(field)` when `id` is set but points at nothing.
pub(crate) async fn ensure_reference<T: Record>(
    repo: &Repository<T>,
    id: Option<Uuid>,
    field: &'static str,
) -> Result<(), AppError> {
    match id {
        Some(id) if !repo.exists(id).await? => Err(AppError::InvalidReference(field)),
        _ => Ok(()),
    }
}
