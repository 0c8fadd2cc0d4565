// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::change_password,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::list_addresses,
        handlers::customers::add_address,
        handlers::customers::delete_address,
        handlers::customers::list_contacts,
        handlers::customers::add_contact,
        handlers::customers::delete_contact,

        // --- Projects ---
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::create_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::projects::list_quotes,
        handlers::projects::create_quote,

        // --- Tasks ---
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::list_subtasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,

        // --- Tickets ---
        handlers::tickets::list_tickets,
        handlers::tickets::get_ticket,
        handlers::tickets::create_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::delete_ticket,

        // --- Comments ---
        handlers::comments::list_task_comments,
        handlers::comments::create_task_comment,
        handlers::comments::delete_task_comment,
        handlers::comments::list_ticket_comments,
        handlers::comments::create_ticket_comment,
        handlers::comments::delete_ticket_comment,

        // --- Users ---
        handlers::users::list_staff,
        handlers::users::create_staff,
        handlers::users::list_consumers,
        handlers::users::create_consumer,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,

        // --- Audit / Notifications / Settings ---
        handlers::audit_logs::list_audit_logs,
        handlers::notifications::list_notifications,
        handlers::notifications::mark_notification_read,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::cron::deadline_notifications,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::UserType,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::ChangePasswordPayload,
            models::auth::CreateStaffPayload,
            models::auth::CreateConsumerPayload,
            models::auth::UpdateUserPayload,
            models::auth::AuthResponse,

            // --- Customers ---
            models::customer::CustomerStatus,
            models::customer::Customer,
            models::customer::CreateCustomerPayload,
            models::customer::UpdateCustomerPayload,
            models::customer::Address,
            models::customer::CreateAddressPayload,
            models::customer::Contact,
            models::customer::CreateContactPayload,

            // --- Projects ---
            models::project::ProjectStatus,
            models::project::Project,
            models::project::CreateProjectPayload,
            models::project::UpdateProjectPayload,
            models::project::QuoteStatus,
            models::project::Quote,
            models::project::CreateQuotePayload,

            // --- Tasks & Tickets ---
            models::task::TaskStatus,
            models::task::Priority,
            models::task::Task,
            models::task::CreateTaskPayload,
            models::task::UpdateTaskPayload,
            models::ticket::TicketStatus,
            models::ticket::Ticket,
            models::ticket::CreateTicketPayload,
            models::ticket::UpdateTicketPayload,

            // --- Comments ---
            models::comment::CommentTarget,
            models::comment::Comment,
            models::comment::CreateCommentPayload,

            // --- Audit / Notifications / Settings ---
            models::audit::AuditLogEntry,
            models::notification::NotificationKind,
            models::notification::Notification,
            models::notification::SweepReport,
            models::settings::SystemSettings,
            models::settings::UpdateSettingsRequest,
            services::cascade::CascadeReport,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-in and own account"),
        (name = "Customers", description = "Customers, addresses and contacts"),
        (name = "Projects", description = "Projects and quotes"),
        (name = "Tasks", description = "Tasks and subtasks"),
        (name = "Tickets", description = "Support tickets"),
        (name = "Comments", description = "Comments on tasks and tickets"),
        (name = "Users", description = "Staff and consumer accounts"),
        (name = "Audit", description = "Compliance trail"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Settings", description = "Portal settings"),
        (name = "Cron", description = "Scheduled jobs")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        components.add_security_scheme(
            "cron_secret",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
