// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn create_router(app_state: AppState) -> Router {
    // Public
    let cron_routes = Router::new().route(
        "/deadline-notifications",
        post(handlers::cron::deadline_notifications),
    );

    // Signed in
    let customer_routes = Router::new()
        .route("/"
               ,get(handlers::customers::list_customers)
               .post(handlers::customers::create_customer)
        )
        .route("/{id}"
               ,get(handlers::customers::get_customer)
               .put(handlers::customers::update_customer)
               .delete(handlers::customers::delete_customer)
        )
        .route("/{id}/addresses"
               ,get(handlers::customers::list_addresses)
               .post(handlers::customers::add_address)
        )
        .route("/{id}/addresses/{address_id}", delete(handlers::customers::delete_address))
        .route("/{id}/contacts"
               ,get(handlers::customers::list_contacts)
               .post(handlers::customers::add_contact)
        )
        .route("/{id}/contacts/{contact_id}", delete(handlers::customers::delete_contact));

    let project_routes = Router::new()
        .route("/"
               ,get(handlers::projects::list_projects)
               .post(handlers::projects::create_project)
        )
        .route("/{id}"
               ,get(handlers::projects::get_project)
               .put(handlers::projects::update_project)
               .delete(handlers::projects::delete_project)
        )
        .route("/{id}/quotes"
               ,get(handlers::projects::list_quotes)
               .post(handlers::projects::create_quote)
        );

    let task_routes = Router::new()
        .route("/"
               ,get(handlers::tasks::list_tasks)
               .post(handlers::tasks::create_task)
        )
        .route("/{id}"
               ,get(handlers::tasks::get_task)
               .put(handlers::tasks::update_task)
               .delete(handlers::tasks::delete_task)
        )
        .route("/{id}/subtasks", get(handlers::tasks::list_subtasks))
        .route("/{id}/comments"
               ,get(handlers::comments::list_task_comments)
               .post(handlers::comments::create_task_comment)
        )
        .route("/{id}/comments/{comment_id}", delete(handlers::comments::delete_task_comment));

    let ticket_routes = Router::new()
        .route("/"
               ,get(handlers::tickets::list_tickets)
               .post(handlers::tickets::create_ticket)
        )
        .route("/{id}"
               ,get(handlers::tickets::get_ticket)
               .put(handlers::tickets::update_ticket)
               .delete(handlers::tickets::delete_ticket)
        )
        .route("/{id}/comments"
               ,get(handlers::comments::list_ticket_comments)
               .post(handlers::comments::create_ticket_comment)
        )
        .route("/{id}/comments/{comment_id}", delete(handlers::comments::delete_ticket_comment));

    let user_routes = Router::new()
        .route("/staff"
               ,get(handlers::users::list_staff)
               .post(handlers::users::create_staff)
        )
        .route("/consumers"
               ,get(handlers::users::list_consumers)
               .post(handlers::users::create_consumer)
        )
        .route("/{id}"
               ,get(handlers::users::get_user)
               .put(handlers::users::update_user)
               .delete(handlers::users::delete_user)
        );

    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/auth/me/password", put(handlers::auth::change_password))
        .nest("/customers", customer_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/tickets", ticket_routes)
        .nest("/users", user_routes)
        .route("/audit-logs", get(handlers::audit_logs::list_audit_logs))
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/{id}/read", post(handlers::notifications::mark_notification_read))
        .route("/settings"
               ,get(handlers::settings::get_settings)
               .put(handlers::settings::update_settings)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let api = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/auth/login", post(handlers::auth::login))
        .nest("/cron", cron_routes)
        .merge(protected);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(app_state)
}
