// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::i18n::I18nStore,
    db::{pg_store::PgDocumentStore, repository::Repository, store::DocumentStore},
    services::{
        mailer::{HttpMailer, LogMailer, Mailer},
        AuditService, AuthService, CascadeDeleter, CommentService, CustomerService, NotificationService,
        ProjectService, SettingsService, TaskService, TicketService, UserService,
    },
};

/// Process configuration, read once from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Bearer token expected on the cron endpoint. Unset disables it.
    pub cron_secret: Option<String>,
    pub mail: Option<MailConfig>,
    pub bind_addr: String,
    pub db_max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let mail = match (optional("MAIL_API_URL"), optional("MAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(MailConfig {
                api_url,
                api_key,
                from: optional("MAIL_FROM").unwrap_or_else(|| "portal@servecta.de".to_string()),
            }),
            _ => None,
        };

        let db_max_connections = match optional("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS must be a number")?,
            None => 5,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            cron_secret: optional("CRON_SECRET"),
            mail,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub i18n_store: I18nStore,

    pub auth_service: AuthService,
    pub audit_service: AuditService,
    pub cascade: CascadeDeleter,
    pub customer_service: CustomerService,
    pub project_service: ProjectService,
    pub task_service: TaskService,
    pub ticket_service: TicketService,
    pub comment_service: CommentService,
    pub user_service: UserService,
    pub settings_service: SettingsService,
    pub notification_service: NotificationService,
}

impl AppState {
    /// Connects to Postgres, runs the migrations and wires every service.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("could not connect to the database")?;
        tracing::info!("database connection established");

        sqlx::migrate!().run(&pool).await.context("migrations failed")?;
        tracing::info!("migrations applied");

        let mailer: Arc<dyn Mailer> = match &config.mail {
            Some(mail) => Arc::new(HttpMailer::new(mail.api_url.clone(), mail.api_key.clone(), mail.from.clone())),
            None => {
                tracing::warn!("MAIL_API_URL/MAIL_API_KEY not set, mails are only logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::from_parts(config, Arc::new(PgDocumentStore::new(pool)), mailer))
    }

    /// Builds the service graph over any store and mailer.
    pub fn from_parts(config: Config, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let audit_service = AuditService::new(Repository::new(store.clone()));
        let cascade = CascadeDeleter::new(store.clone(), audit_service.clone());
        let auth_service = AuthService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            config.jwt_secret.clone(),
        );
        let settings_service = SettingsService::new(Repository::new(store.clone()), audit_service.clone());
        let notification_service = NotificationService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            settings_service.clone(),
            mailer,
        );

        let customer_service = CustomerService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            audit_service.clone(),
            cascade.clone(),
        );
        let project_service = ProjectService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            audit_service.clone(),
            cascade.clone(),
        );
        let task_service = TaskService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            audit_service.clone(),
            cascade.clone(),
        );
        let ticket_service = TicketService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            audit_service.clone(),
            cascade.clone(),
            notification_service.clone(),
        );
        let comment_service = CommentService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            cascade.clone(),
        );
        let user_service = UserService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            auth_service.clone(),
            audit_service.clone(),
            cascade.clone(),
        );

        Self {
            config: Arc::new(config),
            store,
            i18n_store: I18nStore::new(),
            auth_service,
            audit_service,
            cascade,
            customer_service,
            project_service,
            task_service,
            ticket_service,
            comment_service,
            user_service,
            settings_service,
            notification_service,
        }
    }
}
