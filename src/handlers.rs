pub mod audit_logs;
pub mod auth;
pub mod comments;
pub mod cron;
pub mod customers;
pub mod notifications;
pub mod projects;
pub mod settings;
pub mod tasks;
pub mod tickets;
pub mod users;
