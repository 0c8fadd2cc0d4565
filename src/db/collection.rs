// src/db/collection.rs

use std::fmt;

/// The logical record sets of the portal. Each one maps to a JSONB table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Customers,
    Addresses,
    Contacts,
    Projects,
    Quotes,
    Tasks,
    Tickets,
    Comments,
    Staff,
    Consumers,
    AuditLogs,
    Notifications,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Customers,
        Collection::Addresses,
        Collection::Contacts,
        Collection::Projects,
        Collection::Quotes,
        Collection::Tasks,
        Collection::Tickets,
        Collection::Comments,
        Collection::Staff,
        Collection::Consumers,
        Collection::AuditLogs,
        Collection::Notifications,
        Collection::Settings,
    ];

    /// Name used in logs and API payloads.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Customers => "customers",
            Collection::Addresses => "addresses",
            Collection::Contacts => "contacts",
            Collection::Projects => "projects",
            Collection::Quotes => "quotes",
            Collection::Tasks => "tasks",
            Collection::Tickets => "tickets",
            Collection::Comments => "comments",
            Collection::Staff => "staff",
            Collection::Consumers => "consumers",
            Collection::AuditLogs => "auditLogs",
            Collection::Notifications => "notifications",
            Collection::Settings => "settings",
        }
    }

    /// Postgres table backing the collection. Only ever a static string, never user input.
    pub fn table(self) -> &'static str {
        match self {
            Collection::AuditLogs => "audit_logs",
            other => other.name(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
