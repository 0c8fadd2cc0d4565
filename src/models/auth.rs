// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::{collection::Collection, repository::Record};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    /// Staff member
    Mitarbeiter,
    /// Consumer (customer account)
    Kunde,
}

impl Role {
    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Kunde)
    }

    pub fn is_manager_or_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Mitarbeiter => "MITARBEITER",
            Role::Kunde => "KUNDE",
        }
    }
}

/// Discriminator between the two user collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Staff,
    Consumer,
}

// --- RECORDS ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub active: bool,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for StaffUser {
    const COLLECTION: Collection = Collection::Staff;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub customer_id: Uuid,
    pub password_hash: String,
    pub active: bool,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ConsumerUser {
    const COLLECTION: Collection = Collection::Consumers;
}

/// The principal of a request, whichever collection it came from.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub user_type: UserType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub active: bool,
    #[serde(skip_serializing)] // never leaves the server
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StaffUser> for User {
    fn from(u: StaffUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            user_type: UserType::Staff,
            customer_id: None,
            active: u.active,
            password_hash: u.password_hash,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<ConsumerUser> for User {
    fn from(u: ConsumerUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: Role::Kunde,
            user_type: UserType::Consumer,
            customer_id: Some(u.customer_id),
            active: u.active,
            password_hash: u.password_hash,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "admin@servecta.de")]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub name: String,
    pub role: Role,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsumerPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub name: String,
    pub customer_id: Uuid,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,           // user id
    pub role: Role,
    pub user_type: UserType, // which collection to reload from
    pub exp: usize,
    pub iat: usize,
}
