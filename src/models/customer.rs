// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::{collection::Collection, repository::Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Prospect,
}

// --- CUSTOMER ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(example = "Müller Haustechnik GmbH")]
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Müller Haustechnik")]
    pub trade_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "DE123456789")]
    pub tax_id: Option<String>,
    pub status: CustomerStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Customer {
    const COLLECTION: Collection = Collection::Customers;
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub legal_name: String,
    #[validate(length(max = 200, message = "too_long"))]
    pub trade_name: Option<String>,
    #[validate(length(max = 40, message = "too_long"))]
    pub tax_id: Option<String>,
    pub status: Option<CustomerStatus>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "too_long"))]
    pub trade_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 40, message = "too_long"))]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// --- ADDRESS ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Rechnungsadresse")]
    pub label: Option<String>,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    #[schema(example = "DE")]
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Address {
    const COLLECTION: Collection = Collection::Addresses;
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressPayload {
    pub label: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub street: String,
    #[validate(length(min = 4, max = 10, message = "invalid_postal_code"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "required"))]
    pub city: String,
    #[validate(length(equal = 2, message = "invalid_country_code"))]
    pub country: String,
}

// --- CONTACT ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Contact {
    const COLLECTION: Collection = Collection::Contacts;
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactPayload {
    #[validate(length(min = 1, message = "required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "required"))]
    pub last_name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}
