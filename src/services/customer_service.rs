// src/services/customer_service.rs

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        repository::{to_document, Repository},
        store::{Filter, FindQuery, SortOrder},
    },
    models::{
        audit::Actor,
        customer::{
            Address, Contact, CreateAddressPayload, CreateContactPayload, CreateCustomerPayload, Customer,
            UpdateCustomerPayload,
        },
        pagination::{ListParams, Paginated},
    },
    services::{
        audit_service::AuditService,
        cascade::{CascadeDeleter, CascadeReport, DeletionRequest, EntityKind},
    },
};

const SORTABLE: &[&str] = &["legalName", "tradeName", "status", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct CustomerService {
    customers: Repository<Customer>,
    addresses: Repository<Address>,
    contacts: Repository<Contact>,
    audit: AuditService,
    cascade: CascadeDeleter,
}

impl CustomerService {
    pub fn new(
        customers: Repository<Customer>,
        addresses: Repository<Address>,
        contacts: Repository<Contact>,
        audit: AuditService,
        cascade: CascadeDeleter,
    ) -> Self {
        Self { customers, addresses, contacts, audit, cascade }
    }

    // =========================================================================
    //  CUSTOMERS
    // =========================================================================

    /// `only` restricts the listing to a single customer (consumer accounts).
    pub async fn list(&self, params: &ListParams, only: Option<Uuid>) -> Result<Paginated<Customer>, AppError> {
        let mut filter = Filter::new();
        if let Some(id) = only {
            filter = filter.eq_id("id", id);
        }
        if let Some(term) = &params.search {
            filter = filter.search(&["legalName", "tradeName", "taxId"], term);
        }

        let query = FindQuery::filter(filter)
            .sorted(params.sort_field(SORTABLE), params.order())
            .paginate(params.skip(), params.limit());

        Ok(self.customers.find_page(query, params.page()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Customer, AppError> {
        self.customers.get(id).await?.ok_or(AppError::NotFound("customer"))
    }

    pub async fn create(&self, payload: CreateCustomerPayload, actor: &Actor) -> Result<Customer, AppError> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            legal_name: payload.legal_name,
            trade_name: payload.trade_name,
            tax_id: payload.tax_id,
            status: payload.status.unwrap_or_default(),
            tags: payload.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let customer = self.customers.insert(&customer).await?;

        self.audit
            .record_best_effort(actor, "CREATE_CUSTOMER", "customer", customer.id, json!({ "changes": customer }))
            .await;
        Ok(customer)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateCustomerPayload, actor: &Actor) -> Result<Customer, AppError> {
        let changes = to_document(&payload)?;
        let customer = self
            .customers
            .update(id, changes.clone())
            .await?
            .ok_or(AppError::NotFound("customer"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_CUSTOMER", "customer", id, json!({ "changes": changes }))
            .await;
        Ok(customer)
    }

    /// Removes the customer with everything it owns.
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<CascadeReport, AppError> {
        let request = DeletionRequest { kind: EntityKind::Customer, id, actor, reason: None };
        Ok(self.cascade.delete(request).await?)
    }

    // =========================================================================
    //  ADDRESSES & CONTACTS
    // =========================================================================

    pub async fn list_addresses(&self, customer_id: Uuid) -> Result<Vec<Address>, AppError> {
        self.get(customer_id).await?;
        let query = FindQuery::filter(Filter::new().eq_id("customerId", customer_id)).sorted("createdAt", SortOrder::Asc);
        Ok(self.addresses.find(&query).await?)
    }

    pub async fn add_address(&self, customer_id: Uuid, payload: CreateAddressPayload) -> Result<Address, AppError> {
        self.get(customer_id).await?;
        let now = Utc::now();
        let address = Address {
            id: Uuid::new_v4(),
            customer_id,
            label: payload.label,
            street: payload.street,
            postal_code: payload.postal_code,
            city: payload.city,
            country: payload.country.to_uppercase(),
            created_at: now,
            updated_at: now,
        };
        Ok(self.addresses.insert(&address).await?)
    }

    pub async fn delete_address(&self, customer_id: Uuid, address_id: Uuid) -> Result<(), AppError> {
        match self.addresses.get(address_id).await? {
            Some(address) if address.customer_id == customer_id => {
                self.addresses.delete(address_id).await?;
                Ok(())
            }
            _ => Err(AppError::NotFound("address")),
        }
    }

    pub async fn list_contacts(&self, customer_id: Uuid) -> Result<Vec<Contact>, AppError> {
        self.get(customer_id).await?;
        let query = FindQuery::filter(Filter::new().eq_id("customerId", customer_id)).sorted("lastName", SortOrder::Asc);
        Ok(self.contacts.find(&query).await?)
    }

    pub async fn add_contact(&self, customer_id: Uuid, payload: CreateContactPayload) -> Result<Contact, AppError> {
        self.get(customer_id).await?;
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            customer_id,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email.map(|e| e.trim().to_lowercase()),
            phone: payload.phone,
            position: payload.position,
            created_at: now,
            updated_at: now,
        };
        Ok(self.contacts.insert(&contact).await?)
    }

    pub async fn delete_contact(&self, customer_id: Uuid, contact_id: Uuid) -> Result<(), AppError> {
        match self.contacts.get(contact_id).await? {
            Some(contact) if contact.customer_id == customer_id => {
                self.contacts.delete(contact_id).await?;
                Ok(())
            }
            _ => Err(AppError::NotFound("contact")),
        }
    }
}
