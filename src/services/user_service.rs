// src/services/user_service.rs

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{
        repository::Repository,
        store::{Filter, FindQuery, Patch},
    },
    models::{
        audit::Actor,
        auth::{ConsumerUser, CreateConsumerPayload, CreateStaffPayload, Role, StaffUser, UpdateUserPayload, User, UserType},
        customer::Customer,
        pagination::{ListParams, Paginated},
    },
    services::{
        audit_service::AuditService,
        auth::{hash_password, AuthService},
        cascade::{CascadeDeleter, CascadeReport, DeletionRequest, EntityKind},
        ensure_reference,
    },
};

const SORTABLE: &[&str] = &["name", "email", "role", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct UserService {
    staff: Repository<StaffUser>,
    consumers: Repository<ConsumerUser>,
    customers: Repository<Customer>,
    auth: AuthService,
    audit: AuditService,
    cascade: CascadeDeleter,
}

fn invalid_role() -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("role", ValidationError::new("invalid_role"));
    AppError::ValidationError(errors)
}

fn list_query(params: &ListParams) -> FindQuery {
    let mut filter = Filter::new();
    if let Some(term) = &params.search {
        filter = filter.search(&["name", "email"], term);
    }
    FindQuery::filter(filter)
        .sorted(params.sort_field(SORTABLE), params.order())
        .paginate(params.skip(), params.limit())
}

impl UserService {
    pub fn new(
        staff: Repository<StaffUser>,
        consumers: Repository<ConsumerUser>,
        customers: Repository<Customer>,
        auth: AuthService,
        audit: AuditService,
        cascade: CascadeDeleter,
    ) -> Self {
        Self { staff, consumers, customers, auth, audit, cascade }
    }

    pub async fn list_staff(&self, params: &ListParams) -> Result<Paginated<User>, AppError> {
        let page = self.staff.find_page(list_query(params), params.page()).await?;
        Ok(page.map(User::from))
    }

    pub async fn list_consumers(&self, params: &ListParams) -> Result<Paginated<User>, AppError> {
        let page = self.consumers.find_page(list_query(params), params.page()).await?;
        Ok(page.map(User::from))
    }

    /// Staff first, then consumers.
    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        if let Some(staff) = self.staff.get(id).await? {
            return Ok(staff.into());
        }
        self.consumers
            .get(id)
            .await?
            .map(User::from)
            .ok_or(AppError::NotFound("user"))
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), AppError> {
        match self.auth.find_by_email(email).await? {
            Some(_) => Err(AppError::EmailAlreadyExists),
            None => Ok(()),
        }
    }

    pub async fn create_staff(&self, payload: CreateStaffPayload, actor: &Actor) -> Result<User, AppError> {
        if !payload.role.is_staff() {
            return Err(invalid_role());
        }
        let email = payload.email.trim().to_lowercase();
        self.ensure_email_free(&email).await?;

        let now = Utc::now();
        let staff = StaffUser {
            id: Uuid::new_v4(),
            email,
            name: payload.name,
            role: payload.role,
            password_hash: hash_password(&payload.password).await?,
            active: true,
            user_type: UserType::Staff,
            created_at: now,
            updated_at: now,
        };
        let user = User::from(self.staff.insert(&staff).await?);

        self.audit
            .record_best_effort(actor, "CREATE_USER", "user", user.id, json!({ "changes": user }))
            .await;
        Ok(user)
    }

    pub async fn create_consumer(&self, payload: CreateConsumerPayload, actor: &Actor) -> Result<User, AppError> {
        ensure_reference(&self.customers, Some(payload.customer_id), "customerId").await?;
        let email = payload.email.trim().to_lowercase();
        self.ensure_email_free(&email).await?;

        let now = Utc::now();
        let consumer = ConsumerUser {
            id: Uuid::new_v4(),
            email,
            name: payload.name,
            role: Role::Kunde,
            customer_id: payload.customer_id,
            password_hash: hash_password(&payload.password).await?,
            active: true,
            user_type: UserType::Consumer,
            created_at: now,
            updated_at: now,
        };
        let user = User::from(self.consumers.insert(&consumer).await?);

        self.audit
            .record_best_effort(actor, "CREATE_USER", "user", user.id, json!({ "changes": user }))
            .await;
        Ok(user)
    }

    /// Consumers keep the `KUNDE` role; staff cannot be demoted to it.
    pub async fn update(&self, id: Uuid, payload: UpdateUserPayload, actor: &Actor) -> Result<User, AppError> {
        let existing = self.get(id).await?;

        let mut changes = Map::new();
        if let Some(name) = &payload.name {
            changes.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(active) = payload.active {
            changes.insert("active".into(), Value::Bool(active));
        }
        if let Some(role) = payload.role {
            let allowed = match existing.user_type {
                UserType::Staff => role.is_staff(),
                UserType::Consumer => role == Role::Kunde,
            };
            if !allowed {
                return Err(invalid_role());
            }
            changes.insert("role".into(), Value::String(role.as_str().to_string()));
        }

        let patch = Patch::default().merge(changes.clone());
        let updated: Option<User> = match existing.user_type {
            UserType::Staff => self.staff.patch(id, patch).await?.map(User::from),
            UserType::Consumer => self.consumers.patch(id, patch).await?.map(User::from),
        };
        let user = updated.ok_or(AppError::NotFound("user"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_USER", "user", id, json!({ "changes": changes }))
            .await;
        Ok(user)
    }

    /// Removes the account and clears it as assignee everywhere. Own account is off limits.
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<CascadeReport, AppError> {
        if id == actor.user_id {
            return Err(AppError::Forbidden);
        }
        let request = DeletionRequest { kind: EntityKind::User, id, actor, reason: None };
        Ok(self.cascade.delete(request).await?)
    }
}
