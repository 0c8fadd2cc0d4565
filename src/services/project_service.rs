// src/services/project_service.rs

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        repository::{to_document, Repository},
        store::{Filter, FindQuery},
    },
    models::{
        audit::Actor,
        auth::StaffUser,
        customer::Customer,
        pagination::{ListParams, Paginated},
        project::{CreateProjectPayload, CreateQuotePayload, Project, Quote, UpdateProjectPayload},
    },
    services::{
        audit_service::AuditService,
        cascade::{CascadeDeleter, CascadeReport, DeletionRequest, EntityKind},
        ensure_reference,
    },
};

const SORTABLE: &[&str] = &["name", "status", "startDate", "endDate", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct ProjectService {
    projects: Repository<Project>,
    quotes: Repository<Quote>,
    customers: Repository<Customer>,
    staff: Repository<StaffUser>,
    audit: AuditService,
    cascade: CascadeDeleter,
}

impl ProjectService {
    pub fn new(
        projects: Repository<Project>,
        quotes: Repository<Quote>,
        customers: Repository<Customer>,
        staff: Repository<StaffUser>,
        audit: AuditService,
        cascade: CascadeDeleter,
    ) -> Self {
        Self { projects, quotes, customers, staff, audit, cascade }
    }

    pub async fn list(&self, params: &ListParams, customer: Option<Uuid>) -> Result<Paginated<Project>, AppError> {
        let mut filter = Filter::new();
        if let Some(customer_id) = customer {
            filter = filter.eq_id("customerId", customer_id);
        }
        if let Some(term) = &params.search {
            filter = filter.search(&["name", "description"], term);
        }

        let query = FindQuery::filter(filter)
            .sorted(params.sort_field(SORTABLE), params.order())
            .paginate(params.skip(), params.limit());

        Ok(self.projects.find_page(query, params.page()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Project, AppError> {
        self.projects.get(id).await?.ok_or(AppError::NotFound("project"))
    }

    pub async fn create(&self, payload: CreateProjectPayload, actor: &Actor) -> Result<Project, AppError> {
        ensure_reference(&self.customers, Some(payload.customer_id), "customerId").await?;
        ensure_reference(&self.staff, payload.assignee_id, "assigneeId").await?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            customer_id: payload.customer_id,
            name: payload.name,
            description: payload.description,
            status: payload.status.unwrap_or_default(),
            assignee_id: payload.assignee_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            created_at: now,
            updated_at: now,
        };
        let project = self.projects.insert(&project).await?;

        self.audit
            .record_best_effort(actor, "CREATE_PROJECT", "project", project.id, json!({ "changes": project }))
            .await;
        Ok(project)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateProjectPayload, actor: &Actor) -> Result<Project, AppError> {
        ensure_reference(&self.staff, payload.assignee_id.flatten(), "assigneeId").await?;

        let changes = to_document(&payload)?;
        let project = self
            .projects
            .update(id, changes.clone())
            .await?
            .ok_or(AppError::NotFound("project"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_PROJECT", "project", id, json!({ "changes": changes }))
            .await;
        Ok(project)
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<CascadeReport, AppError> {
        let request = DeletionRequest { kind: EntityKind::Project, id, actor, reason: None };
        Ok(self.cascade.delete(request).await?)
    }

    // --- QUOTES ---

    pub async fn list_quotes(&self, project_id: Uuid) -> Result<Vec<Quote>, AppError> {
        self.get(project_id).await?;
        let query = FindQuery::filter(Filter::new().eq_id("projectId", project_id));
        Ok(self.quotes.find(&query).await?)
    }

    /// Quotes inherit the customer of their project.
    pub async fn add_quote(&self, project_id: Uuid, payload: CreateQuotePayload) -> Result<Quote, AppError> {
        let project = self.get(project_id).await?;
        let now = Utc::now();
        let quote = Quote {
            id: Uuid::new_v4(),
            customer_id: project.customer_id,
            project_id: Some(project.id),
            title: payload.title,
            amount: payload.amount,
            status: payload.status.unwrap_or_default(),
            valid_until: payload.valid_until,
            created_at: now,
            updated_at: now,
        };
        Ok(self.quotes.insert(&quote).await?)
    }
}
