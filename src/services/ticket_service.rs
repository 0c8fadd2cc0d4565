// src/services/ticket_service.rs

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
        auth::{StaffUser, User},
        customer::Customer,
        pagination::{ListParams, Paginated},
        project::Project,
        ticket::{ChangeSummary, CreateTicketPayload, Ticket, UpdateTicketPayload},
    },
    services::{
        audit_service::AuditService,
        cascade::{CascadeDeleter, CascadeReport, DeletionRequest, EntityKind},
        ensure_reference,
        notification_service::NotificationService,
    },
};

const SORTABLE: &[&str] = &["title", "status", "priority", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct TicketService {
    tickets: Repository<Ticket>,
    customers: Repository<Customer>,
    projects: Repository<Project>,
    staff: Repository<StaffUser>,
    audit: AuditService,
    cascade: CascadeDeleter,
    notifications: NotificationService,
}

impl TicketService {
    pub fn new(
        tickets: Repository<Ticket>,
        customers: Repository<Customer>,
        projects: Repository<Project>,
        staff: Repository<StaffUser>,
        audit: AuditService,
        cascade: CascadeDeleter,
        notifications: NotificationService,
    ) -> Self {
        Self { tickets, customers, projects, staff, audit, cascade, notifications }
    }

    pub async fn list(&self, params: &ListParams, customer: Option<Uuid>) -> Result<Paginated<Ticket>, AppError> {
        let mut filter = Filter::new();
        if let Some(customer_id) = customer {
            filter = filter.eq_id("customerId", customer_id);
        }
        if let Some(term) = &params.search {
            filter = filter.search(&["title", "description"], term);
        }

        let query = FindQuery::filter(filter)
            .sorted(params.sort_field(SORTABLE), params.order())
            .paginate(params.skip(), params.limit());

        Ok(self.tickets.find_page(query, params.page()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.tickets.get(id).await?.ok_or(AppError::NotFound("ticket"))
    }

    /// Consumers always file against their own customer and cannot assign.
    pub async fn create(&self, payload: CreateTicketPayload, creator: &User, actor: &Actor) -> Result<Ticket, AppError> {
        let (customer_id, assignee_id) = if creator.role.is_staff() {
            (payload.customer_id, payload.assignee_id)
        } else {
            (creator.customer_id, None)
        };

        ensure_reference(&self.customers, customer_id, "customerId").await?;
        ensure_reference(&self.staff, assignee_id, "assigneeId").await?;
        if let Some(project_id) = payload.project_id {
            let project = self
                .projects
                .get(project_id)
                .await?
                .ok_or(AppError::InvalidReference("projectId"))?;
            if customer_id.is_some_and(|c| c != project.customer_id) {
                return Err(AppError::InvalidReference("projectId"));
            }
        }

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: payload.title,
            description: payload.description,
            status: Default::default(),
            priority: payload.priority.unwrap_or_default(),
            customer_id,
            project_id: payload.project_id,
            assignee_id,
            created_by_id: creator.id,
            created_at: now,
            updated_at: now,
        };
        let ticket = self.tickets.insert(&ticket).await?;

        self.audit
            .record_best_effort(actor, "CREATE_TICKET", "ticket", ticket.id, json!({ "changes": ticket }))
            .await;
        Ok(ticket)
    }

    /// Applies the change and, when someone other than the creator changed it,
    /// mails the creator in the background.
    pub async fn update(
        &self,
        id: Uuid,
        payload: UpdateTicketPayload,
        editor: &User,
        actor: &Actor,
    ) -> Result<Ticket, AppError> {
        ensure_reference(&self.staff, payload.assignee_id.flatten(), "assigneeId").await?;
        let before = self.get(id).await?;

        let changes = to_document(&payload)?;
        let after = self
            .tickets
            .update(id, changes.clone())
            .await?
            .ok_or(AppError::NotFound("ticket"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_TICKET", "ticket", id, json!({ "changes": changes }))
            .await;

        let summary = ChangeSummary::between(&before, &after, &editor.name);
        if !summary.is_empty() && editor.id != after.created_by_id {
            let notifications = self.notifications.clone();
            let ticket = after.clone();
            tokio::spawn(async move {
                if !notifications.send_ticket_change_notice(&ticket, &summary).await {
                    tracing::debug!("no change notice sent for ticket {}", ticket.id);
                }
            });
        }

        Ok(after)
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<CascadeReport, AppError> {
        let request = DeletionRequest { kind: EntityKind::Ticket, id, actor, reason: None };
        Ok(self.cascade.delete(request).await?)
    }
}
