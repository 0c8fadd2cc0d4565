// src/services/task_service.rs

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{
        repository::{to_document, Repository},
        store::{Filter, FindQuery, Patch, SortOrder, StoreError},
    },
    models::{
        audit::Actor,
        auth::StaffUser,
        customer::Customer,
        pagination::{ListParams, Paginated},
        project::Project,
        task::{CreateTaskPayload, Task, TaskFilterParams, UpdateTaskPayload},
    },
    services::{
        audit_service::AuditService,
        cascade::{CascadeDeleter, CascadeReport, DeletionRequest, EntityKind},
        ensure_reference,
    },
};

const SORTABLE: &[&str] = &["title", "status", "priority", "dueDate", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct TaskService {
    tasks: Repository<Task>,
    projects: Repository<Project>,
    customers: Repository<Customer>,
    staff: Repository<StaffUser>,
    audit: AuditService,
    cascade: CascadeDeleter,
}

fn nested_subtask() -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("parentTaskId", ValidationError::new("nested_subtask"));
    AppError::ValidationError(errors)
}

impl TaskService {
    pub fn new(
        tasks: Repository<Task>,
        projects: Repository<Project>,
        customers: Repository<Customer>,
        staff: Repository<StaffUser>,
        audit: AuditService,
        cascade: CascadeDeleter,
    ) -> Self {
        Self { tasks, projects, customers, staff, audit, cascade }
    }

    /// Top-level tasks only; subtasks are listed under their parent.
    pub async fn list(&self, params: &ListParams, filters: &TaskFilterParams) -> Result<Paginated<Task>, AppError> {
        let mut filter = Filter::new().missing("parentTaskId");
        if let Some(project_id) = filters.project_id {
            filter = filter.eq_id("projectId", project_id);
        }
        if let Some(customer_id) = filters.customer_id {
            filter = filter.eq_id("customerId", customer_id);
        }
        if let Some(assignee_id) = filters.assignee_id {
            filter = filter.eq_id("assigneeId", assignee_id);
        }
        if let Some(status) = filters.status {
            filter = filter.eq("status", serde_json::to_value(status).map_err(StoreError::from)?);
        }
        if let Some(term) = &params.search {
            filter = filter.search(&["title", "description"], term);
        }

        let query = FindQuery::filter(filter)
            .sorted(params.sort_field(SORTABLE), params.order())
            .paginate(params.skip(), params.limit());

        Ok(self.tasks.find_page(query, params.page()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, AppError> {
        self.tasks.get(id).await?.ok_or(AppError::NotFound("task"))
    }

    pub async fn list_subtasks(&self, id: Uuid) -> Result<Vec<Task>, AppError> {
        self.get(id).await?;
        let query = FindQuery::filter(Filter::new().eq_id("parentTaskId", id)).sorted("createdAt", SortOrder::Asc);
        Ok(self.tasks.find(&query).await?)
    }

    pub async fn create(&self, payload: CreateTaskPayload, actor: &Actor) -> Result<Task, AppError> {
        ensure_reference(&self.projects, payload.project_id, "projectId").await?;
        ensure_reference(&self.customers, payload.customer_id, "customerId").await?;
        ensure_reference(&self.staff, payload.assignee_id, "assigneeId").await?;

        let mut project_id = payload.project_id;
        let mut customer_id = payload.customer_id;

        if let Some(parent_id) = payload.parent_task_id {
            let parent = self
                .tasks
                .get(parent_id)
                .await?
                .ok_or(AppError::InvalidReference("parentTaskId"))?;
            if parent.parent_task_id.is_some() {
                return Err(nested_subtask());
            }
            // Subtasks live in the parent's project unless told otherwise.
            project_id = project_id.or(parent.project_id);
            customer_id = customer_id.or(parent.customer_id);
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: payload.title,
            description: payload.description,
            status: payload.status.unwrap_or_default(),
            priority: payload.priority.unwrap_or_default(),
            project_id,
            customer_id,
            parent_task_id: payload.parent_task_id,
            assignee_id: payload.assignee_id,
            due_date: payload.due_date,
            deadline_notified_at: None,
            created_by_id: actor.user_id,
            created_at: now,
            updated_at: now,
        };
        let task = self.tasks.insert(&task).await?;

        self.audit
            .record_best_effort(actor, "CREATE_TASK", "task", task.id, json!({ "changes": task }))
            .await;
        Ok(task)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateTaskPayload, actor: &Actor) -> Result<Task, AppError> {
        ensure_reference(&self.projects, payload.project_id, "projectId").await?;
        ensure_reference(&self.customers, payload.customer_id, "customerId").await?;
        ensure_reference(&self.staff, payload.assignee_id.flatten(), "assigneeId").await?;

        let changes = to_document(&payload)?;
        let mut patch = Patch::default().merge(changes.clone());
        // A moved deadline gets a fresh notice.
        if payload.due_date.is_some() {
            patch = patch.unset("deadlineNotifiedAt");
        }

        let task = self.tasks.patch(id, patch).await?.ok_or(AppError::NotFound("task"))?;

        self.audit
            .record_best_effort(actor, "UPDATE_TASK", "task", id, json!({ "changes": changes }))
            .await;
        Ok(task)
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<CascadeReport, AppError> {
        let task = self.get(id).await?;
        let kind = if task.parent_task_id.is_some() { EntityKind::Subtask } else { EntityKind::Task };

        let request = DeletionRequest { kind, id, actor, reason: None };
        Ok(self.cascade.delete(request).await?)
    }
}
