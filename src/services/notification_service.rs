// src/services/notification_service.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        repository::{now_value, Repository},
        store::{Filter, FindQuery, Patch, StoreError},
    },
    models::{
        auth::{ConsumerUser, StaffUser},
        notification::{Notification, NotificationKind, SweepReport},
        pagination::{ListParams, Paginated},
        task::{Task, TaskStatus},
        ticket::{ChangeSummary, Ticket},
    },
    services::{
        mailer::{Email, Mailer},
        settings_service::SettingsService,
    },
};

const SWEEP_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct NotificationService {
    notifications: Repository<Notification>,
    tasks: Repository<Task>,
    staff: Repository<StaffUser>,
    consumers: Repository<ConsumerUser>,
    settings: SettingsService,
    mailer: Arc<dyn Mailer>,
}

struct Recipient {
    id: Uuid,
    email: String,
    name: String,
}

impl NotificationService {
    pub fn new(
        notifications: Repository<Notification>,
        tasks: Repository<Task>,
        staff: Repository<StaffUser>,
        consumers: Repository<ConsumerUser>,
        settings: SettingsService,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { notifications, tasks, staff, consumers, settings, mailer }
    }

    // =========================================================================
    //  NOTICES
    // =========================================================================

    /// Mails the assignee of `task` about its due date. `false` when nothing went out.
    pub async fn send_deadline_notice(&self, task: &Task) -> bool {
        let (Some(assignee_id), Some(due_date)) = (task.assignee_id, task.due_date) else {
            return false;
        };
        let recipient = match self.recipient(assignee_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::warn!("task {} has unknown assignee {}", task.id, assignee_id);
                return false;
            }
            Err(e) => {
                tracing::warn!("could not resolve assignee of task {}: {}", task.id, e);
                return false;
            }
        };

        let title = format!("Frist naht: {}", task.title);
        let message = format!(
            "Hallo {},\n\ndie Aufgabe \"{}\" ist am {} fällig.",
            recipient.name,
            task.title,
            due_date.format("%d.%m.%Y %H:%M UTC")
        );

        self.deliver(recipient, NotificationKind::DeadlineApproaching, title, message, "task", task.id)
            .await
    }

    /// Mails the creator of `ticket` what changed. `false` when nothing went out.
    pub async fn send_ticket_change_notice(&self, ticket: &Ticket, summary: &ChangeSummary) -> bool {
        if summary.is_empty() {
            return false;
        }
        let recipient = match self.recipient(ticket.created_by_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::warn!("ticket {} has no reachable creator", ticket.id);
                return false;
            }
            Err(e) => {
                tracing::warn!("could not resolve creator of ticket {}: {}", ticket.id, e);
                return false;
            }
        };

        let title = format!("Ticket aktualisiert: {}", ticket.title);
        let message = format!(
            "Hallo {},\n\n{} hat Ihr Ticket \"{}\" geändert:\n- {}",
            recipient.name,
            summary.changed_by,
            ticket.title,
            summary.changes.join("\n- ")
        );

        self.deliver(recipient, NotificationKind::TicketChanged, title, message, "ticket", ticket.id)
            .await
    }

    async fn deliver(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
        title: String,
        message: String,
        entity_type: &str,
        entity_id: Uuid,
    ) -> bool {
        let email = Email { to: recipient.email.clone(), subject: title.clone(), body: message.clone() };
        if let Err(e) = self.mailer.send(&email).await {
            tracing::warn!("mail to {} failed: {}", recipient.email, e);
            return false;
        }

        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: recipient.id,
            kind,
            title,
            message,
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            read: false,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.notifications.insert(&notification).await {
            tracing::warn!("in-app notification for {} not stored: {}", recipient.id, e);
        }
        true
    }

    async fn recipient(&self, user_id: Uuid) -> Result<Option<Recipient>, StoreError> {
        if let Some(u) = self.staff.get(user_id).await? {
            return Ok(u.active.then_some(Recipient { id: u.id, email: u.email, name: u.name }));
        }
        let consumer = self.consumers.get(user_id).await?;
        Ok(consumer
            .filter(|u| u.active)
            .map(|u| Recipient { id: u.id, email: u.email, name: u.name }))
    }

    // =========================================================================
    //  DEADLINE SWEEP
    // =========================================================================

    /// Notifies every open, assigned, not yet notified task due within the lead time.
    pub async fn run_deadline_sweep(&self) -> Result<SweepReport, AppError> {
        let settings = self.settings.get().await?;
        if !settings.deadline_notifications_enabled {
            tracing::info!("deadline notifications disabled, sweep skipped");
            return Ok(SweepReport::default());
        }

        let horizon = Utc::now() + Duration::hours(i64::from(settings.deadline_lead_hours));
        let horizon = serde_json::to_value(horizon).map_err(StoreError::from)?;
        let open: Vec<String> = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Review]
            .iter()
            .filter_map(|s| serde_json::to_value(s).ok())
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();

        let filter = Filter::new()
            .exists("assigneeId")
            .range("dueDate", None, horizon.as_str().map(str::to_owned))
            .missing("deadlineNotifiedAt")
            .any_of("status", open);
        let due = self.tasks.find(&FindQuery::filter(filter)).await?;

        let outcomes: Vec<bool> = stream::iter(due)
            .map(|task| async move { self.notify_and_stamp(&task).await })
            .buffer_unordered(SWEEP_CONCURRENCY)
            .collect()
            .await;

        let notified = outcomes.iter().filter(|ok| **ok).count() as u64;
        let report = SweepReport {
            checked: outcomes.len() as u64,
            notified,
            failed: outcomes.len() as u64 - notified,
        };
        tracing::info!("deadline sweep: {:?}", report);
        Ok(report)
    }

    async fn notify_and_stamp(&self, task: &Task) -> bool {
        if !self.send_deadline_notice(task).await {
            return false;
        }
        let patch = Patch::default().set("deadlineNotifiedAt", now_value());
        if let Err(e) = self.tasks.patch(task.id, patch).await {
            // Mail is out; the next sweep may send it again.
            tracing::warn!("task {} notified but not stamped: {}", task.id, e);
        }
        true
    }

    // =========================================================================
    //  IN-APP
    // =========================================================================

    pub async fn list_for_user(&self, user_id: Uuid, params: &ListParams) -> Result<Paginated<Notification>, AppError> {
        let query = FindQuery::filter(Filter::new().eq_id("userId", user_id))
            .sorted("createdAt", params.order())
            .paginate(params.skip(), params.limit());

        Ok(self.notifications.find_page(query, params.page()).await?)
    }

    /// Other users' notifications read as absent.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification, AppError> {
        match self.notifications.get(id).await? {
            Some(n) if n.user_id == user_id => self
                .notifications
                .patch(id, Patch::default().set("read", true))
                .await?
                .ok_or(AppError::NotFound("notification")),
            _ => Err(AppError::NotFound("notification")),
        }
    }
}
