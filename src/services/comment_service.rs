// src/services/comment_service.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        repository::Repository,
        store::{Filter, FindQuery, SortOrder},
    },
    models::{
        audit::Actor,
        auth::User,
        comment::{Comment, CommentTarget, CreateCommentPayload},
        task::Task,
        ticket::Ticket,
    },
    services::cascade::{
        CascadeDeleter, CascadeReport, DeletionRequest, EntityKind, MODERATED_COMMENT_REASON, OWN_COMMENT_REASON,
    },
};

#[derive(Clone)]
pub struct CommentService {
    comments: Repository<Comment>,
    tasks: Repository<Task>,
    tickets: Repository<Ticket>,
    cascade: CascadeDeleter,
}

impl CommentService {
    pub fn new(
        comments: Repository<Comment>,
        tasks: Repository<Task>,
        tickets: Repository<Ticket>,
        cascade: CascadeDeleter,
    ) -> Self {
        Self { comments, tasks, tickets, cascade }
    }

    /// Whoever may read the owning record may read and write its comments.
    /// Tasks are internal; tickets are shared with the consumer's customer.
    pub async fn authorize_owner(&self, target: CommentTarget, owner_id: Uuid, user: &User) -> Result<(), AppError> {
        match target {
            CommentTarget::Task => {
                if !self.tasks.exists(owner_id).await? {
                    return Err(AppError::NotFound("task"));
                }
                if !user.role.is_staff() {
                    return Err(AppError::Forbidden);
                }
            }
            CommentTarget::Ticket => {
                let ticket = self.tickets.get(owner_id).await?.ok_or(AppError::NotFound("ticket"))?;
                if !user.role.is_staff() && (ticket.customer_id.is_none() || ticket.customer_id != user.customer_id) {
                    return Err(AppError::Forbidden);
                }
            }
        }
        Ok(())
    }

    pub async fn list(&self, target: CommentTarget, owner_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let filter = Filter::new()
            .eq("entityType", target.as_str())
            .eq_id("entityId", owner_id);
        let query = FindQuery::filter(filter).sorted("createdAt", SortOrder::Asc);
        Ok(self.comments.find(&query).await?)
    }

    pub async fn create(
        &self,
        target: CommentTarget,
        owner_id: Uuid,
        payload: CreateCommentPayload,
        author: &User,
    ) -> Result<Comment, AppError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            entity_type: target,
            entity_id: owner_id,
            author_id: author.id,
            author_name: author.name.clone(),
            content: payload.content,
            created_at: now,
            updated_at: now,
        };
        Ok(self.comments.insert(&comment).await?)
    }

    /// The comment must hang off the given owner; only its author or a
    /// manager/admin may remove it. Rejections leave no trace.
    pub async fn delete(
        &self,
        target: CommentTarget,
        owner_id: Uuid,
        comment_id: Uuid,
        user: &User,
        actor: Actor,
    ) -> Result<CascadeReport, AppError> {
        let comment = match self.comments.get(comment_id).await? {
            Some(c) if c.entity_type == target && c.entity_id == owner_id => c,
            _ => return Err(AppError::NotFound("comment")),
        };

        let is_author = comment.author_id == user.id;
        if !is_author && !user.role.is_manager_or_admin() {
            return Err(AppError::Forbidden);
        }

        let reason = if is_author { OWN_COMMENT_REASON } else { MODERATED_COMMENT_REASON };
        let request = DeletionRequest { kind: EntityKind::Comment, id: comment_id, actor, reason: Some(reason) };
        Ok(self.cascade.delete(request).await?)
    }
}
