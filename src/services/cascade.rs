// src/services/cascade.rs
//
// Cascading deletion with an audit trail. One declarative relation table per
// aggregate root, one executor:
//
//   locate root -> write audit entry -> run relations (siblings concurrently,
//   dependents depth first) -> delete root -> report counts
//
// There is no transaction around this. Relation operations that completed stay
// applied when a sibling fails; the root (and any dependent whose own
// dependents failed) is left in place so the delete can be retried.

use std::{collections::BTreeMap, fmt, sync::Arc};

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::{
        collection::Collection,
        repository::now_value,
        store::{document_id, Document, DocumentStore, Filter, FindQuery, Patch, StoreError},
    },
    models::audit::Actor,
    services::audit_service::AuditService,
};

pub const GDPR_REASON: &str = "GDPR compliant deletion";
pub const OWN_COMMENT_REASON: &str = "User deleted own comment";
pub const MODERATED_COMMENT_REASON: &str = "Manager/Admin deleted comment";

// =========================================================================
//  RELATION TABLE
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Customer,
    Project,
    Task,
    /// A task with a parent. Same collection, no further nesting.
    Subtask,
    Ticket,
    User,
    Comment,
}

impl EntityKind {
    /// Value written to `auditLogs.entityType`.
    pub fn entity_type(self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Project => "project",
            EntityKind::Task | EntityKind::Subtask => "task",
            EntityKind::Ticket => "ticket",
            EntityKind::User => "user",
            EntityKind::Comment => "comment",
        }
    }

    /// Value written to `auditLogs.action`.
    pub fn delete_action(self) -> &'static str {
        match self {
            EntityKind::Customer => "DELETE_CUSTOMER",
            EntityKind::Project => "DELETE_PROJECT",
            EntityKind::Task | EntityKind::Subtask => "DELETE_TASK",
            EntityKind::Ticket => "DELETE_TICKET",
            EntityKind::User => "DELETE_USER",
            EntityKind::Comment => "DELETE_COMMENT",
        }
    }

    /// Where the root may live. Users are split across two collections.
    fn root_collections(self) -> &'static [Collection] {
        match self {
            EntityKind::Customer => &[Collection::Customers],
            EntityKind::Project => &[Collection::Projects],
            EntityKind::Task | EntityKind::Subtask => &[Collection::Tasks],
            EntityKind::Ticket => &[Collection::Tickets],
            EntityKind::User => &[Collection::Staff, Collection::Consumers],
            EntityKind::Comment => &[Collection::Comments],
        }
    }

    /// Identifying fields copied into the audit snapshot.
    fn snapshot_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Customer => &["legalName", "tradeName", "taxId"],
            EntityKind::Project => &["name", "customerId"],
            EntityKind::Task | EntityKind::Subtask => &["title", "projectId", "customerId", "parentTaskId"],
            EntityKind::Ticket => &["title", "customerId"],
            EntityKind::User => &["email", "name", "role", "userType"],
            EntityKind::Comment => &["entityType", "entityId", "authorId"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMode {
    /// Remove the dependent records.
    Delete,
    /// Clear the foreign key, keep the record.
    Detach,
}

#[derive(Debug)]
pub struct Relation {
    pub name: &'static str,
    pub collection: Collection,
    pub foreign_key: &'static str,
    /// Extra equality the dependent must satisfy (generic owner fields on comments).
    pub scope: Option<(&'static str, &'static str)>,
    pub mode: RelationMode,
    /// Dependents that are roots themselves get their own relations processed first.
    pub cascades_into: Option<EntityKind>,
}

impl Relation {
    const fn delete(name: &'static str, collection: Collection, foreign_key: &'static str) -> Self {
        Self { name, collection, foreign_key, scope: None, mode: RelationMode::Delete, cascades_into: None }
    }

    const fn cascade(
        name: &'static str,
        collection: Collection,
        foreign_key: &'static str,
        into: EntityKind,
    ) -> Self {
        Self { name, collection, foreign_key, scope: None, mode: RelationMode::Delete, cascades_into: Some(into) }
    }

    const fn comments(owner_type: &'static str) -> Self {
        Self {
            name: "comments",
            collection: Collection::Comments,
            foreign_key: "entityId",
            scope: Some(("entityType", owner_type)),
            mode: RelationMode::Delete,
            cascades_into: None,
        }
    }

    const fn detach(name: &'static str, collection: Collection, foreign_key: &'static str) -> Self {
        Self { name, collection, foreign_key, scope: None, mode: RelationMode::Detach, cascades_into: None }
    }

    pub fn filter_for(&self, parent: Uuid) -> Filter {
        let filter = Filter::new().eq_id(self.foreign_key, parent);
        match self.scope {
            Some((field, value)) => filter.eq(field, value),
            None => filter,
        }
    }
}

const CUSTOMER_RELATIONS: &[Relation] = &[
    Relation::delete("addresses", Collection::Addresses, "customerId"),
    Relation::delete("contacts", Collection::Contacts, "customerId"),
    Relation::cascade("projects", Collection::Projects, "customerId", EntityKind::Project),
    Relation::delete("quotes", Collection::Quotes, "customerId"),
    Relation::cascade("tickets", Collection::Tickets, "customerId", EntityKind::Ticket),
    Relation::cascade("tasks", Collection::Tasks, "customerId", EntityKind::Task),
];

const PROJECT_RELATIONS: &[Relation] = &[
    Relation::cascade("tasks", Collection::Tasks, "projectId", EntityKind::Task),
    Relation::cascade("tickets", Collection::Tickets, "projectId", EntityKind::Ticket),
    Relation::delete("quotes", Collection::Quotes, "projectId"),
];

const TASK_RELATIONS: &[Relation] = &[
    Relation::comments("task"),
    Relation::cascade("subtasks", Collection::Tasks, "parentTaskId", EntityKind::Subtask),
];

const SUBTASK_RELATIONS: &[Relation] = &[Relation::comments("task")];

const TICKET_RELATIONS: &[Relation] = &[Relation::comments("ticket")];

// Authorship on comments is history and stays untouched.
const USER_RELATIONS: &[Relation] = &[
    Relation::detach("tasks.assignee", Collection::Tasks, "assigneeId"),
    Relation::detach("projects.assignee", Collection::Projects, "assigneeId"),
    Relation::detach("tickets.assignee", Collection::Tickets, "assigneeId"),
];

pub fn relations_of(kind: EntityKind) -> &'static [Relation] {
    match kind {
        EntityKind::Customer => CUSTOMER_RELATIONS,
        EntityKind::Project => PROJECT_RELATIONS,
        EntityKind::Task => TASK_RELATIONS,
        EntityKind::Subtask => SUBTASK_RELATIONS,
        EntityKind::Ticket => TICKET_RELATIONS,
        EntityKind::User => USER_RELATIONS,
        EntityKind::Comment => &[],
    }
}

// =========================================================================
//  RESULTS & ERRORS
// =========================================================================

#[derive(Debug, Clone)]
pub struct DeletionRequest {
    pub kind: EntityKind,
    pub id: Uuid,
    pub actor: Actor,
    /// Defaults to the GDPR reason.
    pub reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub root_deleted_count: u64,
    /// Keyed by relation path, e.g. `projects.tasks.comments`.
    pub per_relation_counts: BTreeMap<String, u64>,
}

#[derive(Debug)]
pub struct RelationFailure {
    pub relation: String,
    pub error: StoreError,
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("looking up {kind} {id} failed: {source}")]
    Lookup {
        kind: EntityKind,
        id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("audit entry could not be written: {0}")]
    Audit(#[source] StoreError),

    #[error("{} relation operation(s) failed ({}); root left in place", failures.len(), describe(failures))]
    Relations {
        failures: Vec<RelationFailure>,
        completed: BTreeMap<String, u64>,
    },

    #[error("root delete failed: {0}")]
    Root(#[source] StoreError),
}

fn describe(failures: &[RelationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.relation, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Counts and failures collected while walking the relation table.
#[derive(Debug, Default)]
struct Tally {
    counts: BTreeMap<String, u64>,
    failures: Vec<RelationFailure>,
}

impl Tally {
    fn add(&mut self, path: &str, n: u64) {
        *self.counts.entry(path.to_string()).or_default() += n;
    }

    fn fail(&mut self, path: &str, error: StoreError) {
        self.failures.push(RelationFailure { relation: path.to_string(), error });
    }

    fn merge(mut self, other: Tally) -> Tally {
        for (path, n) in other.counts {
            *self.counts.entry(path).or_default() += n;
        }
        self.failures.extend(other.failures);
        self
    }
}

fn relation_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn snapshot(kind: EntityKind, root: &Document) -> Value {
    let fields: Map<String, Value> = kind
        .snapshot_fields()
        .iter()
        .filter_map(|f| root.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect();
    Value::Object(fields)
}

// =========================================================================
//  EXECUTOR
// =========================================================================

#[derive(Clone)]
pub struct CascadeDeleter {
    store: Arc<dyn DocumentStore>,
    audit: AuditService,
}

impl CascadeDeleter {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditService) -> Self {
        Self { store, audit }
    }

    pub async fn delete(&self, request: DeletionRequest) -> Result<CascadeReport, CascadeError> {
        let DeletionRequest { kind, id, actor, reason } = request;

        // 1. The root must exist; nothing is audited for a delete that never happens.
        let (collection, root) = self
            .locate(kind, id)
            .await?
            .ok_or(CascadeError::NotFound { kind, id })?;

        // 2. Audit before any mutation.
        let details = json!({
            "reason": reason.unwrap_or(GDPR_REASON),
            "snapshot": snapshot(kind, &root),
        });
        self.audit
            .record(&actor, kind.delete_action(), kind.entity_type(), &id.to_string(), details)
            .await
            .map_err(CascadeError::Audit)?;

        // 3. Dependents.
        let tally = self.cascade(kind, id, String::new()).await;
        if !tally.failures.is_empty() {
            let error = CascadeError::Relations { failures: tally.failures, completed: tally.counts };
            tracing::error!("cascading delete of {} {} aborted: {}", kind, id, error);
            return Err(error);
        }

        // 4. Root last.
        let root_deleted_count = self
            .store
            .delete_by_id(collection, id)
            .await
            .map_err(CascadeError::Root)?;

        if root_deleted_count == 0 {
            tracing::warn!("{} {} was removed concurrently before its own delete", kind, id);
        }
        tracing::info!(
            "deleted {} {} by {} ({} dependent operations)",
            kind,
            id,
            actor.email,
            tally.counts.len()
        );

        Ok(CascadeReport { root_deleted_count, per_relation_counts: tally.counts })
    }

    async fn locate(&self, kind: EntityKind, id: Uuid) -> Result<Option<(Collection, Document)>, CascadeError> {
        for collection in kind.root_collections() {
            let found = self
                .store
                .find_by_id(*collection, id)
                .await
                .map_err(|source| CascadeError::Lookup { kind, id, source })?;
            if let Some(doc) = found {
                return Ok(Some((*collection, doc)));
            }
        }
        Ok(None)
    }

    /// Runs every relation of `kind` for one record, siblings concurrently.
    fn cascade(&self, kind: EntityKind, id: Uuid, prefix: String) -> BoxFuture<'_, Tally> {
        async move {
            let operations = relations_of(kind)
                .iter()
                .map(|relation| self.apply(relation, id, relation_path(&prefix, relation.name)));

            join_all(operations)
                .await
                .into_iter()
                .fold(Tally::default(), Tally::merge)
        }
        .boxed()
    }

    async fn apply(&self, relation: &'static Relation, parent: Uuid, path: String) -> Tally {
        let mut tally = Tally::default();
        let filter = relation.filter_for(parent);

        let result = match (relation.mode, relation.cascades_into) {
            (RelationMode::Delete, Some(child_kind)) => {
                let children = match self.store.find(relation.collection, &FindQuery::filter(filter)).await {
                    Ok(docs) => docs,
                    Err(e) => {
                        tally.fail(&path, e);
                        return tally;
                    }
                };
                let ids: Vec<Uuid> = children.iter().filter_map(document_id).collect();

                let nested = join_all(ids.iter().map(|child| self.cascade(child_kind, *child, path.clone()))).await;
                tally = nested.into_iter().fold(tally, Tally::merge);

                // A dependent whose own dependents failed stays, like the root does.
                if !tally.failures.is_empty() {
                    return tally;
                }
                if ids.is_empty() {
                    Ok(0)
                } else {
                    let processed = Filter::new().any_of("id", ids.iter().map(Uuid::to_string).collect());
                    self.store.delete_many(relation.collection, &processed).await
                }
            }
            (RelationMode::Delete, None) => self.store.delete_many(relation.collection, &filter).await,
            (RelationMode::Detach, _) => {
                let patch = Patch::default()
                    .unset(relation.foreign_key)
                    .set("updatedAt", now_value());
                self.store.update_many(relation.collection, &filter, &patch).await
            }
        };

        match result {
            Ok(n) => tally.add(&path, n),
            Err(e) => tally.fail(&path, e),
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_relations_only_detach() {
        let relations = relations_of(EntityKind::User);
        assert_eq!(relations.len(), 3);
        assert!(relations.iter().all(|r| r.mode == RelationMode::Detach && r.foreign_key == "assigneeId"));
        assert!(relations.iter().all(|r| r.collection != Collection::Comments));
    }

    #[test]
    fn customer_owns_six_relations() {
        let names: Vec<_> = relations_of(EntityKind::Customer).iter().map(|r| r.name).collect();
        assert_eq!(names, ["addresses", "contacts", "projects", "quotes", "tickets", "tasks"]);
        assert!(relations_of(EntityKind::Customer)
            .iter()
            .all(|r| r.mode == RelationMode::Delete && r.foreign_key == "customerId"));
    }

    #[test]
    fn subtasks_do_not_nest() {
        assert!(relations_of(EntityKind::Subtask).iter().all(|r| r.cascades_into.is_none()));
        assert!(relations_of(EntityKind::Comment).is_empty());
    }

    #[test]
    fn audit_log_is_never_a_dependent() {
        for kind in [
            EntityKind::Customer,
            EntityKind::Project,
            EntityKind::Task,
            EntityKind::Subtask,
            EntityKind::Ticket,
            EntityKind::User,
        ] {
            assert!(relations_of(kind).iter().all(|r| r.collection != Collection::AuditLogs));
        }
    }

    #[test]
    fn comment_relations_are_scoped_by_owner_type() {
        let parent = Uuid::new_v4();
        let filter = relations_of(EntityKind::Ticket)[0].filter_for(parent);
        let mut comment = Map::new();
        comment.insert("entityId".into(), json!(parent.to_string()));
        comment.insert("entityType".into(), json!("task"));
        assert!(!filter.matches(&comment));

        comment.insert("entityType".into(), json!("ticket"));
        assert!(filter.matches(&comment));
    }

    #[test]
    fn snapshot_keeps_only_identifying_fields() {
        let mut root = Map::new();
        root.insert("email".into(), json!("anna@servecta.de"));
        root.insert("passwordHash".into(), json!("$2b$..."));
        let snap = snapshot(EntityKind::User, &root);
        assert_eq!(snap, json!({ "email": "anna@servecta.de" }));
    }

    #[test]
    fn subtask_deletes_are_audited_as_tasks() {
        assert_eq!(EntityKind::Subtask.entity_type(), "task");
        assert_eq!(EntityKind::Subtask.delete_action(), "DELETE_TASK");
        assert_eq!(relation_path("projects", "tasks"), "projects.tasks");
        assert_eq!(relation_path("", "tasks"), "tasks");
    }
}
