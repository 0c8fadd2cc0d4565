mod common;

use common::{actor_for, test_app, Op};
use uuid::Uuid;

use servecta_portal::{
    db::collection::Collection,
    models::auth::Role,
    services::cascade::{CascadeError, DeletionRequest, EntityKind, GDPR_REASON},
};

fn request(kind: EntityKind, id: Uuid, actor: servecta_portal::models::audit::Actor) -> DeletionRequest {
    DeletionRequest { kind, id, actor, reason: None }
}

#[tokio::test]
async fn customer_delete_walks_the_whole_chain() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");

    let customer = app.customer("Müller Haustechnik GmbH");
    let address = app.child(Collection::Addresses, customer);
    let contact = app.child(Collection::Contacts, customer);
    let project = app.project(customer, None);
    let task = app.task(("projectId", project), None, admin.id);
    let comment = app.comment("task", task, &admin);

    // Unrelated records survive.
    let other = app.customer("Schmidt Bau KG");
    let other_project = app.project(other, None);
    let other_task = app.task(("projectId", other_project), None, admin.id);
    let other_comment = app.comment("task", other_task, &admin);

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::Customer, customer, actor_for(&admin)))
        .await
        .unwrap();

    assert_eq!(report.root_deleted_count, 1);
    assert_eq!(report.per_relation_counts["addresses"], 1);
    assert_eq!(report.per_relation_counts["contacts"], 1);
    assert_eq!(report.per_relation_counts["projects"], 1);
    assert_eq!(report.per_relation_counts["projects.tasks"], 1);
    assert_eq!(report.per_relation_counts["projects.tasks.comments"], 1);

    assert!(app.store.get(Collection::Customers, customer).is_none());
    assert!(app.store.get(Collection::Addresses, address).is_none());
    assert!(app.store.get(Collection::Contacts, contact).is_none());
    assert!(app.store.get(Collection::Projects, project).is_none());
    assert!(app.store.get(Collection::Tasks, task).is_none());
    assert!(app.store.get(Collection::Comments, comment).is_none());

    assert!(app.store.get(Collection::Customers, other).is_some());
    assert!(app.store.get(Collection::Projects, other_project).is_some());
    assert!(app.store.get(Collection::Tasks, other_task).is_some());
    assert!(app.store.get(Collection::Comments, other_comment).is_some());
}

#[tokio::test]
async fn exactly_one_audit_entry_describes_the_deletion() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    app.project(customer, None);

    app.state
        .cascade
        .delete(request(EntityKind::Customer, customer, actor_for(&admin)))
        .await
        .unwrap();

    let entries = app.audit_entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["action"], "DELETE_CUSTOMER");
    assert_eq!(entry["entityType"], "customer");
    assert_eq!(entry["entityId"], customer.to_string());
    assert_eq!(entry["userId"], admin.id.to_string());
    assert_eq!(entry["userEmail"], "admin@servecta.de");
    assert_eq!(entry["ipAddress"], "203.0.113.7");
    assert_eq!(entry["details"]["reason"], GDPR_REASON);
    assert_eq!(entry["details"]["snapshot"]["legalName"], "Müller Haustechnik GmbH");
}

#[tokio::test]
async fn missing_root_is_not_found_and_leaves_no_trace() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let missing = Uuid::new_v4();

    let err = app
        .state
        .cascade
        .delete(request(EntityKind::Project, missing, actor_for(&admin)))
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::NotFound { kind: EntityKind::Project, id } if id == missing));
    assert!(app.audit_entries().is_empty());
}

#[tokio::test]
async fn second_delete_of_the_same_root_is_not_found() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let ticket = app.ticket(Some(customer), None, admin.id);

    let first = app
        .state
        .cascade
        .delete(request(EntityKind::Ticket, ticket, actor_for(&admin)))
        .await;
    assert!(first.is_ok());

    let second = app
        .state
        .cascade
        .delete(request(EntityKind::Ticket, ticket, actor_for(&admin)))
        .await;
    assert!(matches!(second, Err(CascadeError::NotFound { .. })));
    assert_eq!(app.audit_entries().len(), 1);
}

#[tokio::test]
async fn user_delete_detaches_assignments_and_keeps_comments() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let worker = app.staff(Role::Mitarbeiter, "monteur@servecta.de");

    let customer = app.customer("Müller Haustechnik GmbH");
    let project = app.project(customer, Some(worker.id));
    let task = app.task(("projectId", project), Some(worker.id), admin.id);
    let ticket = app.ticket(Some(customer), None, admin.id);
    let comment = app.comment("task", task, &worker);

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::User, worker.id, actor_for(&admin)))
        .await
        .unwrap();

    assert_eq!(report.root_deleted_count, 1);
    assert_eq!(report.per_relation_counts["tasks.assignee"], 1);
    assert_eq!(report.per_relation_counts["projects.assignee"], 1);
    assert_eq!(report.per_relation_counts["tickets.assignee"], 0);

    assert!(app.store.get(Collection::Staff, worker.id).is_none());

    let task_doc = app.store.get(Collection::Tasks, task).unwrap();
    assert!(task_doc.get("assigneeId").is_none());
    let project_doc = app.store.get(Collection::Projects, project).unwrap();
    assert!(project_doc.get("assigneeId").is_none());
    assert!(app.store.get(Collection::Tickets, ticket).is_some());
    assert!(app.store.get(Collection::Comments, comment).is_some());

    let entries = app.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "DELETE_USER");
    assert_eq!(entries[0]["entityType"], "user");
}

#[tokio::test]
async fn consumer_accounts_are_found_in_their_own_collection() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let consumer = app.consumer(customer, "kunde@mueller.de");

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::User, consumer.id, actor_for(&admin)))
        .await
        .unwrap();

    assert_eq!(report.root_deleted_count, 1);
    assert!(app.store.get(Collection::Consumers, consumer.id).is_none());
    assert!(app.store.get(Collection::Customers, customer).is_some());
}

#[tokio::test]
async fn task_delete_takes_subtasks_and_their_comments() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let task = app.task(("customerId", customer), None, admin.id);
    let subtask = app.task(("parentTaskId", task), None, admin.id);
    let sub_comment = app.comment("task", subtask, &admin);
    let ticket = app.ticket(Some(customer), None, admin.id);
    // Same id space, different owner type: must survive.
    let ticket_comment = app.comment("ticket", ticket, &admin);

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::Task, task, actor_for(&admin)))
        .await
        .unwrap();

    assert_eq!(report.per_relation_counts["subtasks"], 1);
    assert_eq!(report.per_relation_counts["subtasks.comments"], 1);
    assert_eq!(report.per_relation_counts["comments"], 0);
    assert!(app.store.get(Collection::Tasks, subtask).is_none());
    assert!(app.store.get(Collection::Comments, sub_comment).is_none());
    assert!(app.store.get(Collection::Comments, ticket_comment).is_some());
}

#[tokio::test]
async fn relation_failure_keeps_the_root_and_reports_completed_work() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let address = app.child(Collection::Addresses, customer);
    app.child(Collection::Quotes, customer);

    app.store.fail_on(Collection::Quotes, Op::DeleteMany);

    let err = app
        .state
        .cascade
        .delete(request(EntityKind::Customer, customer, actor_for(&admin)))
        .await
        .unwrap_err();

    match err {
        CascadeError::Relations { failures, completed } => {
            assert!(failures.iter().any(|f| f.relation == "quotes"));
            assert_eq!(completed["addresses"], 1);
        }
        other => panic!("expected relation failure, got {other:?}"),
    }

    assert!(app.store.get(Collection::Customers, customer).is_some());
    assert!(app.store.get(Collection::Addresses, address).is_none());
    // Attempted, so audited.
    assert_eq!(app.audit_entries().len(), 1);
}

#[tokio::test]
async fn audit_failure_aborts_before_any_mutation() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let address = app.child(Collection::Addresses, customer);

    app.store.fail_on(Collection::AuditLogs, Op::Insert);

    let err = app
        .state
        .cascade
        .delete(request(EntityKind::Customer, customer, actor_for(&admin)))
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::Audit(_)));
    assert!(app.store.get(Collection::Customers, customer).is_some());
    assert!(app.store.get(Collection::Addresses, address).is_some());
}

#[tokio::test]
async fn lookup_failure_surfaces_as_lookup_error() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    app.store.fail_on(Collection::Projects, Op::FindById);

    let err = app
        .state
        .cascade
        .delete(request(EntityKind::Project, Uuid::new_v4(), actor_for(&admin)))
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::Lookup { kind: EntityKind::Project, .. }));
    assert!(app.audit_entries().is_empty());
}

#[tokio::test]
async fn project_delete_removes_its_tasks_tickets_and_quotes() {
    let app = test_app();
    let manager = app.staff(Role::Manager, "leitung@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let project = app.project(customer, None);
    let sibling = app.project(customer, None);

    let task = app.task(("projectId", project), None, manager.id);
    let task_comment = app.comment("task", task, &manager);
    let ticket = app.ticket(Some(customer), Some(project), manager.id);
    let ticket_comment = app.comment("ticket", ticket, &manager);
    let quote = app.store.put(
        Collection::Quotes,
        serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "customerId": customer.to_string(),
            "projectId": project.to_string(),
        }),
    );

    let sibling_task = app.task(("projectId", sibling), None, manager.id);
    let customer_ticket = app.ticket(Some(customer), None, manager.id);

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::Project, project, actor_for(&manager)))
        .await
        .unwrap();

    assert_eq!(report.root_deleted_count, 1);
    assert_eq!(report.per_relation_counts["tasks"], 1);
    assert_eq!(report.per_relation_counts["tasks.comments"], 1);
    assert_eq!(report.per_relation_counts["tickets"], 1);
    assert_eq!(report.per_relation_counts["tickets.comments"], 1);
    assert_eq!(report.per_relation_counts["quotes"], 1);

    for (collection, id) in [
        (Collection::Projects, project),
        (Collection::Tasks, task),
        (Collection::Comments, task_comment),
        (Collection::Tickets, ticket),
        (Collection::Comments, ticket_comment),
        (Collection::Quotes, quote),
    ] {
        assert!(app.store.get(collection, id).is_none(), "{collection} {id} survived");
    }

    assert!(app.store.get(Collection::Customers, customer).is_some());
    assert!(app.store.get(Collection::Projects, sibling).is_some());
    assert!(app.store.get(Collection::Tasks, sibling_task).is_some());
    assert!(app.store.get(Collection::Tickets, customer_ticket).is_some());

    let entries = app.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "DELETE_PROJECT");
    assert_eq!(entries[0]["entityType"], "project");
    assert_eq!(entries[0]["entityId"], project.to_string());
}

#[tokio::test]
async fn customer_delete_removes_ticket_comments() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let consumer = app.consumer(customer, "kunde@mueller.de");
    let ticket = app.ticket(Some(customer), None, consumer.id);
    let comment = app.comment("ticket", ticket, &consumer);

    let report = app
        .state
        .cascade
        .delete(request(EntityKind::Customer, customer, actor_for(&admin)))
        .await
        .unwrap();

    assert_eq!(report.per_relation_counts["tickets"], 1);
    assert_eq!(report.per_relation_counts["tickets.comments"], 1);
    assert!(app.store.get(Collection::Tickets, ticket).is_none());
    assert!(app.store.get(Collection::Comments, comment).is_none());
    // Accounts are not owned by the customer record.
    assert!(app.store.get(Collection::Consumers, consumer.id).is_some());
}
