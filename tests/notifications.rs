mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use common::{actor_for, test_app, TestApp};
use serde_json::json;
use uuid::Uuid;

use servecta_portal::{common::error::AppError, db::collection::Collection, models::auth::Role};

fn due_task(app: &TestApp, assignee: Uuid, due_in: Duration, status: &str) -> Uuid {
    let id = Uuid::new_v4();
    app.store.put(
        Collection::Tasks,
        json!({
            "id": id.to_string(),
            "title": "Filter tauschen",
            "status": status,
            "priority": "HIGH",
            "assigneeId": assignee.to_string(),
            "dueDate": Utc::now() + due_in,
            "createdById": assignee.to_string(),
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        }),
    );
    id
}

#[tokio::test]
async fn sweep_notifies_due_tasks_once() {
    let app = test_app();
    let worker = app.staff(Role::Mitarbeiter, "monteur@servecta.de");

    let soon = due_task(&app, worker.id, Duration::hours(2), "TODO");
    due_task(&app, worker.id, Duration::days(10), "TODO");
    due_task(&app, worker.id, Duration::hours(1), "DONE");

    let report = app.state.notification_service.run_deadline_sweep().await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(report.failed, 0);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "monteur@servecta.de");

    let task = app.store.get(Collection::Tasks, soon).unwrap();
    assert!(task.get("deadlineNotifiedAt").is_some());
    assert_eq!(app.store.all(Collection::Notifications).len(), 1);

    let again = app.state.notification_service.run_deadline_sweep().await.unwrap();
    assert_eq!(again.checked, 0);
    assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn failed_mail_leaves_task_for_the_next_sweep() {
    let app = test_app();
    let worker = app.staff(Role::Mitarbeiter, "monteur@servecta.de");
    let task = due_task(&app, worker.id, Duration::hours(3), "IN_PROGRESS");
    app.mailer.fail();

    let report = app.state.notification_service.run_deadline_sweep().await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(report.failed, 1);

    let doc = app.store.get(Collection::Tasks, task).unwrap();
    assert!(doc.get("deadlineNotifiedAt").is_none());
    assert!(app.store.all(Collection::Notifications).is_empty());
}

#[tokio::test]
async fn disabled_sweep_does_nothing() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    due_task(&app, admin.id, Duration::hours(1), "TODO");

    let payload = serde_json::from_value(json!({ "deadlineNotificationsEnabled": false })).unwrap();
    app.state
        .settings_service
        .update(payload, &actor_for(&admin))
        .await
        .unwrap();

    let report = app.state.notification_service.run_deadline_sweep().await.unwrap();
    assert_eq!(report.checked, 0);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn staff_change_to_a_consumer_ticket_mails_the_creator() {
    let app = test_app();
    let manager = app.staff(Role::Manager, "leitung@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let consumer = app.consumer(customer, "kunde@mueller.de");
    let ticket = app.ticket(Some(customer), None, consumer.id);

    let payload = serde_json::from_value(json!({ "status": "IN_PROGRESS" })).unwrap();
    app.state
        .ticket_service
        .update(ticket, payload, &manager, &actor_for(&manager))
        .await
        .unwrap();

    // The notice goes out on a spawned task.
    for _ in 0..50 {
        if !app.mailer.sent().is_empty() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "kunde@mueller.de");
}

#[tokio::test]
async fn creator_editing_own_ticket_sends_nothing() {
    let app = test_app();
    let customer = app.customer("Müller Haustechnik GmbH");
    let consumer = app.consumer(customer, "kunde@mueller.de");
    let ticket = app.ticket(Some(customer), None, consumer.id);

    let payload = serde_json::from_value(json!({ "title": "Heizung wieder kalt" })).unwrap();
    app.state
        .ticket_service
        .update(ticket, payload, &consumer, &actor_for(&consumer))
        .await
        .unwrap();

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn mark_read_rejects_someone_elses_notification() {
    let app = test_app();
    let owner = app.staff(Role::Mitarbeiter, "monteur@servecta.de");
    let other = app.staff(Role::Mitarbeiter, "azubi@servecta.de");
    let id = app.notification(owner.id);

    let err = app
        .state
        .notification_service
        .mark_read(other.id, id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("notification")));
    assert_eq!(app.store.get(Collection::Notifications, id).unwrap()["read"], false);

    let missing = app
        .state
        .notification_service
        .mark_read(owner.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound("notification")));

    let read = app.state.notification_service.mark_read(owner.id, id).await.unwrap();
    assert!(read.read);
}
