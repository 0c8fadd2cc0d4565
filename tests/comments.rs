mod common;

use common::{actor_for, test_app};
use uuid::Uuid;

use servecta_portal::{
    common::error::AppError,
    db::collection::Collection,
    models::{auth::Role, comment::CommentTarget},
    services::cascade::{MODERATED_COMMENT_REASON, OWN_COMMENT_REASON},
};

#[tokio::test]
async fn staff_member_cannot_delete_someone_elses_comment() {
    let app = test_app();
    let author = app.staff(Role::Mitarbeiter, "autor@servecta.de");
    let colleague = app.staff(Role::Mitarbeiter, "kollege@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let task = app.task(("customerId", customer), None, author.id);
    let comment = app.comment("task", task, &author);

    let err = app
        .state
        .comment_service
        .delete(CommentTarget::Task, task, comment, &colleague, actor_for(&colleague))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden));
    assert!(app.store.get(Collection::Comments, comment).is_some());
    assert!(app.audit_entries().is_empty());
}

#[tokio::test]
async fn author_deletes_own_comment() {
    let app = test_app();
    let author = app.staff(Role::Mitarbeiter, "autor@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let task = app.task(("customerId", customer), None, author.id);
    let comment = app.comment("task", task, &author);

    let report = app
        .state
        .comment_service
        .delete(CommentTarget::Task, task, comment, &author, actor_for(&author))
        .await
        .unwrap();

    assert_eq!(report.root_deleted_count, 1);
    assert!(app.store.get(Collection::Comments, comment).is_none());

    let entries = app.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "DELETE_COMMENT");
    assert_eq!(entries[0]["details"]["reason"], OWN_COMMENT_REASON);
}

#[tokio::test]
async fn manager_moderates_a_ticket_comment() {
    let app = test_app();
    let manager = app.staff(Role::Manager, "leitung@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let consumer = app.consumer(customer, "kunde@mueller.de");
    let ticket = app.ticket(Some(customer), None, consumer.id);
    let comment = app.comment("ticket", ticket, &consumer);

    app.state
        .comment_service
        .delete(CommentTarget::Ticket, ticket, comment, &manager, actor_for(&manager))
        .await
        .unwrap();

    assert!(app.store.get(Collection::Comments, comment).is_none());
    let entries = app.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["userId"], manager.id.to_string());
    assert_eq!(entries[0]["details"]["reason"], MODERATED_COMMENT_REASON);
}

#[tokio::test]
async fn comment_on_another_owner_reads_as_not_found() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let customer = app.customer("Müller Haustechnik GmbH");
    let task = app.task(("customerId", customer), None, admin.id);
    let other_task = app.task(("customerId", customer), None, admin.id);
    let comment = app.comment("task", other_task, &admin);

    let err = app
        .state
        .comment_service
        .delete(CommentTarget::Task, task, comment, &admin, actor_for(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("comment")));

    // Right id, wrong owner type.
    let err = app
        .state
        .comment_service
        .delete(CommentTarget::Ticket, other_task, comment, &admin, actor_for(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("comment")));

    let err = app
        .state
        .comment_service
        .delete(CommentTarget::Task, task, Uuid::new_v4(), &admin, actor_for(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("comment")));

    assert!(app.store.get(Collection::Comments, comment).is_some());
    assert!(app.audit_entries().is_empty());
}

#[tokio::test]
async fn consumers_only_reach_their_own_tickets() {
    let app = test_app();
    let admin = app.staff(Role::Admin, "admin@servecta.de");
    let mine = app.customer("Müller Haustechnik GmbH");
    let theirs = app.customer("Schmidt Bau KG");
    let consumer = app.consumer(mine, "kunde@mueller.de");

    let own_ticket = app.ticket(Some(mine), None, consumer.id);
    let foreign_ticket = app.ticket(Some(theirs), None, admin.id);
    let task = app.task(("customerId", mine), None, admin.id);

    let comments = &app.state.comment_service;
    assert!(comments.authorize_owner(CommentTarget::Ticket, own_ticket, &consumer).await.is_ok());
    assert!(matches!(
        comments.authorize_owner(CommentTarget::Ticket, foreign_ticket, &consumer).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        comments.authorize_owner(CommentTarget::Task, task, &consumer).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        comments.authorize_owner(CommentTarget::Task, Uuid::new_v4(), &admin).await,
        Err(AppError::NotFound("task"))
    ));
}
