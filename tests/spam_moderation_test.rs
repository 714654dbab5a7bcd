/// Integration tests for spam flagging and review
mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{entity::*, query::*, PaginatorTrait};
use servicedesk::constants::SPAM_CONFIRMED_NOTICE;
use servicedesk::orm::spam_flags::{self, ModerationStatus};
use servicedesk::orm::ticket_messages;
use servicedesk::orm::tickets::TicketStatus;
use servicedesk::DeskError;

async fn messages_for(db: &sea_orm::DatabaseConnection, ticket_id: i32) -> Vec<ticket_messages::Model> {
    ticket_messages::Entity::find()
        .filter(ticket_messages::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_messages::Column::Id)
        .all(db)
        .await
        .expect("query failed")
}

#[actix_rt::test]
#[serial]
async fn test_approve_posts_one_public_notice() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();
    let boss = create_super_staff(&db, "boss").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let flag = desk
        .flag_spam(staff.id, ticket.id, "  repeated advertising  ")
        .await
        .expect("flag should succeed");
    assert_eq!(flag.reason, "repeated advertising");
    assert_eq!(flag.status, ModerationStatus::Pending);
    assert_eq!(flag.flagged_by_id, staff.id);
    assert_eq!(reload_ticket(&db, ticket.id).await.status, TicketStatus::SpamPending);

    desk.review_spam(boss.id, ticket.id, "approve")
        .await
        .expect("review should succeed");

    assert_eq!(
        reload_ticket(&db, ticket.id).await.status,
        TicketStatus::SpamConfirmed
    );

    let stored = spam_flags::Entity::find()
        .filter(spam_flags::Column::TicketId.eq(ticket.id))
        .one(&db)
        .await
        .unwrap()
        .expect("flag row should exist");
    assert_eq!(stored.status, ModerationStatus::Confirmed);
    assert_eq!(stored.reviewed_by_id, Some(boss.id));
    assert!(stored.reviewed_at.is_some());

    let thread = messages_for(&db, ticket.id).await;
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].body, SPAM_CONFIRMED_NOTICE);
    assert_eq!(thread[0].sender_id, boss.id);
    assert!(!thread[0].is_internal_note);

    // The requester can read the notice.
    let visible = desk
        .list_messages(student.id, ticket.id, Default::default())
        .await
        .unwrap();
    assert_eq!(visible.total, 1);

    assert_eq!(
        audit_actions(&db, ticket.id).await,
        vec!["ticket.spam_flag", "ticket.spam_review"]
    );

    // A second review finds nothing pending.
    let again = desk.review_spam(boss.id, ticket.id, "approve").await;
    assert!(matches!(again, Err(DeskError::InvalidState(_))));
    assert_eq!(messages_for(&db, ticket.id).await.len(), 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_reject_posts_nothing_and_allows_reflag() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();
    let boss = create_super_staff(&db, "boss").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.flag_spam(staff.id, ticket.id, "looks fake").await.unwrap();
    desk.review_spam(boss.id, ticket.id, " Reject ").await.unwrap();

    assert_eq!(
        reload_ticket(&db, ticket.id).await.status,
        TicketStatus::SpamRejected
    );
    assert!(messages_for(&db, ticket.id).await.is_empty());

    let reflag = desk
        .flag_spam(staff.id, ticket.id, "now it is spam")
        .await
        .expect("rejected ticket can be flagged again");
    assert_eq!(reflag.status, ModerationStatus::Pending);
    assert_eq!(reflag.reason, "now it is spam");
    assert_eq!(reflag.reviewed_by_id, None);

    let rows = spam_flags::Entity::find()
        .filter(spam_flags::Column::TicketId.eq(ticket.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_flag_clears_assignee_and_rejects_duplicates() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();
    let other = create_staff(&db, "other").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff.id, ticket.id).await.unwrap();
    desk.flag_spam(other.id, ticket.id, "spam").await.unwrap();

    let stored = reload_ticket(&db, ticket.id).await;
    assert_eq!(stored.status, TicketStatus::SpamPending);
    assert_eq!(stored.assigned_staff_id, None);
    assert_eq!(stored.claimed_at, None);

    let duplicate = desk.flag_spam(staff.id, ticket.id, "spam again").await;
    assert!(matches!(duplicate, Err(DeskError::Conflict(_))), "got {:?}", duplicate);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_moderation_permissions_and_input() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let blank = desk.flag_spam(staff.id, ticket.id, "   ").await;
    assert!(matches!(blank, Err(DeskError::Validation { .. })));

    let by_requester = desk.flag_spam(student.id, ticket.id, "spam").await;
    assert!(matches!(by_requester, Err(DeskError::Forbidden(_))));

    desk.flag_spam(staff.id, ticket.id, "spam").await.unwrap();

    let by_staff = desk.review_spam(staff.id, ticket.id, "approve").await;
    assert!(matches!(by_staff, Err(DeskError::Forbidden(_))));

    let bad_action = desk.review_spam(staff.id, ticket.id, "delete").await;
    assert!(matches!(bad_action, Err(DeskError::Validation { .. })));

    assert_eq!(
        reload_ticket(&db, ticket.id).await.status,
        TicketStatus::SpamPending
    );
    assert_eq!(audit_actions(&db, ticket.id).await, vec!["ticket.spam_flag"]);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_review_requires_pending_ticket() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let boss = create_super_staff(&db, "boss").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let result = desk.review_spam(boss.id, ticket.id, "reject").await;
    assert!(matches!(result, Err(DeskError::InvalidState(_))));
    assert_eq!(reload_ticket(&db, ticket.id).await.status, TicketStatus::New);
    assert!(audit_actions(&db, ticket.id).await.is_empty());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
