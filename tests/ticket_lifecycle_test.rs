/// Integration tests for the claim / unclaim / resolve / close state machine
mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use futures::future::join_all;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use servicedesk::orm::ratings;
use servicedesk::orm::tickets::{self, TicketStatus};
use servicedesk::tickets::NewRating;
use servicedesk::DeskError;

#[actix_rt::test]
#[serial]
async fn test_create_ticket_starts_new() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();

    let ticket = desk
        .create_ticket(
            student.id,
            new_ticket("Broken lamp", "Hallway light is out", "Facilities"),
        )
        .await
        .expect("create should succeed");

    assert_eq!(ticket.status, TicketStatus::New);
    assert_eq!(ticket.title, "Broken lamp");
    assert_eq!(ticket.requester_id, student.id);
    assert!(ticket.image_ids.is_empty());
    assert!(ticket.assigned_staff_id.is_none());
    assert!(audit_actions(&db, ticket.id).await.is_empty());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_second_claimant_gets_conflict() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff_a = create_staff(&db, "staff_a").await.unwrap();
    let staff_b = create_staff(&db, "staff_b").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff_a.id, ticket.id)
        .await
        .expect("first claim should succeed");

    let stored = reload_ticket(&db, ticket.id).await;
    assert_eq!(stored.status, TicketStatus::Claimed);
    assert_eq!(stored.assigned_staff_id, Some(staff_a.id));
    assert!(stored.claimed_at.is_some());

    let second = desk.claim_ticket(staff_b.id, ticket.id).await;
    assert!(matches!(second, Err(DeskError::Conflict(_))), "got {:?}", second);

    assert_eq!(audit_actions(&db, ticket.id).await, vec!["ticket.claim"]);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_concurrent_claims_have_exactly_one_winner() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let mut staff_ids = Vec::new();
    for i in 0..6 {
        staff_ids.push(create_staff(&db, &format!("staff{}", i)).await.unwrap().id);
    }

    let results = join_all(
        staff_ids
            .iter()
            .map(|staff_id| desk.claim_ticket(*staff_id, ticket.id)),
    )
    .await;

    let winners: Vec<i32> = staff_ids
        .iter()
        .zip(&results)
        .filter(|(_, r)| r.is_ok())
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(winners.len(), 1, "results: {:?}", results);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(result, Err(DeskError::Conflict(_))), "got {:?}", result);
    }

    let stored = reload_ticket(&db, ticket.id).await;
    assert_eq!(stored.status, TicketStatus::Claimed);
    assert_eq!(stored.assigned_staff_id, Some(winners[0]));
    assert_eq!(audit_actions(&db, ticket.id).await.len(), 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_requester_cannot_claim() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let result = desk.claim_ticket(student.id, ticket.id).await;
    assert!(matches!(result, Err(DeskError::Forbidden(_))));

    let missing = desk.claim_ticket(student.id, 9999).await;
    assert!(matches!(missing, Err(DeskError::NotFound("ticket"))));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_unclaim_returns_ticket_to_queue() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff_a = create_staff(&db, "staff_a").await.unwrap();
    let staff_b = create_staff(&db, "staff_b").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff_a.id, ticket.id).await.unwrap();

    let by_other = desk.unclaim_ticket(staff_b.id, ticket.id).await;
    assert!(matches!(by_other, Err(DeskError::Forbidden(_))));

    desk.unclaim_ticket(staff_a.id, ticket.id)
        .await
        .expect("assignee can unclaim");

    let stored = reload_ticket(&db, ticket.id).await;
    assert_eq!(stored.status, TicketStatus::New);
    assert_eq!(stored.assigned_staff_id, None);
    assert_eq!(stored.claimed_at, None);

    // No longer the assignee, so still Forbidden rather than InvalidState.
    let again = desk.unclaim_ticket(staff_a.id, ticket.id).await;
    assert!(matches!(again, Err(DeskError::Forbidden(_))));

    // Back in the queue: anyone may claim it.
    desk.claim_ticket(staff_b.id, ticket.id).await.unwrap();

    assert_eq!(
        audit_actions(&db, ticket.id).await,
        vec!["ticket.claim", "ticket.unclaim", "ticket.claim"]
    );

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_resolve_close_and_rate_once() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff_a = create_staff(&db, "staff_a").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff_a.id, ticket.id).await.unwrap();

    let early_close = desk.close_ticket(staff_a.id, ticket.id).await;
    assert!(
        matches!(early_close, Err(DeskError::InvalidState(_))),
        "got {:?}",
        early_close
    );

    desk.resolve_ticket(staff_a.id, ticket.id).await.unwrap();
    let resolved = reload_ticket(&db, ticket.id).await;
    assert_eq!(resolved.status, TicketStatus::Resolved);
    assert_eq!(resolved.assigned_staff_id, Some(staff_a.id));
    assert_eq!(resolved.resolved_by_id, Some(staff_a.id));

    desk.close_ticket(staff_a.id, ticket.id).await.unwrap();
    let closed = reload_ticket(&db, ticket.id).await;
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.assigned_staff_id, None);

    let close_again = desk.close_ticket(staff_a.id, ticket.id).await;
    assert!(matches!(close_again, Err(DeskError::InvalidState(_))));

    let rating = desk
        .rate_ticket(
            student.id,
            ticket.id,
            NewRating {
                stars: 5,
                comment: Some("  Fixed within the hour  ".to_string()),
            },
        )
        .await
        .expect("first rating should succeed");
    assert_eq!(rating.stars, 5);
    assert_eq!(rating.comment.as_deref(), Some("Fixed within the hour"));

    let second = desk
        .rate_ticket(
            student.id,
            ticket.id,
            NewRating {
                stars: 4,
                comment: None,
            },
        )
        .await;
    assert!(matches!(second, Err(DeskError::AlreadyRated { .. })));

    assert_eq!(
        audit_actions(&db, ticket.id).await,
        vec!["ticket.claim", "ticket.resolve", "ticket.close"]
    );

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_concurrent_ratings_have_exactly_one_winner() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff.id, ticket.id).await.unwrap();
    desk.resolve_ticket(staff.id, ticket.id).await.unwrap();
    desk.close_ticket(staff.id, ticket.id).await.unwrap();

    let results = join_all((1..=5).map(|stars| {
        desk.rate_ticket(
            student.id,
            ticket.id,
            NewRating {
                stars,
                comment: None,
            },
        )
    }))
    .await;

    assert_eq!(
        results.iter().filter(|r| r.is_ok()).count(),
        1,
        "results: {:?}",
        results
    );
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(result, Err(DeskError::AlreadyRated { .. })),
            "got {:?}",
            result
        );
    }

    let stored = ratings::Entity::find()
        .filter(ratings::Column::TicketId.eq(ticket.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(stored, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_resolve_requires_assignee() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff_a = create_staff(&db, "staff_a").await.unwrap();
    let staff_b = create_staff(&db, "staff_b").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    let unclaimed = desk.resolve_ticket(staff_a.id, ticket.id).await;
    assert!(matches!(unclaimed, Err(DeskError::Forbidden(_))));

    desk.claim_ticket(staff_a.id, ticket.id).await.unwrap();
    let by_other = desk.resolve_ticket(staff_b.id, ticket.id).await;
    assert!(matches!(by_other, Err(DeskError::Forbidden(_))));

    // IN_PROGRESS counts as claimed for resolution.
    tickets::Entity::update_many()
        .col_expr(
            tickets::Column::Status,
            sea_orm::sea_query::Expr::value(TicketStatus::InProgress.to_value()),
        )
        .filter(tickets::Column::Id.eq(ticket.id))
        .exec(&db)
        .await
        .unwrap();
    desk.resolve_ticket(staff_a.id, ticket.id).await.unwrap();

    let again = desk.resolve_ticket(staff_a.id, ticket.id).await;
    assert!(matches!(again, Err(DeskError::InvalidState(_))));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_super_staff_can_close_any_resolved_ticket() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff_a = create_staff(&db, "staff_a").await.unwrap();
    let staff_b = create_staff(&db, "staff_b").await.unwrap();
    let boss = create_super_staff(&db, "boss").await.unwrap();
    let ticket = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff_a.id, ticket.id).await.unwrap();
    desk.resolve_ticket(staff_a.id, ticket.id).await.unwrap();

    let by_other = desk.close_ticket(staff_b.id, ticket.id).await;
    assert!(matches!(by_other, Err(DeskError::Forbidden(_))));

    desk.close_ticket(boss.id, ticket.id).await.unwrap();
    assert_eq!(reload_ticket(&db, ticket.id).await.status, TicketStatus::Closed);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_assignee_matches_status_after_every_transition() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let desk = desk(&db);
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();

    let first = open_ticket(&desk, student.id).await;
    let second = open_ticket(&desk, student.id).await;
    let third = open_ticket(&desk, student.id).await;

    desk.claim_ticket(staff.id, first.id).await.unwrap();
    desk.claim_ticket(staff.id, second.id).await.unwrap();
    desk.resolve_ticket(staff.id, second.id).await.unwrap();
    desk.claim_ticket(staff.id, third.id).await.unwrap();
    desk.flag_spam(staff.id, third.id, "advertising").await.unwrap();

    for ticket in tickets::Entity::find().all(&db).await.unwrap() {
        assert_eq!(
            ticket.assigned_staff_id.is_some(),
            ticket.status.holds_assignee(),
            "ticket {} in {}",
            ticket.id,
            ticket.status
        );
    }

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_lifecycle_notifications() {
    let db = setup_test_database().await.expect("Failed to setup test database");
    let recorder = std::sync::Arc::new(RecordingNotifier::default());
    let desk = servicedesk::tickets::TicketService::new(
        db.clone(),
        recorder.clone(),
        servicedesk::app_config::LimitsConfig::default(),
    );
    let student = create_requester(&db, "student").await.unwrap();
    let staff = create_staff(&db, "staff").await.unwrap();

    let ticket = open_ticket(&desk, student.id).await;
    desk.claim_ticket(staff.id, ticket.id).await.unwrap();
    desk.resolve_ticket(staff.id, ticket.id).await.unwrap();
    desk.close_ticket(staff.id, ticket.id).await.unwrap();
    desk.rate_ticket(
        student.id,
        ticket.id,
        NewRating {
            stars: 4,
            comment: None,
        },
    )
    .await
    .unwrap();
    settle().await;

    let mut events = recorder.take();
    events.sort();
    let mut expected = vec![
        "ticket_created:staff".to_string(),
        format!("ticket_claimed:{}", student.id),
        format!("ticket_resolved:{}", student.id),
        // Assignee is cleared on close; the resolver still hears about the rating.
        format!("ticket_rated:{}", staff.id),
    ];
    expected.sort();
    assert_eq!(events, expected);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
