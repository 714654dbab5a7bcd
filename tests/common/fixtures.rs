//! Test fixtures for creating test data
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};
use servicedesk::app_config::LimitsConfig;
use servicedesk::notifications::{Notifier, NotifyResult, NullNotifier};
use servicedesk::orm::users::Role;
use servicedesk::orm::{audit_logs, images, tickets, users};
use servicedesk::tickets::{NewTicket, TicketService, TicketView};
use std::sync::{Arc, Mutex};

/// Create an active user with the given role
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        email: Set(format!("{}@test.edu", name)),
        name: Set(name.to_string()),
        role: Set(role),
        allow_email: Set(true),
        is_active: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_requester(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    create_test_user(db, name, Role::Requester).await
}

pub async fn create_staff(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    create_test_user(db, name, Role::Staff).await
}

pub async fn create_super_staff(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    create_test_user(db, name, Role::SuperStaff).await
}

/// Register a stored image the way the upload component would
pub async fn create_test_image(db: &DatabaseConnection, seed: u8) -> Result<images::Model, DbErr> {
    images::ActiveModel {
        sha256: Set(format!("{:02x}", seed).repeat(32)),
        mime: Set("image/png".to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Service wired to a notifier that drops everything
pub fn desk(db: &DatabaseConnection) -> TicketService {
    TicketService::new(db.clone(), Arc::new(NullNotifier), LimitsConfig::default())
}

pub fn new_ticket(title: &str, content: &str, category: &str) -> NewTicket {
    NewTicket {
        title: title.to_string(),
        content: content.to_string(),
        category: category.to_string(),
        ..Default::default()
    }
}

/// Open a plain ticket through the service
pub async fn open_ticket(desk: &TicketService, requester_id: i32) -> TicketView {
    desk.create_ticket(
        requester_id,
        new_ticket("Broken lamp", "Hallway light is out", "Facilities"),
    )
    .await
    .expect("ticket creation should succeed")
}

pub async fn reload_ticket(db: &DatabaseConnection, id: i32) -> tickets::Model {
    tickets::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query failed")
        .expect("ticket should exist")
}

pub async fn audit_actions(db: &DatabaseConnection, ticket_id: i32) -> Vec<String> {
    audit_logs::Entity::find()
        .filter(audit_logs::Column::EntityId.eq(ticket_id))
        .order_by_asc(audit_logs::Column::Id)
        .all(db)
        .await
        .expect("query failed")
        .into_iter()
        .map(|entry| entry.action)
        .collect()
}

/// Records every event as "<event>:<recipient>". New tickets go to "staff".
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn push(&self, event: String) -> NotifyResult {
        self.events.lock().map_err(|e| e.to_string())?.push(event);
        Ok(())
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn ticket_created(&self, _ticket_id: i32, _requester_id: i32, _title: String) -> NotifyResult {
        self.push("ticket_created:staff".to_string())
    }

    async fn ticket_claimed(&self, _ticket_id: i32, requester_id: i32, _staff_id: i32) -> NotifyResult {
        self.push(format!("ticket_claimed:{}", requester_id))
    }

    async fn ticket_resolved(&self, _ticket_id: i32, requester_id: i32, _staff_id: i32) -> NotifyResult {
        self.push(format!("ticket_resolved:{}", requester_id))
    }

    async fn new_message(
        &self,
        _ticket_id: i32,
        recipient_id: i32,
        _sender_id: i32,
        _body: String,
    ) -> NotifyResult {
        self.push(format!("new_message:{}", recipient_id))
    }

    async fn ticket_rated(&self, _ticket_id: i32, staff_id: i32, _stars: i32) -> NotifyResult {
        self.push(format!("ticket_rated:{}", staff_id))
    }
}

/// Let detached notifier tasks run
pub async fn settle() {
    actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
}
