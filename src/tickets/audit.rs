//! Append-only record of privileged ticket transitions.
//!
//! Always called with the transaction that performs the transition, so a status change
//! is never visible without its audit row.

use crate::constants::AUDIT_ENTITY_TICKET;
use crate::orm::audit_logs;
use chrono::Utc;
use sea_orm::{entity::*, ConnectionTrait, DbErr};

pub const ACTION_CLAIM: &str = "ticket.claim";
pub const ACTION_UNCLAIM: &str = "ticket.unclaim";
pub const ACTION_RESOLVE: &str = "ticket.resolve";
pub const ACTION_CLOSE: &str = "ticket.close";
pub const ACTION_SPAM_FLAG: &str = "ticket.spam_flag";
pub const ACTION_SPAM_REVIEW: &str = "ticket.spam_review";

pub async fn record<C: ConnectionTrait>(
    db: &C,
    actor_id: i32,
    action: &str,
    ticket_id: i32,
    diff: serde_json::Value,
) -> Result<(), DbErr> {
    let entry = audit_logs::ActiveModel {
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        entity_type: Set(AUDIT_ENTITY_TICKET.to_string()),
        entity_id: Set(ticket_id),
        diff: Set(diff),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    audit_logs::Entity::insert(entry).exec(db).await?;
    Ok(())
}
