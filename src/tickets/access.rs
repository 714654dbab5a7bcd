//! Access control gate: resolves the caller and the ticket together.

use crate::error::{DeskError, DeskResult};
use crate::orm::tickets;
use crate::user::{get_user, Actor};
use sea_orm::{ConnectionTrait, EntityTrait};

/// Load the caller and the ticket and check the caller may touch it.
///
/// Requesters pass only for their own tickets. Staff and super-staff pass for all.
/// Capability checks (staff-only, assignee-only) stay with each operation.
pub async fn gate<C: ConnectionTrait>(
    db: &C,
    caller_id: i32,
    ticket_id: i32,
) -> DeskResult<(Actor, tickets::Model)> {
    let actor = get_user(db, caller_id).await?;
    let ticket = load_ticket(db, ticket_id).await?;
    check_visibility(&actor, &ticket)?;
    Ok((actor, ticket))
}

pub async fn load_ticket<C: ConnectionTrait>(db: &C, ticket_id: i32) -> DeskResult<tickets::Model> {
    tickets::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or(DeskError::NotFound("ticket"))
}

pub fn check_visibility(actor: &Actor, ticket: &tickets::Model) -> DeskResult<()> {
    if actor.is_staff() || ticket.requester_id == actor.id {
        Ok(())
    } else {
        Err(DeskError::Forbidden(
            "You can only access your own tickets".to_owned(),
        ))
    }
}
