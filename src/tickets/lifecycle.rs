//! Staff-driven lifecycle transitions: claim, unclaim, resolve, close.
//!
//! Each transition is one conditional update keyed on the expected status (and assignee
//! where relevant). When nothing matched, the ticket is re-read only to pick the error.

use super::access::{gate, load_ticket};
use super::{audit, TicketService};
use crate::error::{DeskError, DeskResult};
use crate::notifications::dispatch;
use crate::orm::tickets::{self, TicketStatus};
use crate::user::Actor;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, TransactionTrait, UpdateMany};
use serde_json::json;

impl TicketService {
    /// Run `update` and, when it matched a row, its audit entry in one transaction.
    /// Returns false when the conditional update matched nothing.
    pub(crate) async fn apply_transition(
        &self,
        update: UpdateMany<tickets::Entity>,
        actor: &Actor,
        ticket_id: i32,
        action: &str,
        diff: serde_json::Value,
    ) -> DeskResult<bool> {
        let txn = self.db.begin().await?;

        let result = update.exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        audit::record(&txn, actor.id, action, ticket_id, diff).await?;
        txn.commit().await?;

        log::info!("{} on ticket {} by user {}", action, ticket_id, actor.id);
        Ok(true)
    }

    pub async fn claim_ticket(&self, caller_id: i32, ticket_id: i32) -> DeskResult<()> {
        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_staff()?;

        let now = Utc::now().naive_utc();
        let update = tickets::Entity::update_many()
            .col_expr(tickets::Column::AssignedStaffId, Expr::value(actor.id))
            .col_expr(
                tickets::Column::Status,
                Expr::value(TicketStatus::Claimed.to_value()),
            )
            .col_expr(tickets::Column::ClaimedAt, Expr::value(now))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::Status.eq(TicketStatus::New.to_value()));

        let diff = json!({
            "status_from": TicketStatus::New,
            "status_to": TicketStatus::Claimed,
            "assigned_staff_id": actor.id,
        });

        if !self
            .apply_transition(update, &actor, ticket_id, audit::ACTION_CLAIM, diff)
            .await?
        {
            let current = load_ticket(&self.db, ticket_id).await?;
            return Err(claim_failure(&current, actor.id));
        }

        let (requester_id, staff_id) = (ticket.requester_id, actor.id);
        dispatch(self.notifier.clone(), "ticket_claimed", move |n| async move {
            n.ticket_claimed(ticket_id, requester_id, staff_id).await
        });

        Ok(())
    }

    pub async fn unclaim_ticket(&self, caller_id: i32, ticket_id: i32) -> DeskResult<()> {
        let (actor, _) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_staff()?;

        let update = tickets::Entity::update_many()
            .col_expr(tickets::Column::AssignedStaffId, Expr::value(Option::<i32>::None))
            .col_expr(tickets::Column::Status, Expr::value(TicketStatus::New.to_value()))
            .col_expr(
                tickets::Column::ClaimedAt,
                Expr::value(Option::<chrono::NaiveDateTime>::None),
            )
            .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::AssignedStaffId.eq(actor.id))
            .filter(tickets::Column::Status.eq(TicketStatus::Claimed.to_value()));

        let diff = json!({
            "status_from": TicketStatus::Claimed,
            "status_to": TicketStatus::New,
            "unassigned_staff_id": actor.id,
        });

        if !self
            .apply_transition(update, &actor, ticket_id, audit::ACTION_UNCLAIM, diff)
            .await?
        {
            let current = load_ticket(&self.db, ticket_id).await?;
            return Err(assignee_failure(&current, actor.id, "unclaimed"));
        }

        Ok(())
    }

    pub async fn resolve_ticket(&self, caller_id: i32, ticket_id: i32) -> DeskResult<()> {
        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_staff()?;

        let update = tickets::Entity::update_many()
            .col_expr(
                tickets::Column::Status,
                Expr::value(TicketStatus::Resolved.to_value()),
            )
            .col_expr(tickets::Column::ResolvedById, Expr::value(actor.id))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::AssignedStaffId.eq(actor.id))
            .filter(tickets::Column::Status.is_in([
                TicketStatus::Claimed.to_value(),
                TicketStatus::InProgress.to_value(),
            ]));

        let diff = json!({
            "status_from": ticket.status,
            "status_to": TicketStatus::Resolved,
        });

        if !self
            .apply_transition(update, &actor, ticket_id, audit::ACTION_RESOLVE, diff)
            .await?
        {
            let current = load_ticket(&self.db, ticket_id).await?;
            return Err(assignee_failure(&current, actor.id, "resolved"));
        }

        let (requester_id, staff_id) = (ticket.requester_id, actor.id);
        dispatch(self.notifier.clone(), "ticket_resolved", move |n| async move {
            n.ticket_resolved(ticket_id, requester_id, staff_id).await
        });

        Ok(())
    }

    /// Assignee or super-staff only. Clears the assignee.
    pub async fn close_ticket(&self, caller_id: i32, ticket_id: i32) -> DeskResult<()> {
        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_staff()?;

        let mut update = tickets::Entity::update_many()
            .col_expr(tickets::Column::Status, Expr::value(TicketStatus::Closed.to_value()))
            .col_expr(tickets::Column::AssignedStaffId, Expr::value(Option::<i32>::None))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::Status.eq(TicketStatus::Resolved.to_value()));
        if !actor.is_super_staff() {
            update = update.filter(tickets::Column::AssignedStaffId.eq(actor.id));
        }

        let diff = json!({
            "status_from": TicketStatus::Resolved,
            "status_to": TicketStatus::Closed,
            "previous_staff_id": ticket.assigned_staff_id,
        });

        if !self
            .apply_transition(update, &actor, ticket_id, audit::ACTION_CLOSE, diff)
            .await?
        {
            let current = load_ticket(&self.db, ticket_id).await?;
            return Err(close_failure(&current, &actor));
        }

        Ok(())
    }
}

/// A claim matched nothing. Another staff member holding the ticket means we lost a race.
pub(crate) fn claim_failure(current: &tickets::Model, caller_id: i32) -> DeskError {
    match current.status {
        TicketStatus::New => DeskError::Conflict("Ticket changed while claiming, retry".to_owned()),
        TicketStatus::Claimed | TicketStatus::InProgress
            if current.assigned_staff_id != Some(caller_id) =>
        {
            DeskError::Conflict("Ticket has already been claimed by another staff member".to_owned())
        }
        status => DeskError::InvalidState(format!(
            "Only NEW tickets can be claimed, current status is {}",
            status
        )),
    }
}

/// An assignee-only transition matched nothing.
pub(crate) fn assignee_failure(current: &tickets::Model, caller_id: i32, verb: &str) -> DeskError {
    if current.assigned_staff_id != Some(caller_id) {
        DeskError::Forbidden("You are not the assignee of this ticket".to_owned())
    } else {
        DeskError::InvalidState(format!(
            "Ticket cannot be {} from status {}",
            verb, current.status
        ))
    }
}

/// A close matched nothing. The resolver keeps standing after the assignee is cleared.
pub(crate) fn close_failure(current: &tickets::Model, actor: &Actor) -> DeskError {
    let owner = current.assigned_staff_id.or(current.resolved_by_id);
    if !actor.is_super_staff() && owner != Some(actor.id) {
        DeskError::Forbidden(
            "Only the assignee or a super-staff member can close this ticket".to_owned(),
        )
    } else {
        DeskError::InvalidState(format!(
            "Only RESOLVED tickets can be closed, current status is {}",
            current.status
        ))
    }
}
