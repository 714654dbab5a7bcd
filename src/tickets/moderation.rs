//! Spam moderation: staff flag a ticket, a super-staff member confirms or rejects it.

use super::access::gate;
use super::{audit, TicketService};
use crate::constants::SPAM_CONFIRMED_NOTICE;
use crate::error::{DeskError, DeskResult};
use crate::orm::spam_flags::{self, ModerationStatus};
use crate::orm::ticket_messages;
use crate::orm::tickets::{self, TicketStatus};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, TransactionTrait};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    /// Accepts "approve" or "reject" in any case, surrounding whitespace ignored.
    pub fn parse(action: &str) -> DeskResult<Self> {
        match action.trim().to_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(DeskError::invalid_field(
                "action",
                "must be 'approve' or 'reject'",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    fn outcome(&self) -> (TicketStatus, ModerationStatus) {
        match self {
            Self::Approve => (TicketStatus::SpamConfirmed, ModerationStatus::Confirmed),
            Self::Reject => (TicketStatus::SpamRejected, ModerationStatus::Rejected),
        }
    }
}

impl TicketService {
    /// Move a ticket into SPAM_PENDING and (re)write its flag row.
    /// A previously rejected flag is replaced.
    pub async fn flag_spam(
        &self,
        caller_id: i32,
        ticket_id: i32,
        reason: &str,
    ) -> DeskResult<spam_flags::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DeskError::invalid_field("reason", "must not be empty"));
        }

        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_staff()?;

        if matches!(
            ticket.status,
            TicketStatus::SpamPending | TicketStatus::SpamConfirmed
        ) {
            return Err(DeskError::Conflict(
                "Ticket has already been flagged as spam".to_owned(),
            ));
        }

        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        // The ticket leaves the staff queue, so the assignee goes with it.
        let result = tickets::Entity::update_many()
            .col_expr(
                tickets::Column::Status,
                Expr::value(TicketStatus::SpamPending.to_value()),
            )
            .col_expr(tickets::Column::AssignedStaffId, Expr::value(Option::<i32>::None))
            .col_expr(
                tickets::Column::ClaimedAt,
                Expr::value(Option::<chrono::NaiveDateTime>::None),
            )
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::Status.eq(ticket.status.to_value()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(DeskError::Conflict(
                "Ticket changed while flagging, retry".to_owned(),
            ));
        }

        let existing = spam_flags::Entity::find()
            .filter(spam_flags::Column::TicketId.eq(ticket_id))
            .one(&txn)
            .await?;

        let flag = match existing {
            Some(prior) => {
                let mut active: spam_flags::ActiveModel = prior.into();
                active.flagged_by_id = Set(actor.id);
                active.reason = Set(reason.to_owned());
                active.status = Set(ModerationStatus::Pending);
                active.reviewed_by_id = Set(None);
                active.reviewed_at = Set(None);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                spam_flags::ActiveModel {
                    ticket_id: Set(ticket_id),
                    flagged_by_id: Set(actor.id),
                    reason: Set(reason.to_owned()),
                    status: Set(ModerationStatus::Pending),
                    reviewed_by_id: Set(None),
                    reviewed_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        audit::record(
            &txn,
            actor.id,
            audit::ACTION_SPAM_FLAG,
            ticket_id,
            json!({
                "status_from": ticket.status,
                "status_to": TicketStatus::SpamPending,
                "reason": reason,
            }),
        )
        .await?;

        txn.commit().await?;

        log::info!(
            "{} on ticket {} by user {}",
            audit::ACTION_SPAM_FLAG,
            ticket_id,
            actor.id
        );
        Ok(flag)
    }

    /// Settle a pending flag. Approval posts the canned notice to the requester.
    pub async fn review_spam(&self, caller_id: i32, ticket_id: i32, action: &str) -> DeskResult<()> {
        let action = ReviewAction::parse(action)?;

        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        actor.require_super_staff()?;

        let (ticket_to, flag_to) = action.outcome();
        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let result = tickets::Entity::update_many()
            .col_expr(tickets::Column::Status, Expr::value(ticket_to.to_value()))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.eq(ticket_id))
            .filter(tickets::Column::Status.eq(TicketStatus::SpamPending.to_value()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(DeskError::InvalidState(
                "Only SPAM_PENDING tickets can be reviewed".to_owned(),
            ));
        }

        spam_flags::Entity::update_many()
            .col_expr(spam_flags::Column::Status, Expr::value(flag_to.to_value()))
            .col_expr(spam_flags::Column::ReviewedById, Expr::value(actor.id))
            .col_expr(spam_flags::Column::ReviewedAt, Expr::value(now))
            .col_expr(spam_flags::Column::UpdatedAt, Expr::value(now))
            .filter(spam_flags::Column::TicketId.eq(ticket_id))
            .exec(&txn)
            .await?;

        if action == ReviewAction::Approve {
            ticket_messages::ActiveModel {
                ticket_id: Set(ticket.id),
                sender_id: Set(actor.id),
                body: Set(SPAM_CONFIRMED_NOTICE.to_owned()),
                is_internal_note: Set(false),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        audit::record(
            &txn,
            actor.id,
            audit::ACTION_SPAM_REVIEW,
            ticket_id,
            json!({
                "status_from": TicketStatus::SpamPending,
                "status_to": ticket_to,
                "review_action": action.as_str(),
            }),
        )
        .await?;

        txn.commit().await?;

        log::info!(
            "{} ({}) on ticket {} by user {}",
            audit::ACTION_SPAM_REVIEW,
            action.as_str(),
            ticket_id,
            actor.id
        );
        Ok(())
    }
}
