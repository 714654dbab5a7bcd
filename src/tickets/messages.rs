use super::access::gate;
use super::{PageRequest, Paged, TicketService};
use crate::error::{DeskError, DeskResult};
use crate::notifications::dispatch;
use crate::orm::ticket_messages;
use chrono::Utc;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewMessage {
    pub body: String,
    #[serde(default)]
    pub is_internal_note: bool,
}

impl TicketService {
    /// Thread in creation order. Requesters never see internal notes.
    pub async fn list_messages(
        &self,
        caller_id: i32,
        ticket_id: i32,
        page: PageRequest,
    ) -> DeskResult<Paged<ticket_messages::Model>> {
        let (actor, _) = gate(&self.db, caller_id, ticket_id).await?;
        let (page, page_size) = page.resolve(&self.limits);

        let mut query = ticket_messages::Entity::find()
            .filter(ticket_messages::Column::TicketId.eq(ticket_id));
        if !actor.is_staff() {
            query = query.filter(ticket_messages::Column::IsInternalNote.eq(false));
        }

        let total = query.clone().count(&self.db).await? as u64;
        let items = query
            .order_by_asc(ticket_messages::Column::Id)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(&self.db)
            .await?;

        Ok(Paged {
            items,
            page,
            page_size,
            total,
        })
    }

    /// Append to the thread and notify the other side.
    pub async fn post_message(
        &self,
        caller_id: i32,
        ticket_id: i32,
        input: NewMessage,
    ) -> DeskResult<ticket_messages::Model> {
        let body = input.body.trim();
        if body.is_empty() {
            return Err(DeskError::invalid_field("body", "must not be empty"));
        }
        if body.chars().count() > self.limits.max_message_length {
            return Err(DeskError::invalid_field(
                "body",
                &format!(
                    "must be at most {} characters",
                    self.limits.max_message_length
                ),
            ));
        }

        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        if input.is_internal_note && !actor.is_staff() {
            return Err(DeskError::Forbidden(
                "Only staff can post internal notes".to_owned(),
            ));
        }

        let message = ticket_messages::ActiveModel {
            ticket_id: Set(ticket.id),
            sender_id: Set(actor.id),
            body: Set(body.to_owned()),
            is_internal_note: Set(input.is_internal_note),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        let recipient = if actor.id == ticket.requester_id {
            ticket.assigned_staff_id.filter(|staff_id| *staff_id != actor.id)
        } else if !message.is_internal_note {
            Some(ticket.requester_id)
        } else {
            None
        };

        if let Some(recipient_id) = recipient {
            let (sender_id, text) = (actor.id, message.body.clone());
            dispatch(self.notifier.clone(), "new_message", move |n| async move {
                n.new_message(ticket_id, recipient_id, sender_id, text).await
            });
        }

        Ok(message)
    }
}
