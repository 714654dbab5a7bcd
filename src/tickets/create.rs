use super::{check_text, TicketService, TicketView};
use crate::error::{is_foreign_key_violation, DeskError, DeskResult};
use crate::image::{find_missing_image_ids, link_ticket_images, normalize_image_ids};
use crate::notifications::dispatch;
use crate::orm::tickets::{self, TicketStatus};
use crate::user::get_user;
use chrono::Utc;
use sea_orm::{entity::*, TransactionTrait};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub is_anonymous: bool,
    /// Pre-uploaded images. Duplicates and non-positive ids are ignored.
    #[serde(default)]
    pub image_ids: Vec<i32>,
}

impl TicketService {
    /// Open a ticket in status NEW. Not audited.
    pub async fn create_ticket(&self, caller_id: i32, input: NewTicket) -> DeskResult<TicketView> {
        let actor = get_user(&self.db, caller_id).await?;

        let mut details = BTreeMap::new();
        let title = check_text(&mut details, "title", &input.title, self.limits.max_title_length);
        let content = check_text(
            &mut details,
            "content",
            &input.content,
            self.limits.max_content_length,
        );
        let category = check_text(
            &mut details,
            "category",
            &input.category,
            self.limits.max_category_length,
        );
        if !details.is_empty() {
            return Err(DeskError::validation(details));
        }

        let image_ids = normalize_image_ids(&input.image_ids);
        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let missing = find_missing_image_ids(&txn, &image_ids).await?;
        if !missing.is_empty() {
            txn.rollback().await?;
            return Err(DeskError::ImageNotFound { missing });
        }

        let ticket = tickets::ActiveModel {
            requester_id: Set(actor.id),
            title: Set(title),
            content: Set(content),
            category: Set(category),
            is_urgent: Set(input.is_urgent),
            is_anonymous: Set(input.is_anonymous),
            status: Set(TicketStatus::New),
            assigned_staff_id: Set(None),
            resolved_by_id: Set(None),
            claimed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Err(e) = link_ticket_images(&txn, ticket.id, &image_ids).await {
            txn.rollback().await?;
            if !is_foreign_key_violation(&e) {
                return Err(e.into());
            }
            // An image vanished after the existence check.
            let missing = find_missing_image_ids(&self.db, &image_ids).await?;
            return Err(DeskError::ImageNotFound { missing });
        }
        txn.commit().await?;

        log::info!(
            "Ticket {} created by user {} ({} images)",
            ticket.id,
            actor.id,
            image_ids.len()
        );

        let (ticket_id, requester_id, subject) = (ticket.id, ticket.requester_id, ticket.title.clone());
        dispatch(self.notifier.clone(), "ticket_created", move |n| async move {
            n.ticket_created(ticket_id, requester_id, subject).await
        });

        Ok(TicketView::new(ticket, image_ids))
    }
}
