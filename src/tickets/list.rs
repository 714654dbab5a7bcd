use super::access::gate;
use super::{PageRequest, Paged, TicketDetail, TicketService, TicketView};
use crate::error::{DeskError, DeskResult};
use crate::image::{get_image_ids_for_tickets, get_ticket_image_ids};
use crate::orm::ratings;
use crate::orm::tickets::{self, TicketStatus};
use crate::user::get_user;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use serde::Deserialize;

/// Optional listing filters. Empty strings count as absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TicketFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub is_urgent: Option<bool>,
    /// Staff only; ignored for requesters.
    pub assigned_to_me: Option<bool>,
}

impl TicketFilters {
    fn status(&self) -> DeskResult<Option<TicketStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .to_uppercase()
                .parse::<TicketStatus>()
                .map(Some)
                .map_err(|_| DeskError::invalid_field("status", "unknown ticket status")),
        }
    }

    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl TicketService {
    /// Newest first. Requesters only ever see their own tickets.
    pub async fn list_tickets(
        &self,
        caller_id: i32,
        filters: TicketFilters,
        page: PageRequest,
    ) -> DeskResult<Paged<TicketView>> {
        let actor = get_user(&self.db, caller_id).await?;
        let status = filters.status()?;
        let (page, page_size) = page.resolve(&self.limits);

        let mut query = tickets::Entity::find();
        if !actor.is_staff() {
            query = query.filter(tickets::Column::RequesterId.eq(actor.id));
        } else if filters.assigned_to_me.unwrap_or(false) {
            query = query.filter(tickets::Column::AssignedStaffId.eq(actor.id));
        }
        if let Some(status) = status {
            query = query.filter(tickets::Column::Status.eq(status.to_value()));
        }
        if let Some(category) = filters.category() {
            query = query.filter(tickets::Column::Category.eq(category));
        }
        if let Some(is_urgent) = filters.is_urgent {
            query = query.filter(tickets::Column::IsUrgent.eq(is_urgent));
        }

        let total = query.clone().count(&self.db).await? as u64;
        let rows = query
            .order_by_desc(tickets::Column::CreatedAt)
            .order_by_desc(tickets::Column::Id)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(&self.db)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|t| t.id).collect();
        let mut images = get_image_ids_for_tickets(&self.db, &ids).await?;
        let items = rows
            .into_iter()
            .map(|t| {
                let image_ids = images.remove(&t.id).unwrap_or_default();
                TicketView::new(t, image_ids)
            })
            .collect();

        Ok(Paged {
            items,
            page,
            page_size,
            total,
        })
    }

    pub async fn get_ticket_detail(&self, caller_id: i32, ticket_id: i32) -> DeskResult<TicketDetail> {
        let (_, ticket) = gate(&self.db, caller_id, ticket_id).await?;

        let image_ids = get_ticket_image_ids(&self.db, ticket.id).await?;
        let rating = ratings::Entity::find()
            .filter(ratings::Column::TicketId.eq(ticket.id))
            .one(&self.db)
            .await?;

        Ok(TicketDetail {
            ticket: TicketView::new(ticket, image_ids),
            rating,
        })
    }
}
