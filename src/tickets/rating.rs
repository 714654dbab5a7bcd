use super::access::gate;
use super::TicketService;
use crate::error::{is_unique_violation, DeskError, DeskResult};
use crate::notifications::dispatch;
use crate::orm::ratings;
use chrono::Utc;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use serde::Deserialize;
use validator::Validate;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewRating {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub stars: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TicketService {
    /// One rating per ticket, by the original requester only.
    pub async fn rate_ticket(
        &self,
        caller_id: i32,
        ticket_id: i32,
        input: NewRating,
    ) -> DeskResult<ratings::Model> {
        input.validate()?;

        let comment = input
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);
        if let Some(ref c) = comment {
            if c.chars().count() > self.limits.max_rating_comment_length {
                return Err(DeskError::invalid_field(
                    "comment",
                    &format!(
                        "must be at most {} characters",
                        self.limits.max_rating_comment_length
                    ),
                ));
            }
        }

        let (actor, ticket) = gate(&self.db, caller_id, ticket_id).await?;
        if ticket.requester_id != actor.id {
            return Err(DeskError::Forbidden(
                "Only the requester can rate this ticket".to_owned(),
            ));
        }

        let already = ratings::Entity::find()
            .filter(ratings::Column::TicketId.eq(ticket_id))
            .count(&self.db)
            .await?;
        if already > 0 {
            return Err(DeskError::AlreadyRated { ticket_id });
        }

        // The unique index on ticket_id settles concurrent submissions.
        let rating = ratings::ActiveModel {
            ticket_id: Set(ticket_id),
            author_id: Set(actor.id),
            stars: Set(input.stars),
            comment: Set(comment),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DeskError::AlreadyRated { ticket_id }
            } else {
                DeskError::from(e)
            }
        })?;

        log::info!(
            "Ticket {} rated {} by user {}",
            ticket_id,
            rating.stars,
            actor.id
        );

        if let Some(staff_id) = ticket.assigned_staff_id.or(ticket.resolved_by_id) {
            let stars = rating.stars;
            dispatch(self.notifier.clone(), "ticket_rated", move |n| async move {
                n.ticket_rated(ticket_id, staff_id, stars).await
            });
        }

        Ok(rating)
    }

    /// The ticket's rating, if any. Owner or staff.
    pub async fn get_rating(
        &self,
        caller_id: i32,
        ticket_id: i32,
    ) -> DeskResult<Option<ratings::Model>> {
        gate(&self.db, caller_id, ticket_id).await?;
        Ok(ratings::Entity::find()
            .filter(ratings::Column::TicketId.eq(ticket_id))
            .one(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_outside_range_fail_validation() {
        for stars in [0, 6, -1] {
            let input = NewRating {
                stars,
                comment: None,
            };
            let err: DeskError = input.validate().unwrap_err().into();
            match err {
                DeskError::Validation { details, .. } => {
                    assert_eq!(details["stars"], "must be between 1 and 5");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
        assert!(NewRating {
            stars: 5,
            comment: None
        }
        .validate()
        .is_ok());
    }
}
