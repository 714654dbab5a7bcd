//! Ticket attachments. Image storage itself is external; only existence and linkage live here.

use crate::orm::{images, ticket_images};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::collections::{BTreeSet, HashMap};

/// Deduplicate caller-supplied ids, dropping non-positive ones. Result is ascending.
pub fn normalize_image_ids(ids: &[i32]) -> Vec<i32> {
    ids.iter()
        .copied()
        .filter(|id| *id > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Which of `ids` exist in the image store.
pub async fn get_existing_image_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<BTreeSet<i32>, DbErr> {
    if ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let found = images::Entity::find()
        .filter(images::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await?;

    Ok(found.into_iter().map(|image| image.id).collect())
}

/// Ids from `ids` missing from the store, ascending.
pub async fn find_missing_image_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<Vec<i32>, DbErr> {
    let existing = get_existing_image_ids(db, ids).await?;
    Ok(ids
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect())
}

pub async fn link_ticket_images<C: ConnectionTrait>(
    db: &C,
    ticket_id: i32,
    image_ids: &[i32],
) -> Result<(), DbErr> {
    if image_ids.is_empty() {
        return Ok(());
    }

    let now = Utc::now().naive_utc();
    let rows = image_ids.iter().map(|image_id| ticket_images::ActiveModel {
        ticket_id: Set(ticket_id),
        image_id: Set(*image_id),
        created_at: Set(now),
    });

    ticket_images::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Image ids attached to a ticket, ascending.
pub async fn get_ticket_image_ids<C: ConnectionTrait>(
    db: &C,
    ticket_id: i32,
) -> Result<Vec<i32>, DbErr> {
    Ok(ticket_images::Entity::find()
        .filter(ticket_images::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_images::Column::ImageId)
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.image_id)
        .collect())
}

/// Batch version of `get_ticket_image_ids` for listings.
pub async fn get_image_ids_for_tickets<C: ConnectionTrait>(
    db: &C,
    ticket_ids: &[i32],
) -> Result<HashMap<i32, Vec<i32>>, DbErr> {
    let mut map: HashMap<i32, Vec<i32>> = HashMap::new();
    if ticket_ids.is_empty() {
        return Ok(map);
    }

    let links = ticket_images::Entity::find()
        .filter(ticket_images::Column::TicketId.is_in(ticket_ids.to_vec()))
        .order_by_asc(ticket_images::Column::TicketId)
        .order_by_asc(ticket_images::Column::ImageId)
        .all(db)
        .await?;

    for link in links {
        map.entry(link.ticket_id).or_default().push(link.image_id);
    }

    Ok(map)
}
