//! Canned replies: reusable message bodies for staff.
//!
//! A reply with no owner is shared with every staff member. Only the owner or a
//! super-staff member may change or remove a reply.

use crate::app_config::LimitsConfig;
use crate::error::{DeskError, DeskResult};
use crate::orm::canned_replies;
use crate::tickets::{check_text, PageRequest, Paged};
use crate::user::{get_user, Actor};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, PaginatorTrait};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewCannedReply {
    pub title: String,
    pub body: String,
    /// Super-staff only: publish without an owner.
    #[serde(default)]
    pub shared: bool,
}

/// Partial update. Absent or blank fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CannedReplyChanges {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct CannedReplyService {
    pub db: DatabaseConnection,
    pub limits: LimitsConfig,
}

impl CannedReplyService {
    pub fn new(db: DatabaseConnection, limits: LimitsConfig) -> Self {
        Self { db, limits }
    }

    async fn staff(&self, caller_id: i32) -> DeskResult<Actor> {
        let actor = get_user(&self.db, caller_id).await?;
        actor.require_staff()?;
        Ok(actor)
    }

    async fn modifiable(&self, caller_id: i32, id: i32) -> DeskResult<canned_replies::Model> {
        let actor = self.staff(caller_id).await?;
        let reply = canned_replies::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DeskError::NotFound("canned reply"))?;

        if reply.owner_id == Some(actor.id) || actor.is_super_staff() {
            Ok(reply)
        } else {
            Err(DeskError::Forbidden(
                "Only the owner or a super-staff member can modify this reply".to_owned(),
            ))
        }
    }

    /// Shared replies plus the caller's own, most recently updated first.
    pub async fn list(
        &self,
        caller_id: i32,
        page: PageRequest,
    ) -> DeskResult<Paged<canned_replies::Model>> {
        let actor = self.staff(caller_id).await?;
        let (page, page_size) = page.resolve(&self.limits);

        let query = canned_replies::Entity::find().filter(
            Condition::any()
                .add(canned_replies::Column::OwnerId.is_null())
                .add(canned_replies::Column::OwnerId.eq(actor.id)),
        );

        let total = query.clone().count(&self.db).await? as u64;
        let items = query
            .order_by_desc(canned_replies::Column::UpdatedAt)
            .order_by_desc(canned_replies::Column::Id)
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

    pub async fn create(
        &self,
        caller_id: i32,
        input: NewCannedReply,
    ) -> DeskResult<canned_replies::Model> {
        let actor = self.staff(caller_id).await?;
        if input.shared {
            actor.require_super_staff()?;
        }

        let mut details = BTreeMap::new();
        let title = check_text(
            &mut details,
            "title",
            &input.title,
            self.limits.max_canned_title_length,
        );
        let body = check_text(
            &mut details,
            "body",
            &input.body,
            self.limits.max_canned_body_length,
        );
        if !details.is_empty() {
            return Err(DeskError::validation(details));
        }

        let now = Utc::now().naive_utc();
        let reply = canned_replies::ActiveModel {
            owner_id: Set(if input.shared { None } else { Some(actor.id) }),
            title: Set(title),
            body: Set(body),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(reply)
    }

    pub async fn update(
        &self,
        caller_id: i32,
        id: i32,
        changes: CannedReplyChanges,
    ) -> DeskResult<canned_replies::Model> {
        let reply = self.modifiable(caller_id, id).await?;

        let mut details = BTreeMap::new();
        let title = changes
            .title
            .filter(|t| !t.trim().is_empty())
            .map(|t| check_text(&mut details, "title", &t, self.limits.max_canned_title_length));
        let body = changes
            .body
            .filter(|b| !b.trim().is_empty())
            .map(|b| check_text(&mut details, "body", &b, self.limits.max_canned_body_length));
        if !details.is_empty() {
            return Err(DeskError::validation(details));
        }

        if title.is_none() && body.is_none() {
            return Ok(reply);
        }

        let mut active: canned_replies::ActiveModel = reply.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(body) = body {
            active.body = Set(body);
        }
        active.updated_at = Set(Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, caller_id: i32, id: i32) -> DeskResult<()> {
        let reply = self.modifiable(caller_id, id).await?;
        canned_replies::Entity::delete_by_id(reply.id)
            .exec(&self.db)
            .await?;
        log::info!("Canned reply {} deleted by user {}", id, caller_id);
        Ok(())
    }
}
