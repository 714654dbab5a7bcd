//! Identity lookups. Accounts are owned by the credential component; the desk reads them.

use crate::error::{DeskError, DeskResult};
use crate::orm::users::{self, Role};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;

/// The resolved caller of a desk operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
    pub name: String,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_super_staff(&self) -> bool {
        self.role.is_super_staff()
    }

    pub fn require_staff(&self) -> DeskResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(DeskError::Forbidden("Staff access required".to_owned()))
        }
    }

    pub fn require_super_staff(&self) -> DeskResult<()> {
        if self.is_super_staff() {
            Ok(())
        } else {
            Err(DeskError::Forbidden("Super-staff access required".to_owned()))
        }
    }
}

impl From<users::Model> for Actor {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            role: user.role,
            name: user.name,
        }
    }
}

/// Returns the active user with this id.
pub async fn get_user<C: ConnectionTrait>(db: &C, id: i32) -> DeskResult<Actor> {
    let user = users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DeskError::NotFound("user"))?;

    if !user.is_active {
        return Err(DeskError::Forbidden("Account is disabled".to_owned()));
    }

    Ok(user.into())
}

/// Email address for a user who accepts mail, if any.
pub async fn get_mail_recipient<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<(String, String)>, sea_orm::DbErr> {
    Ok(users::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|u| u.is_active && u.allow_email)
        .map(|u| (u.email, u.name)))
}
