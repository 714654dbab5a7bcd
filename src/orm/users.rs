//! SeaORM Entity for users table
//!
//! Accounts are provisioned by the external identity component. This crate only reads them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "REQUESTER")]
    Requester,
    #[sea_orm(string_value = "STAFF")]
    Staff,
    #[sea_orm(string_value = "SUPER_STAFF")]
    SuperStaff,
}

impl Role {
    /// Staff and super-staff may see and work every ticket.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::SuperStaff)
    }

    pub fn is_super_staff(&self) -> bool {
        matches!(self, Role::SuperStaff)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub role: Role,
    pub allow_email: bool,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tickets::Entity")]
    Tickets,
}

impl Related<super::tickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
