//! SeaORM Entity for tickets table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[sea_orm(string_value = "NEW")]
    New,
    #[sea_orm(string_value = "CLAIMED")]
    Claimed,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
    #[sea_orm(string_value = "SPAM_PENDING")]
    SpamPending,
    #[sea_orm(string_value = "SPAM_CONFIRMED")]
    SpamConfirmed,
    #[sea_orm(string_value = "SPAM_REJECTED")]
    SpamRejected,
}

impl TicketStatus {
    /// Canonical wire/storage name, e.g. `SPAM_PENDING`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Claimed => "CLAIMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::SpamPending => "SPAM_PENDING",
            Self::SpamConfirmed => "SPAM_CONFIRMED",
            Self::SpamRejected => "SPAM_REJECTED",
        }
    }

    /// Statuses in which a staff member owns the ticket.
    /// `assigned_staff_id` is set exactly while the ticket is in one of these.
    pub fn holds_assignee(&self) -> bool {
        matches!(self, Self::Claimed | Self::InProgress | Self::Resolved)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status name that is not one of the canonical `TicketStatus` names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown ticket status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Parses the canonical upper-case name, e.g. `SPAM_PENDING`.
impl std::str::FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "CLAIMED" => Ok(Self::Claimed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            "SPAM_PENDING" => Ok(Self::SpamPending),
            "SPAM_CONFIRMED" => Ok(Self::SpamConfirmed),
            "SPAM_REJECTED" => Ok(Self::SpamRejected),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub requester_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub category: String,
    pub is_urgent: bool,
    pub is_anonymous: bool,
    pub status: TicketStatus,
    pub assigned_staff_id: Option<i32>,
    /// Staff member who marked the ticket resolved; survives Close.
    pub resolved_by_id: Option<i32>,
    pub claimed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::RequesterId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Requester,
    #[sea_orm(has_many = "super::ticket_messages::Entity")]
    Messages,
    #[sea_orm(has_many = "super::ticket_images::Entity")]
    Images,
    #[sea_orm(has_one = "super::ratings::Entity")]
    Rating,
    #[sea_orm(has_one = "super::spam_flags::Entity")]
    SpamFlag,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requester.def()
    }
}

impl Related<super::ticket_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::ticket_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl Related<super::spam_flags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpamFlag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
