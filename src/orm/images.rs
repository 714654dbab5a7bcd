//! SeaORM Entity for images table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub sha256: String,
    pub mime: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_images::Entity")]
    TicketImages,
}

impl Related<super::ticket_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
