//! Device entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub device_model_id: i64,

    #[sea_orm(unique)]
    pub serial_number: String,

    /// Device status: Active, Retired
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_model::Entity",
        from = "Column::DeviceModelId",
        to = "super::device_model::Column::Id"
    )]
    DeviceModel,

    #[sea_orm(has_many = "super::booking::Entity")]
    Booking,
}

impl Related<super::device_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceModel.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
