//! Booking entity
//!
//! Hard per-device assignments created at confirmation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub device_id: i64,
    pub device_model_id: i64,

    pub rental_order_id: Uuid,
    pub order_detail_id: Uuid,

    /// Window start, inclusive
    pub start_time: DateTimeUtc,
    /// Window end, exclusive
    pub end_time: DateTimeUtc,

    /// Booking status: Scheduled, Cancelled
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
