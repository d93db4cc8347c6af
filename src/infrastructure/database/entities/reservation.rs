//! Reservation entity
//!
//! Soft quantity holds per device model with review-deadline tracking.
//! `expiration_time` is NULL once an order is confirmed, which takes the
//! row out of the sweeper's reach for good.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub device_model_id: i64,

    pub rental_order_id: Uuid,
    pub order_detail_id: Uuid,

    /// Window start, inclusive
    pub start_time: DateTimeUtc,
    /// Window end, exclusive
    pub end_time: DateTimeUtc,

    pub reserved_quantity: i64,

    /// Reservation status: PendingReview, UnderReview, Confirmed, Expired, Cancelled
    pub status: String,

    #[sea_orm(nullable)]
    pub expiration_time: Option<DateTimeUtc>,

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
}

impl Related<super::device_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceModel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
