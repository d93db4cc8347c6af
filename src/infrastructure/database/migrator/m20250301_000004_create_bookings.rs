//! Create bookings table
//!
//! Hard assignments of physical devices to confirmed order lines.
//! The compound (device_id, start_time) index serves the per-device
//! conflict check at bind time.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_device_models::DeviceModels;
use super::m20250301_000002_create_devices::Devices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::DeviceId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::DeviceModelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::RentalOrderId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::OrderDetailId).uuid().not_null())
                    .col(
                        ColumnDef::new(Bookings::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("Scheduled"),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_device")
                            .from(Bookings::Table, Bookings::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_device_model")
                            .from(Bookings::Table, Bookings::DeviceModelId)
                            .to(DeviceModels::Table, DeviceModels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_device_start")
                    .table(Bookings::Table)
                    .col(Bookings::DeviceId)
                    .col(Bookings::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_model_start")
                    .table(Bookings::Table)
                    .col(Bookings::DeviceModelId)
                    .col(Bookings::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_order")
                    .table(Bookings::Table)
                    .col(Bookings::RentalOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    DeviceId,
    DeviceModelId,
    RentalOrderId,
    OrderDetailId,
    StartTime,
    EndTime,
    Status,
    CreatedAt,
    UpdatedAt,
}
