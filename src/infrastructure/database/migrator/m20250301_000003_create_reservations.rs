//! Create reservations table
//!
//! Soft quantity holds per device model over half-open time windows.
//! The compound (device_model_id, start_time) index serves the overlap
//! scan behind every availability check; the expiration index serves
//! the sweeper.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_device_models::DeviceModels;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reservations::DeviceModelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::RentalOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::OrderDetailId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ReservedQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string()
                            .not_null()
                            .default("PendingReview"),
                    )
                    .col(ColumnDef::new(Reservations::ExpirationTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_device_model")
                            .from(Reservations::Table, Reservations::DeviceModelId)
                            .to(DeviceModels::Table, DeviceModels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_model_start")
                    .table(Reservations::Table)
                    .col(Reservations::DeviceModelId)
                    .col(Reservations::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_order")
                    .table(Reservations::Table)
                    .col(Reservations::RentalOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_status")
                    .table(Reservations::Table)
                    .col(Reservations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_expiration")
                    .table(Reservations::Table)
                    .col(Reservations::ExpirationTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    DeviceModelId,
    RentalOrderId,
    OrderDetailId,
    StartTime,
    EndTime,
    ReservedQuantity,
    Status,
    ExpirationTime,
    CreatedAt,
    UpdatedAt,
}
