//! Create device_models table
//!
//! One row per rentable product line. `total_units` is the capacity
//! ceiling all availability math runs against.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceModels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceModels::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceModels::Name).string().not_null())
                    .col(
                        ColumnDef::new(DeviceModels::TotalUnits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeviceModels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceModels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceModels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum DeviceModels {
    Table,
    Id,
    Name,
    TotalUnits,
    CreatedAt,
    UpdatedAt,
}
