//! SeaORM implementation of DeviceRegistry

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::domain::device::{Device, DeviceModel, DeviceRegistry, DeviceStatus};
use crate::domain::{AllocationError, DomainResult};
use crate::infrastructure::database::entities::{device, device_model};

pub struct SeaOrmDeviceRegistry {
    db: DatabaseConnection,
}

impl SeaOrmDeviceRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: device_model::Model) -> DeviceModel {
    DeviceModel {
        id: m.id,
        name: m.name,
        total_units: m.total_units,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn device_to_domain(m: device::Model) -> Device {
    Device {
        id: m.id,
        device_model_id: m.device_model_id,
        serial_number: m.serial_number,
        status: DeviceStatus::from_str(&m.status),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> AllocationError {
    AllocationError::from_db(e)
}

// ── DeviceRegistry impl ─────────────────────────────────────────

#[async_trait]
impl DeviceRegistry for SeaOrmDeviceRegistry {
    async fn total_units(&self, device_model_id: i64) -> DomainResult<i64> {
        let model = device_model::Entity::find_by_id(device_model_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(model) = model else {
            return Err(AllocationError::NotFound {
                entity: "DeviceModel",
                field: "id",
                value: device_model_id.to_string(),
            });
        };

        Ok(model.total_units)
    }

    async fn list_device_ids(&self, device_model_id: i64) -> DomainResult<Vec<i64>> {
        let ids: Vec<i64> = device::Entity::find()
            .select_only()
            .column(device::Column::Id)
            .filter(device::Column::DeviceModelId.eq(device_model_id))
            .filter(device::Column::Status.eq(DeviceStatus::Active.as_str()))
            .order_by_asc(device::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(ids)
    }

    async fn find_model(&self, device_model_id: i64) -> DomainResult<Option<DeviceModel>> {
        let model = device_model::Entity::find_by_id(device_model_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        let model = device::Entity::find_by_id(device_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(device_to_domain))
    }
}
