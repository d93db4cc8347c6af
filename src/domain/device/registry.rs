//! Read-only view of the device fleet

use async_trait::async_trait;

use super::model::{Device, DeviceModel};
use crate::domain::DomainResult;

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Fleet size of a model, `NotFound` for an unknown model id.
    async fn total_units(&self, device_model_id: i64) -> DomainResult<i64>;

    /// Ids of the model's assignable devices, ascending. Retired units are
    /// excluded here rather than at pick time.
    async fn list_device_ids(&self, device_model_id: i64) -> DomainResult<Vec<i64>>;

    async fn find_model(&self, device_model_id: i64) -> DomainResult<Option<DeviceModel>>;

    async fn find_device(&self, device_id: i64) -> DomainResult<Option<Device>>;
}
