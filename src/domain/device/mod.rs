pub mod model;
pub mod registry;

pub use model::{Device, DeviceModel, DeviceStatus};
pub use registry::DeviceRegistry;
