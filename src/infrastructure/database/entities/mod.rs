//! Database entities module

pub mod booking;
pub mod device;
pub mod device_model;
pub mod reservation;

pub use booking::Entity as Booking;
pub use device::Entity as Device;
pub use device_model::Entity as DeviceModel;
pub use reservation::Entity as Reservation;
