pub mod booking;
pub mod device;
pub mod repositories;
pub mod reservation;
pub mod window;

// Re-export commonly used types
pub use booking::{Booking, BookingRepository, BookingStatus, NewBooking};
pub use device::{Device, DeviceModel, DeviceRegistry, DeviceStatus};
pub use repositories::RepositoryProvider;
pub use reservation::{NewHold, Reservation, ReservationRepository, ReservationStatus};
pub use window::TimeWindow;

// Re-export error types from shared for convenience
pub use crate::shared::errors::{AllocationError, DomainResult};
