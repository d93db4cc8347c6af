pub mod model;
pub mod repository;

pub use model::{Reservation, ReservationStatus};
pub use repository::{NewHold, ReservationRepository};
