//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to the per-aggregate ledgers.
//! Consumers request only the repository they need:
//!
//! ```ignore
//! async fn handle(repos: &dyn RepositoryProvider) {
//!     let held = repos.reservations().find_by_order(order_id).await?;
//!     let bound = repos.bookings().find_by_order(order_id).await?;
//! }
//! ```

use super::booking::BookingRepository;
use super::reservation::ReservationRepository;

pub trait RepositoryProvider: Send + Sync {
    fn reservations(&self) -> &dyn ReservationRepository;
    fn bookings(&self) -> &dyn BookingRepository;
}
