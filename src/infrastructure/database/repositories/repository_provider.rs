//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;

use super::booking_repository::SeaOrmBookingRepository;
use super::reservation_repository::SeaOrmReservationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let held = repos.reservations().find_by_order(order_id).await?;
/// let bound = repos.bookings().find_by_order(order_id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    reservations: SeaOrmReservationRepository,
    bookings: SeaOrmBookingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            reservations: SeaOrmReservationRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }
}
