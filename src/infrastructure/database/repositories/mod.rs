//! SeaORM repository implementations

mod booking_repository;
mod device_registry;
mod repository_provider;
mod reservation_repository;

pub use booking_repository::SeaOrmBookingRepository;
pub use device_registry::SeaOrmDeviceRegistry;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use reservation_repository::SeaOrmReservationRepository;
