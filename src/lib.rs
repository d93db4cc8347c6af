//! # Kitrent Allocation Engine
//!
//! Inventory reservation and booking allocation for a rental fleet. Soft,
//! quantity-based holds claim device-model capacity over half-open time
//! windows; confirmation binds concrete devices; a background sweeper
//! reclaims holds whose review deadline lapsed.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, capacity rules and ledger traits
//! - **application**: The allocation coordinator and the expiry sweeper
//! - **infrastructure**: SeaORM entities, migrations and repository
//!   implementations, plus an in-memory store for tests and embedding
//! - **shared**: Errors, pagination, retry and shutdown plumbing
//! - **config**: TOML file configuration for the daemon

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export the coordinator surface for embedding callers
pub use application::{
    run_sweep_once, start_expiry_sweeper_task, AllocationPolicy, AllocationService, Availability,
    DevicePicker, FirstAvailable, HoldLine, RandomPick,
};

// Re-export database types for easy access
pub use infrastructure::database::migrator::Migrator;
pub use infrastructure::database::repositories::SeaOrmRepositoryProvider;
pub use infrastructure::{init_database, DatabaseConfig, InMemoryStore};
