//! Application layer: the allocation coordinator and background tasks
//!
//! Services here own the cross-ledger workflows. They depend only on the
//! domain traits, so any `RepositoryProvider` implementation (SQL or
//! in-memory) can sit underneath.

pub mod services;

pub use services::*;
