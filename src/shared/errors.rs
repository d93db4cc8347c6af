//! Error taxonomy for the allocation engine

use thiserror::Error;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, AllocationError>;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Rejected before any ledger write: start >= end or quantity < 1.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Requested quantity exceeds the units remaining for the window.
    /// User-facing and recoverable; callers reject the order line or let the
    /// customer pick another window/quantity. Never retried silently.
    #[error(
        "Capacity exceeded for device model {device_model_id}: requested {requested}, remaining {remaining}"
    )]
    CapacityExceeded {
        device_model_id: i64,
        requested: i64,
        remaining: i64,
    },

    /// A device chosen for binding became busy between selection and bind.
    #[error("Device {device_id} has an overlapping active booking")]
    DeviceConflict { device_id: i64 },

    /// Transaction-level serialization/lock failure. The coordinator retries
    /// the whole line operation a bounded number of times.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AllocationError {
    /// Whether the coordinator may retry the operation that produced this
    /// error. Capacity rejections are final; conflicts are worth another
    /// attempt against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AllocationError::ConcurrencyConflict(_) | AllocationError::DeviceConflict { .. }
        )
    }

    /// Classify a SeaORM error. Lock/serialization failures become
    /// `ConcurrencyConflict` so the retry loop can tell them apart from
    /// permanent storage errors.
    pub fn from_db(e: sea_orm::DbErr) -> Self {
        let msg = e.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains("database is locked")
            || lowered.contains("database table is locked")
            || lowered.contains("could not serialize")
            || lowered.contains("deadlock")
        {
            AllocationError::ConcurrencyConflict(msg)
        } else {
            AllocationError::Database(msg)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_db_error_is_concurrency_conflict() {
        let e = AllocationError::from_db(sea_orm::DbErr::Custom(
            "database is locked".to_string(),
        ));
        assert!(matches!(e, AllocationError::ConcurrencyConflict(_)));
        assert!(e.is_retryable());
    }

    #[test]
    fn serialization_failure_is_concurrency_conflict() {
        let e = AllocationError::from_db(sea_orm::DbErr::Custom(
            "could not serialize access due to concurrent update".to_string(),
        ));
        assert!(matches!(e, AllocationError::ConcurrencyConflict(_)));
    }

    #[test]
    fn other_db_error_is_permanent() {
        let e = AllocationError::from_db(sea_orm::DbErr::Custom(
            "no such table: reservations".to_string(),
        ));
        assert!(matches!(e, AllocationError::Database(_)));
        assert!(!e.is_retryable());
    }

    #[test]
    fn capacity_exceeded_is_not_retryable() {
        let e = AllocationError::CapacityExceeded {
            device_model_id: 7,
            requested: 2,
            remaining: 1,
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("requested 2"));
    }

    #[test]
    fn device_conflict_is_retryable() {
        let e = AllocationError::DeviceConflict { device_id: 42 };
        assert!(e.is_retryable());
    }
}
