//! Reservation ledger interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Reservation, ReservationStatus};
use crate::domain::window::TimeWindow;
use crate::domain::DomainResult;

/// Input for a new soft hold. Window and quantity are validated by the
/// coordinator before this ever reaches a ledger.
#[derive(Debug, Clone)]
pub struct NewHold {
    pub device_model_id: i64,
    pub rental_order_id: Uuid,
    pub order_detail_id: Uuid,
    pub window: TimeWindow,
    pub quantity: i64,
    /// Review deadline, `now + review_window` at intake.
    pub expiration_time: DateTime<Utc>,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Sum of `reserved_quantity` over all holds matching the capacity
    /// predicate for `window` at reference time `at`.
    async fn consumed_quantity(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        at: DateTime<Utc>,
    ) -> DomainResult<i64>;

    /// Create a PendingReview hold, failing with `CapacityExceeded` when
    /// fewer than `hold.quantity` of `total_units` remain for the window.
    ///
    /// The capacity read and the insert form one atomic unit; two
    /// concurrent calls racing for the last unit can never both succeed.
    async fn create_hold(
        &self,
        hold: NewHold,
        total_units: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation>;

    /// Bulk status change for every reservation of an order currently in one
    /// of `from`. Returns rows affected; 0 means "nothing to do", not an
    /// error. `new_expiration` replaces the deadline (None clears it,
    /// which is how confirmation makes a hold sweep-proof).
    async fn transition_for_order(
        &self,
        rental_order_id: Uuid,
        from: &[ReservationStatus],
        to: ReservationStatus,
        new_expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<u64>;

    /// Flip every non-terminal hold with `expiration_time <= reference_time`
    /// to Expired. The only writer of Expired; idempotent because flipped
    /// rows no longer match the filter.
    async fn sweep_expired(&self, reference_time: DateTime<Utc>) -> DomainResult<u64>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>>;

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Reservation>>;

    /// Cascade hook for order deletion: hard-delete every reservation of the
    /// order. Returns rows removed.
    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64>;
}
