//! Booking assignment interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Booking, BookingStatus};
use crate::domain::window::TimeWindow;
use crate::domain::DomainResult;
use crate::shared::pagination::{PaginatedResult, PaginationParams};

/// Input for a new device assignment. The coordinator picks the device;
/// the store only enforces that the pick is still free.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub device_id: i64,
    pub device_model_id: i64,
    pub rental_order_id: Uuid,
    pub order_detail_id: Uuid,
    pub window: TimeWindow,
}

/// Queries take the set of statuses that count as "blocking" from the
/// caller instead of assuming one, so a new status added upstream can never
/// silently change what these readouts return.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Bookings in one of `active` across all devices of the model
    /// overlapping `window`. Sanity check against the reservation ledger's
    /// soft count; the two only diverge during an in-flight binding pass.
    async fn count_overlapping(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<i64>;

    /// Distinct device ids of `device_model_id` with at least one booking in
    /// `active` overlapping `window`. Candidates for assignment are the
    /// registry's device list minus this set.
    async fn find_busy_devices(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<Vec<i64>>;

    /// Bookings in `active` whose start falls inside `window`, ordered by
    /// start time then id, one page at a time. Page numbering restarts the
    /// scan, so a consumer can resume from any page after an interruption.
    async fn find_upcoming(
        &self,
        window: &TimeWindow,
        active: &[BookingStatus],
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>>;

    /// Assign `booking.device_id` for the window, failing with
    /// `DeviceConflict` if an active overlapping booking already exists.
    ///
    /// The overlap check and the insert form one atomic unit; two orders
    /// racing for the same device over overlapping windows can never both
    /// bind it.
    async fn bind(&self, booking: NewBooking, now: DateTime<Utc>) -> DomainResult<Booking>;

    /// Cancel every active booking of an order. Returns rows affected.
    async fn release_by_order(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<u64>;

    /// Cancel the listed bookings regardless of order. Used to unwind a
    /// partially bound confirmation before retrying.
    async fn release_by_ids(&self, ids: &[i64], now: DateTime<Utc>) -> DomainResult<u64>;

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Booking>>;

    /// Cascade hook for order deletion: hard-delete every booking of the
    /// order. Returns rows removed.
    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64>;
}
