//! Allocation coordinator
//!
//! The single entry point order-management workflows call. Composes the
//! reservation ledger (capacity math), the booking calendar (physical
//! assignment) and the device registry into the hold, review, confirm
//! lifecycle, with cancellation and purge plumbing on the side.
//!
//! Every entry point takes the reference time explicitly instead of reading
//! the clock, so callers and tests control exactly when "now" is.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    AllocationError, Booking, BookingRepository, BookingStatus, DeviceRegistry, DomainResult,
    NewBooking, NewHold, RepositoryProvider, Reservation, ReservationRepository,
    ReservationStatus, TimeWindow,
};
use crate::shared::pagination::{PaginatedResult, PaginationParams};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

use super::selection::DevicePicker;

/// One order line in a hold request: how many units of which model over
/// which window.
#[derive(Debug, Clone)]
pub struct HoldLine {
    pub device_model_id: i64,
    pub order_detail_id: Uuid,
    pub window: TimeWindow,
    pub quantity: i64,
}

/// Point-in-time availability readout for a device model over a window.
///
/// Informational only. The numbers can be stale the moment they are
/// returned; a caller that needs a guarantee places a hold instead.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Availability {
    pub device_model_id: i64,
    pub total_units: i64,
    pub consumed: i64,
    pub remaining: i64,
}

impl Availability {
    pub fn can_fit(&self, quantity: i64) -> bool {
        quantity >= 1 && quantity <= self.remaining
    }
}

/// What a cancellation actually touched.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CancellationOutcome {
    pub bookings_released: u64,
    pub holds_retired: u64,
}

/// Row counts removed by a purge.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PurgeOutcome {
    pub reservations_removed: u64,
    pub bookings_removed: u64,
}

/// Cross-check of the two ledgers for one model over a window: units the
/// reservation ledger counts as promised versus device assignments the
/// booking calendar actually carries.
///
/// Pending holds legitimately show more promised than bound. Any other
/// drift points at an interrupted confirmation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LedgerAlignment {
    pub device_model_id: i64,
    pub soft_consumed: i64,
    pub hard_bound: i64,
}

/// Tunable knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    /// How long an intake hold stays fresh before the sweeper may reclaim it.
    pub review_window: Duration,
    /// Fresh deadline granted when staff pick an order up for review.
    pub review_extension: Duration,
    /// Attempts per order line when a hold or bind loses a race.
    pub bind_attempts: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            review_window: Duration::hours(2),
            review_extension: Duration::hours(24),
            bind_attempts: 3,
        }
    }
}

impl From<&crate::config::AllocationSection> for AllocationPolicy {
    fn from(section: &crate::config::AllocationSection) -> Self {
        Self {
            review_window: Duration::minutes(section.review_window_minutes),
            review_extension: Duration::minutes(section.review_extension_minutes),
            bind_attempts: section.bind_attempts.max(1),
        }
    }
}

/// Coordinates holds, reviews, confirmations and cancellations across the
/// two ledgers.
pub struct AllocationService {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<dyn DeviceRegistry>,
    picker: Box<dyn DevicePicker>,
    policy: AllocationPolicy,
}

impl AllocationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<dyn DeviceRegistry>,
        picker: Box<dyn DevicePicker>,
        policy: AllocationPolicy,
    ) -> Self {
        Self {
            repos,
            registry,
            picker,
            policy,
        }
    }

    // ── Availability ───────────────────────────────────────────

    /// Availability for one model over a window at reference time `now`.
    pub async fn check_availability(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> DomainResult<Availability> {
        let total_units = self.registry.total_units(device_model_id).await?;
        let consumed = self
            .repos
            .reservations()
            .consumed_quantity(device_model_id, window, now)
            .await?;

        Ok(Availability {
            device_model_id,
            total_units,
            consumed,
            remaining: (total_units - consumed).max(0),
        })
    }

    // ── Hold intake ────────────────────────────────────────────

    /// Place soft holds for every line of an order, all or nothing.
    ///
    /// Validation happens before any write: a non-positive quantity or an
    /// unknown device model rejects the whole order without touching the
    /// ledger. If a later line fails on capacity, holds already created for
    /// earlier lines are cancelled before the error surfaces, so a partially
    /// held order never lingers.
    pub async fn request_hold(
        &self,
        rental_order_id: Uuid,
        lines: &[HoldLine],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut fleet_sizes: HashMap<i64, i64> = HashMap::new();
        for line in lines {
            if line.quantity < 1 {
                return Err(AllocationError::InvalidWindow(format!(
                    "quantity must be at least 1, got {}",
                    line.quantity
                )));
            }
            if !fleet_sizes.contains_key(&line.device_model_id) {
                let units = self.registry.total_units(line.device_model_id).await?;
                fleet_sizes.insert(line.device_model_id, units);
            }
        }

        let expiration_time = now + self.policy.review_window;
        let mut created: Vec<Reservation> = Vec::with_capacity(lines.len());

        for line in lines {
            let hold = NewHold {
                device_model_id: line.device_model_id,
                rental_order_id,
                order_detail_id: line.order_detail_id,
                window: line.window,
                quantity: line.quantity,
                expiration_time,
            };
            let total_units = fleet_sizes[&line.device_model_id];

            let result = retry_with_backoff(
                RetryConfig::for_conflicts(self.policy.bind_attempts),
                || {
                    self.repos
                        .reservations()
                        .create_hold(hold.clone(), total_units, now)
                },
                |e| matches!(e, AllocationError::ConcurrencyConflict(_)),
                "create_hold",
            )
            .await;

            match result {
                Ok(reservation) => created.push(reservation),
                Err(err) => {
                    if !created.is_empty() {
                        self.unwind_intake(rental_order_id, now).await;
                    }
                    return Err(err);
                }
            }
        }

        metrics::counter!("allocation_holds_created_total").increment(created.len() as u64);
        info!(
            rental_order_id = %rental_order_id,
            lines = created.len(),
            expires_at = %expiration_time,
            "Holds placed for order"
        );

        Ok(created)
    }

    async fn unwind_intake(&self, rental_order_id: Uuid, now: DateTime<Utc>) {
        let result = self
            .repos
            .reservations()
            .transition_for_order(
                rental_order_id,
                ReservationStatus::PRE_CONFIRMATION,
                ReservationStatus::Cancelled,
                None,
                now,
            )
            .await;
        if let Err(e) = result {
            warn!(
                rental_order_id = %rental_order_id,
                error = %e,
                "Failed to unwind partial hold intake"
            );
        }
    }

    // ── Review ─────────────────────────────────────────────────

    /// Move an order's pending holds into review, extending their deadline.
    ///
    /// Returns the number of holds moved; 0 means the order had no pending
    /// holds left (already under review, confirmed, or never held). An order
    /// whose pending holds have lapsed is not resurrected: its capacity has
    /// already been returned to the pool, and extending the deadline now
    /// could admit more load than the fleet carries.
    pub async fn begin_review(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<u64> {
        let reservations = self
            .repos
            .reservations()
            .find_by_order(rental_order_id)
            .await?;
        let pending: Vec<&Reservation> = reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::PendingReview)
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }
        if pending.iter().any(|r| !r.is_fresh(now)) {
            return Err(AllocationError::NotFound {
                entity: "Reservation",
                field: "rental_order_id",
                value: rental_order_id.to_string(),
            });
        }

        let deadline = now + self.policy.review_extension;
        let moved = self
            .repos
            .reservations()
            .transition_for_order(
                rental_order_id,
                &[ReservationStatus::PendingReview],
                ReservationStatus::UnderReview,
                Some(deadline),
                now,
            )
            .await?;

        info!(
            rental_order_id = %rental_order_id,
            moved,
            deadline = %deadline,
            "Order picked up for review"
        );
        Ok(moved)
    }

    // ── Confirmation ───────────────────────────────────────────

    /// Confirm an order: bind a concrete device for every held unit, then
    /// promote the order's holds to Confirmed with the deadline cleared.
    ///
    /// Binding goes line by line. A line that loses a device race is
    /// unwound (its fresh bookings cancelled) and retried against a fresh
    /// view of the calendar, up to `bind_attempts` times. Devices bound by
    /// an earlier, interrupted confirmation are detected and kept, so the
    /// operation is safe to re-run. Returns every active booking of the
    /// order once all lines are bound.
    pub async fn confirm_order(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        let reservations = self
            .repos
            .reservations()
            .find_by_order(rental_order_id)
            .await?;
        if reservations.is_empty() {
            return Err(AllocationError::NotFound {
                entity: "Reservation",
                field: "rental_order_id",
                value: rental_order_id.to_string(),
            });
        }

        let existing: Vec<Booking> = self
            .repos
            .bookings()
            .find_by_order(rental_order_id)
            .await?
            .into_iter()
            .filter(|b| b.status.is_active())
            .collect();

        // Partition the order's lines. A lapsed or expired hold is only
        // confirmable when an earlier pass already bound devices for it;
        // otherwise its capacity went back to the pool and binding now could
        // oversubscribe the fleet.
        let mut to_confirm: Vec<&Reservation> = Vec::new();
        for r in &reservations {
            match r.status {
                ReservationStatus::Confirmed => {}
                ReservationStatus::PendingReview | ReservationStatus::UnderReview
                    if r.is_fresh(now) =>
                {
                    to_confirm.push(r)
                }
                _ => {
                    let has_bound = existing
                        .iter()
                        .any(|b| b.order_detail_id == r.order_detail_id);
                    if has_bound && r.status != ReservationStatus::Cancelled {
                        to_confirm.push(r);
                    } else {
                        warn!(
                            rental_order_id = %rental_order_id,
                            reservation_id = r.id,
                            status = %r.status,
                            "Confirmation rejected, hold is no longer active"
                        );
                        return Err(AllocationError::NotFound {
                            entity: "Reservation",
                            field: "rental_order_id",
                            value: rental_order_id.to_string(),
                        });
                    }
                }
            }
        }

        if to_confirm.is_empty() {
            // Every line already Confirmed; idempotent re-run.
            return Ok(existing);
        }

        let mut all_bookings = existing.clone();
        for reservation in &to_confirm {
            let already = existing
                .iter()
                .filter(|b| b.order_detail_id == reservation.order_detail_id)
                .count() as i64;
            let needed = reservation.reserved_quantity - already;
            if needed <= 0 {
                continue;
            }
            let fresh = self.bind_line(reservation, needed, now).await?;
            all_bookings.extend(fresh);
        }

        // Freshness was checked above against this same `now`. Including
        // Expired in the from-set lets a confirmation that raced the sweeper
        // in between, or a re-run of an interrupted one, still land on
        // Confirmed: the deadline exists to reclaim abandoned holds, and
        // this one is demonstrably not abandoned. Cancelled stays final.
        let promoted = self
            .repos
            .reservations()
            .transition_for_order(
                rental_order_id,
                &[
                    ReservationStatus::PendingReview,
                    ReservationStatus::UnderReview,
                    ReservationStatus::Expired,
                ],
                ReservationStatus::Confirmed,
                None,
                now,
            )
            .await?;

        metrics::counter!("allocation_orders_confirmed_total").increment(1);
        info!(
            rental_order_id = %rental_order_id,
            promoted,
            bookings = all_bookings.len(),
            "Order confirmed and devices bound"
        );

        Ok(all_bookings)
    }

    /// Bind `needed` free devices for one order line, re-reading the busy
    /// set and retrying when a pick loses a device race.
    async fn bind_line(
        &self,
        reservation: &Reservation,
        needed: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        let pool = self
            .registry
            .list_device_ids(reservation.device_model_id)
            .await?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let busy = self
                .repos
                .bookings()
                .find_busy_devices(
                    reservation.device_model_id,
                    &reservation.window,
                    &[BookingStatus::Scheduled],
                )
                .await?;
            let free: Vec<i64> = pool
                .iter()
                .copied()
                .filter(|id| !busy.contains(id))
                .collect();

            if (free.len() as i64) < needed {
                return Err(AllocationError::CapacityExceeded {
                    device_model_id: reservation.device_model_id,
                    requested: needed,
                    remaining: free.len() as i64,
                });
            }

            let picked = self.picker.pick(&free, needed as usize);
            let mut bound: Vec<Booking> = Vec::with_capacity(picked.len());
            let mut conflict: Option<AllocationError> = None;

            for device_id in picked {
                let booking = NewBooking {
                    device_id,
                    device_model_id: reservation.device_model_id,
                    rental_order_id: reservation.rental_order_id,
                    order_detail_id: reservation.order_detail_id,
                    window: reservation.window,
                };
                match self.repos.bookings().bind(booking, now).await {
                    Ok(b) => bound.push(b),
                    Err(e) if e.is_retryable() => {
                        conflict = Some(e);
                        break;
                    }
                    Err(e) => {
                        self.unwind_bindings(&bound, now).await;
                        return Err(e);
                    }
                }
            }

            match conflict {
                None => {
                    metrics::counter!("allocation_devices_bound_total")
                        .increment(bound.len() as u64);
                    return Ok(bound);
                }
                Some(e) => {
                    // Lost a race for at least one device. Unwind this
                    // line's fresh bookings and rebind against the updated
                    // calendar.
                    self.unwind_bindings(&bound, now).await;
                    if attempt >= self.policy.bind_attempts {
                        return Err(e);
                    }
                    warn!(
                        reservation_id = reservation.id,
                        device_model_id = reservation.device_model_id,
                        attempt,
                        error = %e,
                        "Device race lost, rebinding order line"
                    );
                }
            }
        }
    }

    async fn unwind_bindings(&self, bound: &[Booking], now: DateTime<Utc>) {
        if bound.is_empty() {
            return;
        }
        let ids: Vec<i64> = bound.iter().map(|b| b.id).collect();
        if let Err(e) = self.repos.bookings().release_by_ids(&ids, now).await {
            warn!(
                bookings = ids.len(),
                error = %e,
                "Failed to unwind partial line bindings"
            );
        }
    }

    // ── Cancellation and purge ─────────────────────────────────

    /// Cancel an order: release its devices, then retire its holds.
    ///
    /// Devices go back to the pool first so a concurrent confirmation of
    /// another order can pick them up; the status sweep then retires every
    /// hold that has not already reached a terminal state. Cancelling an
    /// unknown or already-cancelled order is a no-op.
    pub async fn cancel_order(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<CancellationOutcome> {
        let released = self
            .repos
            .bookings()
            .release_by_order(rental_order_id, now)
            .await?;
        let retired = self
            .repos
            .reservations()
            .transition_for_order(
                rental_order_id,
                ReservationStatus::CAPACITY_CONSUMING,
                ReservationStatus::Cancelled,
                None,
                now,
            )
            .await?;

        metrics::counter!("allocation_orders_cancelled_total").increment(1);
        info!(
            rental_order_id = %rental_order_id,
            released,
            retired,
            "Order cancelled"
        );

        Ok(CancellationOutcome {
            bookings_released: released,
            holds_retired: retired,
        })
    }

    /// Hard-delete every trace of an order from both ledgers. Cascade hook
    /// for order deletion in the owning system, not part of the normal
    /// lifecycle.
    pub async fn purge_order(&self, rental_order_id: Uuid) -> DomainResult<PurgeOutcome> {
        let bookings_removed = self
            .repos
            .bookings()
            .delete_by_order(rental_order_id)
            .await?;
        let reservations_removed = self
            .repos
            .reservations()
            .delete_by_order(rental_order_id)
            .await?;

        info!(
            rental_order_id = %rental_order_id,
            reservations_removed,
            bookings_removed,
            "Order purged from both ledgers"
        );

        Ok(PurgeOutcome {
            reservations_removed,
            bookings_removed,
        })
    }

    // ── Readouts ───────────────────────────────────────────────

    /// Devices of a model that cannot be assigned over `window`, judged
    /// against the booking statuses in `active`.
    pub async fn list_busy_devices(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<Vec<i64>> {
        self.repos
            .bookings()
            .find_busy_devices(device_model_id, window, active)
            .await
    }

    /// Page through bookings starting inside `window`. Feeds the dispatch
    /// view that preps devices for pickup.
    pub async fn list_upcoming_bookings(
        &self,
        window: &TimeWindow,
        active: &[BookingStatus],
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        self.repos
            .bookings()
            .find_upcoming(window, active, pagination)
            .await
    }

    /// Compare promised units against bound devices for one model.
    pub async fn ledger_alignment(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> DomainResult<LedgerAlignment> {
        let soft_consumed = self
            .repos
            .reservations()
            .consumed_quantity(device_model_id, window, now)
            .await?;
        let hard_bound = self
            .repos
            .bookings()
            .count_overlapping(device_model_id, window, &[BookingStatus::Scheduled])
            .await?;

        Ok(LedgerAlignment {
            device_model_id,
            soft_consumed,
            hard_bound,
        })
    }

    pub async fn order_reservations(
        &self,
        rental_order_id: Uuid,
    ) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_by_order(rental_order_id).await
    }

    pub async fn order_bookings(&self, rental_order_id: Uuid) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_order(rental_order_id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::application::services::selection::FirstAvailable;
    use crate::domain::DeviceStatus;
    use crate::infrastructure::memory::InMemoryStore;

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, 0, 0).unwrap()
    }

    fn window(start_day: u32, end_day: u32) -> TimeWindow {
        TimeWindow::new(day(start_day, 9), day(end_day, 9)).unwrap()
    }

    fn line(device_model_id: i64, quantity: i64, window: TimeWindow) -> HoldLine {
        HoldLine {
            device_model_id,
            order_detail_id: Uuid::new_v4(),
            window,
            quantity,
        }
    }

    fn service(store: &Arc<InMemoryStore>) -> AllocationService {
        AllocationService::new(
            store.clone(),
            store.clone(),
            Box::new(FirstAvailable),
            AllocationPolicy::default(),
        )
    }

    #[tokio::test]
    async fn availability_reflects_holds_and_their_lapse() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 5);
        let svc = service(&store);
        let w = window(10, 14);
        let t0 = day(1, 12);

        svc.request_hold(Uuid::new_v4(), &[line(1, 3, w)], t0)
            .await
            .unwrap();

        let snap = svc.check_availability(1, &w, t0).await.unwrap();
        assert_eq!(snap.consumed, 3);
        assert_eq!(snap.remaining, 2);
        assert!(snap.can_fit(2));
        assert!(!snap.can_fit(3));

        // Disjoint window sees the whole fleet.
        let disjoint = svc
            .check_availability(1, &window(20, 24), t0)
            .await
            .unwrap();
        assert_eq!(disjoint.remaining, 5);

        // Past the review deadline the hold stops consuming, sweeper or not.
        let later = t0 + Duration::hours(3);
        let after = svc.check_availability(1, &w, later).await.unwrap();
        assert_eq!(after.consumed, 0);
        assert_eq!(after.remaining, 5);
    }

    #[tokio::test]
    async fn hold_intake_is_all_or_nothing() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        store.seed_fleet(2, "Crane C90", 1);
        let svc = service(&store);
        let w = window(10, 14);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        let err = svc
            .request_hold(order, &[line(1, 2, w), line(2, 2, w)], t0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CapacityExceeded {
                device_model_id: 2,
                requested: 2,
                remaining: 1,
            }
        ));

        // The first line's hold was unwound, nothing consumes capacity.
        let rows = svc.order_reservations(order).await.unwrap();
        assert!(rows.iter().all(|r| r.status == ReservationStatus::Cancelled));
        let snap = svc.check_availability(1, &w, t0).await.unwrap();
        assert_eq!(snap.remaining, 2);
    }

    #[tokio::test]
    async fn unknown_model_rejects_before_any_write() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();

        let err = svc
            .request_hold(
                order,
                &[line(1, 1, window(10, 12)), line(999, 1, window(10, 12))],
                day(1, 12),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
        assert!(svc.order_reservations(order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected_up_front() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();

        let err = svc
            .request_hold(order, &[line(1, 0, window(10, 12))], day(1, 12))
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidWindow(_)));
        assert!(svc.order_reservations(order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirm_binds_distinct_devices_and_promotes_the_hold() {
        let store = Arc::new(InMemoryStore::new());
        let fleet = store.seed_fleet(1, "Excavator X200", 3);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 2, window(10, 14))], t0)
            .await
            .unwrap();
        let bookings = svc.confirm_order(order, t0).await.unwrap();

        assert_eq!(bookings.len(), 2);
        let mut devices: Vec<i64> = bookings.iter().map(|b| b.device_id).collect();
        devices.sort_unstable();
        devices.dedup();
        assert_eq!(devices.len(), 2, "each unit gets its own device");
        assert!(devices.iter().all(|d| fleet.contains(d)));

        let rows = svc.order_reservations(order).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReservationStatus::Confirmed);
        assert_eq!(rows[0].expiration_time, None);
    }

    #[tokio::test]
    async fn confirm_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 3);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 2, window(10, 14))], t0)
            .await
            .unwrap();
        let first = svc.confirm_order(order, t0).await.unwrap();
        let second = svc.confirm_order(order, t0 + Duration::minutes(5)).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        let mut a: Vec<i64> = first.iter().map(|b| b.id).collect();
        let mut b: Vec<i64> = second.iter().map(|b| b.id).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b, "re-run reports the same bookings, binds nothing new");
        assert_eq!(svc.order_bookings(order).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn confirm_after_lapse_fails_and_leaves_state_alone() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 1, window(10, 14))], t0)
            .await
            .unwrap();

        let late = t0 + Duration::hours(3);
        let err = svc.confirm_order(order, late).await.unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));

        // No devices bound, status untouched (expiring is the sweeper's job).
        assert!(svc.order_bookings(order).await.unwrap().is_empty());
        let rows = svc.order_reservations(order).await.unwrap();
        assert_eq!(rows[0].status, ReservationStatus::PendingReview);
    }

    #[tokio::test]
    async fn confirm_rejects_cancelled_order() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 1, window(10, 14))], t0)
            .await
            .unwrap();
        svc.cancel_order(order, t0).await.unwrap();

        let err = svc.confirm_order(order, t0).await.unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn overlapping_orders_get_different_devices() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let w = window(10, 14);
        let t0 = day(1, 12);

        let order_a = Uuid::new_v4();
        svc.request_hold(order_a, &[line(1, 1, w)], t0).await.unwrap();
        let bound_a = svc.confirm_order(order_a, t0).await.unwrap();

        let order_b = Uuid::new_v4();
        svc.request_hold(order_b, &[line(1, 1, w)], t0).await.unwrap();
        let bound_b = svc.confirm_order(order_b, t0).await.unwrap();

        assert_ne!(
            bound_a[0].device_id, bound_b[0].device_id,
            "overlapping windows never share a device"
        );
    }

    #[tokio::test]
    async fn back_to_back_orders_reuse_the_same_device() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 1);
        let svc = service(&store);
        let t0 = day(1, 12);

        let order_a = Uuid::new_v4();
        svc.request_hold(order_a, &[line(1, 1, window(10, 14))], t0)
            .await
            .unwrap();
        let bound_a = svc.confirm_order(order_a, t0).await.unwrap();

        // Second rental starts exactly when the first ends.
        let order_b = Uuid::new_v4();
        svc.request_hold(order_b, &[line(1, 1, window(14, 18))], t0)
            .await
            .unwrap();
        let bound_b = svc.confirm_order(order_b, t0).await.unwrap();

        assert_eq!(bound_a[0].device_id, bound_b[0].device_id);
    }

    #[tokio::test]
    async fn cancellation_frees_capacity_and_the_device() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 1);
        let svc = service(&store);
        let w = window(10, 14);
        let t0 = day(1, 12);

        let order_a = Uuid::new_v4();
        svc.request_hold(order_a, &[line(1, 1, w)], t0).await.unwrap();
        let bound_a = svc.confirm_order(order_a, t0).await.unwrap();

        // Fleet of one, fully committed.
        let order_b = Uuid::new_v4();
        let err = svc
            .request_hold(order_b, &[line(1, 1, w)], t0)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::CapacityExceeded { .. }));

        let outcome = svc.cancel_order(order_a, t0).await.unwrap();
        assert_eq!(outcome.bookings_released, 1);
        assert_eq!(outcome.holds_retired, 1);

        // Capacity and the physical device are both reusable.
        svc.request_hold(order_b, &[line(1, 1, w)], t0).await.unwrap();
        let bound_b = svc.confirm_order(order_b, t0).await.unwrap();
        assert_eq!(bound_b[0].device_id, bound_a[0].device_id);
    }

    #[tokio::test]
    async fn cancel_unknown_order_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 1);
        let svc = service(&store);

        let outcome = svc.cancel_order(Uuid::new_v4(), day(1, 12)).await.unwrap();
        assert_eq!(outcome.bookings_released, 0);
        assert_eq!(outcome.holds_retired, 0);
    }

    #[tokio::test]
    async fn begin_review_extends_the_deadline_once() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 1, window(10, 14))], t0)
            .await
            .unwrap();

        let t1 = t0 + Duration::hours(1);
        assert_eq!(svc.begin_review(order, t1).await.unwrap(), 1);

        let rows = svc.order_reservations(order).await.unwrap();
        assert_eq!(rows[0].status, ReservationStatus::UnderReview);
        assert_eq!(rows[0].expiration_time, Some(t1 + Duration::hours(24)));

        // Second call finds no pending rows left.
        assert_eq!(svc.begin_review(order, t1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn begin_review_rejects_lapsed_holds() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 1, window(10, 14))], t0)
            .await
            .unwrap();

        let late = t0 + Duration::hours(3);
        let err = svc.begin_review(order, late).await.unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));

        let rows = svc.order_reservations(order).await.unwrap();
        assert_eq!(rows[0].status, ReservationStatus::PendingReview);
    }

    #[tokio::test]
    async fn confirm_resumes_an_interrupted_binding_pass() {
        let store = Arc::new(InMemoryStore::new());
        let fleet = store.seed_fleet(1, "Excavator X200", 3);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);
        let w = window(10, 14);

        let held = svc.request_hold(order, &[line(1, 2, w)], t0).await.unwrap();

        // Simulate a crash after the first device was bound.
        let detail = held[0].order_detail_id;
        BookingRepository::bind(
            store.as_ref(),
            NewBooking {
                device_id: fleet[0],
                device_model_id: 1,
                rental_order_id: order,
                order_detail_id: detail,
                window: w,
            },
            t0,
        )
        .await
        .unwrap();

        let bookings = svc.confirm_order(order, t0).await.unwrap();
        assert_eq!(bookings.len(), 2, "one kept, one freshly bound");
        let mut devices: Vec<i64> = bookings.iter().map(|b| b.device_id).collect();
        devices.sort_unstable();
        devices.dedup();
        assert_eq!(devices.len(), 2, "the pre-bound device is not re-picked");
        assert_eq!(svc.order_bookings(order).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn confirmation_beats_the_sweeper_for_an_interrupted_pass() {
        let store = Arc::new(InMemoryStore::new());
        let fleet = store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);
        let w = window(10, 14);

        let held = svc.request_hold(order, &[line(1, 2, w)], t0).await.unwrap();
        let detail = held[0].order_detail_id;

        // Devices were bound, then the process died before the promotion.
        for device_id in &fleet {
            BookingRepository::bind(
                store.as_ref(),
                NewBooking {
                    device_id: *device_id,
                    device_model_id: 1,
                    rental_order_id: order,
                    order_detail_id: detail,
                    window: w,
                },
                t0,
            )
            .await
            .unwrap();
        }

        // The sweeper reclaims the hold before anyone retries.
        let swept = ReservationRepository::sweep_expired(store.as_ref(), t0 + Duration::hours(3))
            .await
            .unwrap();
        assert_eq!(swept, 1);

        // The retry finds its devices bound and completes the confirmation.
        let bookings = svc
            .confirm_order(order, t0 + Duration::hours(4))
            .await
            .unwrap();
        assert_eq!(bookings.len(), 2);

        let rows = svc.order_reservations(order).await.unwrap();
        assert_eq!(rows[0].status, ReservationStatus::Confirmed);
        assert_eq!(rows[0].expiration_time, None);
    }

    #[tokio::test]
    async fn confirm_reports_shortage_when_fleet_shrank_after_the_hold() {
        let store = Arc::new(InMemoryStore::new());
        let fleet = store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 2, window(10, 14))], t0)
            .await
            .unwrap();

        // One unit goes to the workshop between hold and confirmation.
        store.seed_device(fleet[0], 1, DeviceStatus::Retired);

        let err = svc.confirm_order(order, t0).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CapacityExceeded {
                device_model_id: 1,
                requested: 2,
                remaining: 1,
            }
        ));
    }

    #[tokio::test]
    async fn purge_empties_both_ledgers_for_the_order() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 2);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);

        svc.request_hold(order, &[line(1, 2, window(10, 14))], t0)
            .await
            .unwrap();
        svc.confirm_order(order, t0).await.unwrap();

        let outcome = svc.purge_order(order).await.unwrap();
        assert_eq!(outcome.reservations_removed, 1);
        assert_eq!(outcome.bookings_removed, 2);
        assert!(svc.order_reservations(order).await.unwrap().is_empty());
        assert!(svc.order_bookings(order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upcoming_bookings_lists_only_starts_inside_the_window() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 3);
        let svc = service(&store);
        let t0 = day(1, 12);

        for (start, end) in [(10, 12), (11, 13), (20, 22)] {
            let order = Uuid::new_v4();
            svc.request_hold(order, &[line(1, 1, window(start, end))], t0)
                .await
                .unwrap();
            svc.confirm_order(order, t0).await.unwrap();
        }

        let page = svc
            .list_upcoming_bookings(
                &window(10, 15),
                &[BookingStatus::Scheduled],
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items[0].window.start() <= page.items[1].window.start());
    }

    #[tokio::test]
    async fn ledger_alignment_follows_the_order_lifecycle() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_fleet(1, "Excavator X200", 3);
        let svc = service(&store);
        let order = Uuid::new_v4();
        let t0 = day(1, 12);
        let w = window(10, 14);

        svc.request_hold(order, &[line(1, 2, w)], t0).await.unwrap();
        let held = svc.ledger_alignment(1, &w, t0).await.unwrap();
        assert_eq!(held.soft_consumed, 2);
        assert_eq!(held.hard_bound, 0);

        svc.confirm_order(order, t0).await.unwrap();
        let confirmed = svc.ledger_alignment(1, &w, t0).await.unwrap();
        assert_eq!(confirmed.soft_consumed, 2);
        assert_eq!(confirmed.hard_bound, 2);

        svc.cancel_order(order, t0).await.unwrap();
        let cancelled = svc.ledger_alignment(1, &w, t0).await.unwrap();
        assert_eq!(cancelled.soft_consumed, 0);
        assert_eq!(cancelled.hard_bound, 0);
    }
}
