//! In-memory store for development and testing
//!
//! Implements the same ledger traits as the SeaORM repositories. Device
//! models are independent lock domains: all reservation rows of a model
//! live under one DashMap entry, and check-then-insert runs while holding
//! that entry's guard, so two holds racing for the last unit serialize.
//! Bookings shard per device id the same way.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingRepository, BookingStatus, NewBooking};
use crate::domain::device::{Device, DeviceModel, DeviceRegistry, DeviceStatus};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{NewHold, Reservation, ReservationRepository, ReservationStatus};
use crate::domain::window::TimeWindow;
use crate::domain::{AllocationError, DomainResult};
use crate::shared::pagination::{PaginatedResult, PaginationParams};

pub struct InMemoryStore {
    device_models: DashMap<i64, DeviceModel>,
    devices: DashMap<i64, Device>,
    /// Reservation rows sharded by device model id
    reservations: DashMap<i64, Vec<Reservation>>,
    /// Booking rows sharded by device id
    bookings: DashMap<i64, Vec<Booking>>,
    reservation_counter: AtomicI64,
    booking_counter: AtomicI64,
    device_counter: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            device_models: DashMap::new(),
            devices: DashMap::new(),
            reservations: DashMap::new(),
            bookings: DashMap::new(),
            reservation_counter: AtomicI64::new(1),
            booking_counter: AtomicI64::new(1),
            device_counter: AtomicI64::new(1),
        }
    }

    pub fn seed_model(&self, id: i64, name: &str, total_units: i64) {
        let now = Utc::now();
        self.device_models.insert(
            id,
            DeviceModel {
                id,
                name: name.to_string(),
                total_units,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn seed_device(&self, id: i64, device_model_id: i64, status: DeviceStatus) {
        let now = Utc::now();
        self.devices.insert(
            id,
            Device {
                id,
                device_model_id,
                serial_number: format!("SN-{:06}", id),
                status,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Seed a model together with `units` active devices; returns the
    /// device ids.
    pub fn seed_fleet(&self, model_id: i64, name: &str, units: i64) -> Vec<i64> {
        self.seed_model(model_id, name, units);
        (0..units)
            .map(|_| {
                let id = self.device_counter.fetch_add(1, Ordering::SeqCst);
                self.seed_device(id, model_id, DeviceStatus::Active);
                id
            })
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn consumed_quantity(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        at: DateTime<Utc>,
    ) -> DomainResult<i64> {
        Ok(self
            .reservations
            .get(&device_model_id)
            .map(|shard| {
                shard
                    .iter()
                    .filter(|r| r.consumes_capacity_for(window, at))
                    .map(|r| r.reserved_quantity)
                    .sum()
            })
            .unwrap_or(0))
    }

    async fn create_hold(
        &self,
        hold: NewHold,
        total_units: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        // Entry guard held for the whole check-then-insert; no await in
        // between.
        let mut shard = self.reservations.entry(hold.device_model_id).or_default();

        let consumed: i64 = shard
            .iter()
            .filter(|r| r.consumes_capacity_for(&hold.window, now))
            .map(|r| r.reserved_quantity)
            .sum();
        let remaining = (total_units - consumed).max(0);
        if hold.quantity > remaining {
            return Err(AllocationError::CapacityExceeded {
                device_model_id: hold.device_model_id,
                requested: hold.quantity,
                remaining,
            });
        }

        let reservation = Reservation {
            id: self.reservation_counter.fetch_add(1, Ordering::SeqCst),
            device_model_id: hold.device_model_id,
            rental_order_id: hold.rental_order_id,
            order_detail_id: hold.order_detail_id,
            window: hold.window,
            reserved_quantity: hold.quantity,
            status: ReservationStatus::PendingReview,
            expiration_time: Some(hold.expiration_time),
            created_at: now,
            updated_at: now,
        };
        shard.push(reservation.clone());
        Ok(reservation)
    }

    async fn transition_for_order(
        &self,
        rental_order_id: Uuid,
        from: &[ReservationStatus],
        to: ReservationStatus,
        new_expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<u64> {
        let mut affected = 0;
        for mut shard in self.reservations.iter_mut() {
            for r in shard.value_mut().iter_mut() {
                if r.rental_order_id == rental_order_id && from.contains(&r.status) {
                    r.status = to;
                    r.expiration_time = new_expiration;
                    r.updated_at = now;
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn sweep_expired(&self, reference_time: DateTime<Utc>) -> DomainResult<u64> {
        let mut flipped = 0;
        for mut shard in self.reservations.iter_mut() {
            for r in shard.value_mut().iter_mut() {
                if r.is_sweepable(reference_time) {
                    r.status = ReservationStatus::Expired;
                    r.updated_at = reference_time;
                    flipped += 1;
                }
            }
        }
        Ok(flipped)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        for shard in self.reservations.iter() {
            if let Some(r) = shard.iter().find(|r| r.id == id) {
                return Ok(Some(r.clone()));
            }
        }
        Ok(None)
    }

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Reservation>> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .filter(|r| r.rental_order_id == rental_order_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64> {
        let mut removed = 0;
        for mut shard in self.reservations.iter_mut() {
            let before = shard.len();
            shard
                .value_mut()
                .retain(|r| r.rental_order_id != rental_order_id);
            removed += (before - shard.len()) as u64;
        }
        Ok(removed)
    }
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn count_overlapping(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<i64> {
        Ok(self
            .bookings
            .iter()
            .map(|shard| {
                shard
                    .iter()
                    .filter(|b| {
                        b.device_model_id == device_model_id
                            && active.contains(&b.status)
                            && b.window.overlaps(window)
                    })
                    .count()
            })
            .sum::<usize>() as i64)
    }

    async fn find_busy_devices(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .bookings
            .iter()
            .filter(|shard| {
                shard.iter().any(|b| {
                    b.device_model_id == device_model_id
                        && active.contains(&b.status)
                        && b.window.overlaps(window)
                })
            })
            .map(|shard| *shard.key())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn find_upcoming(
        &self,
        window: &TimeWindow,
        active: &[BookingStatus],
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .filter(|b| active.contains(&b.status) && window.contains(b.window.start()))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by_key(|b| (b.window.start(), b.id));

        let total = rows.len() as u64;
        let offset = pagination
            .page
            .saturating_sub(1)
            .saturating_mul(pagination.limit) as usize;
        let items: Vec<Booking> = rows
            .into_iter()
            .skip(offset)
            .take(pagination.limit as usize)
            .collect();

        Ok(PaginatedResult::new(
            items,
            total,
            pagination.page,
            pagination.limit,
        ))
    }

    async fn bind(&self, b: NewBooking, now: DateTime<Utc>) -> DomainResult<Booking> {
        // Entry guard held for the conflict check and the insert.
        let mut shard = self.bookings.entry(b.device_id).or_default();

        if shard.iter().any(|existing| existing.blocks(&b.window)) {
            return Err(AllocationError::DeviceConflict {
                device_id: b.device_id,
            });
        }

        let booking = Booking {
            id: self.booking_counter.fetch_add(1, Ordering::SeqCst),
            device_id: b.device_id,
            device_model_id: b.device_model_id,
            rental_order_id: b.rental_order_id,
            order_detail_id: b.order_detail_id,
            window: b.window,
            status: BookingStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        shard.push(booking.clone());
        Ok(booking)
    }

    async fn release_by_order(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<u64> {
        let mut affected = 0;
        for mut shard in self.bookings.iter_mut() {
            for b in shard.value_mut().iter_mut() {
                if b.rental_order_id == rental_order_id && b.status.is_active() {
                    b.status = BookingStatus::Cancelled;
                    b.updated_at = now;
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn release_by_ids(&self, ids: &[i64], now: DateTime<Utc>) -> DomainResult<u64> {
        let mut affected = 0;
        for mut shard in self.bookings.iter_mut() {
            for b in shard.value_mut().iter_mut() {
                if ids.contains(&b.id) && b.status.is_active() {
                    b.status = BookingStatus::Cancelled;
                    b.updated_at = now;
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Booking>> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .filter(|b| b.rental_order_id == rental_order_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by_key(|b| b.id);
        Ok(rows)
    }

    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64> {
        let mut removed = 0;
        for mut shard in self.bookings.iter_mut() {
            let before = shard.len();
            shard
                .value_mut()
                .retain(|b| b.rental_order_id != rental_order_id);
            removed += (before - shard.len()) as u64;
        }
        Ok(removed)
    }
}

// ── DeviceRegistry impl ─────────────────────────────────────────

#[async_trait]
impl DeviceRegistry for InMemoryStore {
    async fn total_units(&self, device_model_id: i64) -> DomainResult<i64> {
        self.device_models
            .get(&device_model_id)
            .map(|m| m.total_units)
            .ok_or(AllocationError::NotFound {
                entity: "DeviceModel",
                field: "id",
                value: device_model_id.to_string(),
            })
    }

    async fn list_device_ids(&self, device_model_id: i64) -> DomainResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .devices
            .iter()
            .filter(|d| d.device_model_id == device_model_id && d.is_assignable())
            .map(|d| d.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn find_model(&self, device_model_id: i64) -> DomainResult<Option<DeviceModel>> {
        Ok(self
            .device_models
            .get(&device_model_id)
            .map(|m| m.value().clone()))
    }

    async fn find_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        Ok(self.devices.get(&device_id).map(|d| d.value().clone()))
    }
}

impl RepositoryProvider for InMemoryStore {
    fn reservations(&self) -> &dyn ReservationRepository {
        self
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self
    }
}

// ── Tests ──────────────────────────────────────────────────────
