//! SeaORM implementation of BookingRepository
//!
//! `bind` runs its conflict check and insert in one transaction, which keeps
//! a device from ever carrying two active overlapping bookings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, UpdateResult,
};
use log::debug;
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingRepository, BookingStatus, NewBooking};
use crate::domain::window::TimeWindow;
use crate::domain::{AllocationError, DomainResult};
use crate::infrastructure::database::entities::booking;
use crate::shared::pagination::{PaginatedResult, PaginationParams};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    Ok(Booking {
        id: m.id,
        device_id: m.device_id,
        device_model_id: m.device_model_id,
        rental_order_id: m.rental_order_id,
        order_detail_id: m.order_detail_id,
        window: TimeWindow::new(m.start_time, m.end_time)?,
        status: BookingStatus::from_str(&m.status),
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn db_err(e: sea_orm::DbErr) -> AllocationError {
    AllocationError::from_db(e)
}

fn status_strs(statuses: &[BookingStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

/// Per-device overlap count for the transactional conflict check inside
/// `bind`. Scheduled is the one status that blocks a device.
async fn overlapping_in<C: ConnectionTrait>(
    conn: &C,
    device_id: i64,
    window: &TimeWindow,
) -> Result<u64, sea_orm::DbErr> {
    booking::Entity::find()
        .filter(booking::Column::DeviceId.eq(device_id))
        .filter(booking::Column::Status.eq(BookingStatus::Scheduled.as_str()))
        .filter(booking::Column::StartTime.lt(window.end()))
        .filter(booking::Column::EndTime.gt(window.start()))
        .count(conn)
        .await
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn count_overlapping(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<i64> {
        let count = booking::Entity::find()
            .filter(booking::Column::DeviceModelId.eq(device_model_id))
            .filter(booking::Column::Status.is_in(status_strs(active)))
            .filter(booking::Column::StartTime.lt(window.end()))
            .filter(booking::Column::EndTime.gt(window.start()))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count as i64)
    }

    async fn find_busy_devices(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        active: &[BookingStatus],
    ) -> DomainResult<Vec<i64>> {
        let ids: Vec<i64> = booking::Entity::find()
            .select_only()
            .column(booking::Column::DeviceId)
            .distinct()
            .filter(booking::Column::DeviceModelId.eq(device_model_id))
            .filter(booking::Column::Status.is_in(status_strs(active)))
            .filter(booking::Column::StartTime.lt(window.end()))
            .filter(booking::Column::EndTime.gt(window.start()))
            .order_by_asc(booking::Column::DeviceId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(ids)
    }

    async fn find_upcoming(
        &self,
        window: &TimeWindow,
        active: &[BookingStatus],
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let paginator = booking::Entity::find()
            .filter(booking::Column::Status.is_in(status_strs(active)))
            .filter(booking::Column::StartTime.gte(window.start()))
            .filter(booking::Column::StartTime.lt(window.end()))
            .order_by_asc(booking::Column::StartTime)
            .order_by_asc(booking::Column::Id)
            .paginate(&self.db, pagination.limit);

        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator
            .fetch_page(pagination.page.saturating_sub(1))
            .await
            .map_err(db_err)?;

        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(
            items,
            total,
            pagination.page,
            pagination.limit,
        ))
    }

    async fn bind(&self, b: NewBooking, now: DateTime<Utc>) -> DomainResult<Booking> {
        debug!(
            "Binding device: device={}, order={}, window={}",
            b.device_id, b.rental_order_id, b.window
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        let overlapping = overlapping_in(&txn, b.device_id, &b.window)
            .await
            .map_err(db_err)?;
        if overlapping > 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(AllocationError::DeviceConflict {
                device_id: b.device_id,
            });
        }

        let model = booking::ActiveModel {
            id: Default::default(), // auto-increment
            device_id: Set(b.device_id),
            device_model_id: Set(b.device_model_id),
            rental_order_id: Set(b.rental_order_id),
            order_detail_id: Set(b.order_detail_id),
            start_time: Set(b.window.start()),
            end_time: Set(b.window.end()),
            status: Set(BookingStatus::Scheduled.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = model.insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        model_to_domain(inserted)
    }

    async fn release_by_order(
        &self,
        rental_order_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<u64> {
        debug!("Releasing bookings: order={}", rental_order_id);

        let result: UpdateResult = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                sea_orm::sea_query::Expr::value(BookingStatus::Cancelled.as_str()),
            )
            .col_expr(
                booking::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(booking::Column::RentalOrderId.eq(rental_order_id))
            .filter(booking::Column::Status.eq(BookingStatus::Scheduled.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn release_by_ids(&self, ids: &[i64], now: DateTime<Utc>) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result: UpdateResult = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                sea_orm::sea_query::Expr::value(BookingStatus::Cancelled.as_str()),
            )
            .col_expr(
                booking::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(booking::Column::Id.is_in(ids.iter().copied()))
            .filter(booking::Column::Status.eq(BookingStatus::Scheduled.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::RentalOrderId.eq(rental_order_id))
            .order_by_asc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64> {
        debug!("Purging bookings: order={}", rental_order_id);

        let result = booking::Entity::delete_many()
            .filter(booking::Column::RentalOrderId.eq(rental_order_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
