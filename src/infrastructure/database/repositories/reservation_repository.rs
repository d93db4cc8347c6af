//! SeaORM implementation of ReservationRepository
//!
//! The capacity read and the hold insert run inside one transaction, so a
//! concurrent writer either sees the new hold or blocks until the engine
//! settles the race. Lock and serialization failures surface as
//! `ConcurrencyConflict` for the coordinator's retry loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, UpdateResult,
};
use log::debug;
use uuid::Uuid;

use crate::domain::reservation::{NewHold, Reservation, ReservationRepository, ReservationStatus};
use crate::domain::window::TimeWindow;
use crate::domain::{AllocationError, DomainResult};
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    Ok(Reservation {
        id: m.id,
        device_model_id: m.device_model_id,
        rental_order_id: m.rental_order_id,
        order_detail_id: m.order_detail_id,
        window: TimeWindow::new(m.start_time, m.end_time)?,
        reserved_quantity: m.reserved_quantity,
        status: ReservationStatus::from_str(&m.status),
        expiration_time: m.expiration_time,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn db_err(e: sea_orm::DbErr) -> AllocationError {
    AllocationError::from_db(e)
}

fn status_strs(statuses: &[ReservationStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

/// Capacity query shared by the standalone read and the transactional
/// check inside `create_hold`.
async fn consumed_in<C: ConnectionTrait>(
    conn: &C,
    device_model_id: i64,
    window: &TimeWindow,
    at: DateTime<Utc>,
) -> Result<i64, sea_orm::DbErr> {
    #[derive(FromQueryResult)]
    struct SumRow {
        total: Option<i64>,
    }

    let row = reservation::Entity::find()
        .select_only()
        .column_as(reservation::Column::ReservedQuantity.sum(), "total")
        .filter(reservation::Column::DeviceModelId.eq(device_model_id))
        .filter(reservation::Column::Status.is_in(status_strs(ReservationStatus::CAPACITY_CONSUMING)))
        .filter(reservation::Column::StartTime.lt(window.end()))
        .filter(reservation::Column::EndTime.gt(window.start()))
        .filter(
            Condition::any()
                .add(reservation::Column::ExpirationTime.is_null())
                .add(reservation::Column::ExpirationTime.gt(at)),
        )
        .into_model::<SumRow>()
        .one(conn)
        .await?;

    Ok(row.and_then(|r| r.total).unwrap_or(0))
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn consumed_quantity(
        &self,
        device_model_id: i64,
        window: &TimeWindow,
        at: DateTime<Utc>,
    ) -> DomainResult<i64> {
        consumed_in(&self.db, device_model_id, window, at)
            .await
            .map_err(db_err)
    }

    async fn create_hold(
        &self,
        hold: NewHold,
        total_units: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        debug!(
            "Creating hold: model={}, order={}, qty={}",
            hold.device_model_id, hold.rental_order_id, hold.quantity
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        let consumed = consumed_in(&txn, hold.device_model_id, &hold.window, now)
            .await
            .map_err(db_err)?;
        let remaining = (total_units - consumed).max(0);
        if hold.quantity > remaining {
            txn.rollback().await.map_err(db_err)?;
            return Err(AllocationError::CapacityExceeded {
                device_model_id: hold.device_model_id,
                requested: hold.quantity,
                remaining,
            });
        }

        let model = reservation::ActiveModel {
            id: Default::default(), // auto-increment
            device_model_id: Set(hold.device_model_id),
            rental_order_id: Set(hold.rental_order_id),
            order_detail_id: Set(hold.order_detail_id),
            start_time: Set(hold.window.start()),
            end_time: Set(hold.window.end()),
            reserved_quantity: Set(hold.quantity),
            status: Set(ReservationStatus::PendingReview.as_str().to_string()),
            expiration_time: Set(Some(hold.expiration_time)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = model.insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        model_to_domain(inserted)
    }

    async fn transition_for_order(
        &self,
        rental_order_id: Uuid,
        from: &[ReservationStatus],
        to: ReservationStatus,
        new_expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<u64> {
        debug!(
            "Transitioning reservations: order={}, to={}",
            rental_order_id, to
        );

        let result: UpdateResult = reservation::Entity::update_many()
            .col_expr(
                reservation::Column::Status,
                sea_orm::sea_query::Expr::value(to.as_str()),
            )
            .col_expr(
                reservation::Column::ExpirationTime,
                sea_orm::sea_query::Expr::value(new_expiration),
            )
            .col_expr(
                reservation::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(reservation::Column::RentalOrderId.eq(rental_order_id))
            .filter(reservation::Column::Status.is_in(status_strs(from)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn sweep_expired(&self, reference_time: DateTime<Utc>) -> DomainResult<u64> {
        let result: UpdateResult = reservation::Entity::update_many()
            .col_expr(
                reservation::Column::Status,
                sea_orm::sea_query::Expr::value(ReservationStatus::Expired.as_str()),
            )
            .col_expr(
                reservation::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(reference_time),
            )
            .filter(
                reservation::Column::Status
                    .is_in(status_strs(ReservationStatus::PRE_CONFIRMATION)),
            )
            .filter(reservation::Column::ExpirationTime.is_not_null())
            .filter(reservation::Column::ExpirationTime.lte(reference_time))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_by_order(&self, rental_order_id: Uuid) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::RentalOrderId.eq(rental_order_id))
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn delete_by_order(&self, rental_order_id: Uuid) -> DomainResult<u64> {
        debug!("Purging reservations: order={}", rental_order_id);

        let result = reservation::Entity::delete_many()
            .filter(reservation::Column::RentalOrderId.eq(rental_order_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
