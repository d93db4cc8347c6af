//! Reservation domain entity
//!
//! A reservation is a soft, quantity-based hold on a device model over a
//! half-open window. It claims capacity without naming physical devices;
//! binding specific devices happens later, at confirmation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::window::TimeWindow;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Hold created at order intake, awaiting staff review
    PendingReview,
    /// Staff has started processing the order
    UnderReview,
    /// Order accepted and devices bound
    Confirmed,
    /// Reclaimed by the expiry sweeper (terminal)
    Expired,
    /// Order rejected or cancelled (terminal)
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that count toward capacity consumption.
    pub const CAPACITY_CONSUMING: &'static [ReservationStatus] =
        &[Self::PendingReview, Self::UnderReview, Self::Confirmed];

    /// Soft holds that have not been confirmed yet; the only statuses the
    /// sweeper may expire.
    pub const PRE_CONFIRMATION: &'static [ReservationStatus] =
        &[Self::PendingReview, Self::UnderReview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "PendingReview",
            Self::UnderReview => "UnderReview",
            Self::Confirmed => "Confirmed",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Unknown strings map to `Cancelled` so a corrupt row can never consume
    /// capacity.
    pub fn from_str(s: &str) -> Self {
        match s {
            "PendingReview" => Self::PendingReview,
            "UnderReview" => Self::UnderReview,
            "Confirmed" => Self::Confirmed,
            "Expired" => Self::Expired,
            "Cancelled" => Self::Cancelled,
            _ => Self::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled)
    }

    pub fn consumes_capacity(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Soft capacity hold on a device model
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Unique reservation ID
    pub id: i64,
    /// Device model whose capacity is held
    pub device_model_id: i64,
    /// Owning rental order (back-reference, drives bulk transitions)
    pub rental_order_id: Uuid,
    /// Owning order line (back-reference only, not an ownership edge)
    pub order_detail_id: Uuid,
    /// Held window `[start, end)`
    pub window: TimeWindow,
    /// Units held, >= 1
    pub reserved_quantity: i64,
    /// Current status
    pub status: ReservationStatus,
    /// Deadline after which an unconfirmed hold stops consuming capacity.
    /// Always set for PendingReview/UnderReview, cleared at confirmation.
    pub expiration_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the hold still counts at `at`: either no deadline or a
    /// deadline strictly in the future.
    pub fn is_fresh(&self, at: DateTime<Utc>) -> bool {
        match self.expiration_time {
            None => true,
            Some(deadline) => deadline > at,
        }
    }

    /// The capacity predicate: non-terminal status, window overlap, and
    /// freshness at the reference time. Expired-but-unswept holds fail the
    /// freshness clause, so availability never waits on the sweeper.
    pub fn consumes_capacity_for(&self, window: &TimeWindow, at: DateTime<Utc>) -> bool {
        self.status.consumes_capacity() && self.window.overlaps(window) && self.is_fresh(at)
    }

    /// Whether the sweeper would flip this row at `at`. Only unconfirmed
    /// holds qualify; confirmation clears the deadline and takes the row
    /// out of reach permanently.
    pub fn is_sweepable(&self, at: DateTime<Utc>) -> bool {
        ReservationStatus::PRE_CONFIRMATION.contains(&self.status)
            && matches!(self.expiration_time, Some(deadline) if deadline <= at)
    }
}

// ── Tests ──────────────────────────────────────────────────────
