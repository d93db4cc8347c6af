//! Booking domain model
//!
//! A booking is the hard counterpart of a reservation: it pins one concrete
//! device to one order line for a window. Bookings exist only for confirmed
//! orders, so their lifecycle is much simpler than a reservation's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::window::TimeWindow;

// ── Booking status ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Device is committed to the order for the window.
    Scheduled,
    /// Assignment was released; the device is free again for the window.
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "Scheduled",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Unknown strings map to Cancelled so a corrupt row can never block
    /// a device.
    pub fn from_str(s: &str) -> Self {
        match s {
            "Scheduled" => BookingStatus::Scheduled,
            _ => BookingStatus::Cancelled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Scheduled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Booking ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub device_id: i64,
    pub device_model_id: i64,
    pub rental_order_id: Uuid,
    pub order_detail_id: Uuid,
    pub window: TimeWindow,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// True when this booking keeps its device busy somewhere inside `window`.
    pub fn blocks(&self, window: &TimeWindow) -> bool {
        self.status.is_active() && self.window.overlaps(window)
    }
}
