//! Half-open time window
//!
//! All interval arithmetic in the engine runs on `[start, end)` windows.
//! Boundary touch is never a conflict: a window ending at 11:00 and one
//! starting at 11:00 do not overlap, so a device can be re-rented the
//! instant a prior booking ends.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::AllocationError;

/// Validated half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `start >= end` before anything touches a
    /// ledger.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AllocationError> {
        if start >= end {
            return Err(AllocationError::InvalidWindow(format!(
                "start {} must be strictly before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && e1 > s2`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Same predicate against raw bounds, for rows that carry bare columns.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Whether `instant` falls inside the window (`start` inclusive, `end`
    /// exclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
    }

    fn window(start: u32, end: u32) -> TimeWindow {
        TimeWindow::new(day(start), day(end)).unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        let err = TimeWindow::new(day(3), day(2)).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidWindow(_)));
    }

    #[test]
    fn rejects_empty_window() {
        let err = TimeWindow::new(day(2), day(2)).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidWindow(_)));
    }

    #[test]
    fn partial_overlap_detected() {
        // Mon-Wed vs Tue-Thu
        assert!(window(1, 3).overlaps(&window(2, 4)));
        assert!(window(2, 4).overlaps(&window(1, 3)));
    }

    #[test]
    fn containment_is_overlap() {
        assert!(window(1, 10).overlaps(&window(3, 4)));
    }

    #[test]
    fn boundary_touch_is_not_overlap() {
        // [Mon,Wed) then [Wed,Fri): back-to-back rentals, no conflict.
        assert!(!window(1, 3).overlaps(&window(3, 5)));
        assert!(!window(3, 5).overlaps(&window(1, 3)));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        assert!(!window(1, 2).overlaps(&window(4, 5)));
    }

    #[test]
    fn contains_start_excludes_end() {
        let w = window(1, 3);
        assert!(w.contains(day(1)));
        assert!(w.contains(day(2)));
        assert!(!w.contains(day(3)));
    }

    #[test]
    fn overlaps_range_matches_overlaps() {
        let w = window(1, 3);
        assert!(w.overlaps_range(day(2), day(4)));
        assert!(!w.overlaps_range(day(3), day(4)));
    }
}
