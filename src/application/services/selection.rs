//! Device selection strategies for booking confirmation
//!
//! When an order is confirmed the coordinator has a pool of free device ids
//! and needs to pick `quantity` of them. The strategy is pluggable so that
//! deployments can choose deterministic assignment (predictable for tests
//! and support staff) or randomized assignment (spreads wear across the
//! fleet).

use rand::seq::SliceRandom;

/// Picks concrete devices out of a pool of free candidates.
///
/// Implementations must return at most `quantity` ids, each taken from
/// `candidates`, without duplicates. Returning fewer than `quantity` ids
/// is allowed only when the pool itself is too small.
pub trait DevicePicker: Send + Sync {
    fn pick(&self, candidates: &[i64], quantity: usize) -> Vec<i64>;
}

/// Deterministic strategy: take the lowest-id free devices first.
///
/// Keeps assignment stable across runs, which makes conflict scenarios
/// reproducible and tends to concentrate bookings on the front of the
/// fleet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl DevicePicker for FirstAvailable {
    fn pick(&self, candidates: &[i64], quantity: usize) -> Vec<i64> {
        candidates.iter().take(quantity).copied().collect()
    }
}

/// Randomized strategy: sample devices uniformly from the free pool.
///
/// Spreads usage across the fleet and reduces contention when several
/// confirmations race for the same device model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPick;

impl DevicePicker for RandomPick {
    fn pick(&self, candidates: &[i64], quantity: usize) -> Vec<i64> {
        let mut rng = rand::thread_rng();
        candidates
            .choose_multiple(&mut rng, quantity)
            .copied()
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────
