//! Application services

mod allocation;
mod selection;
mod sweeper;

pub use allocation::{
    AllocationPolicy, AllocationService, Availability, CancellationOutcome, HoldLine,
    LedgerAlignment, PurgeOutcome,
};
pub use selection::{DevicePicker, FirstAvailable, RandomPick};
pub use sweeper::{run_sweep_once, start_expiry_sweeper_task};
