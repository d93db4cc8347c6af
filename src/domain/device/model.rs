//! Device fleet entities
//!
//! The fleet is owned by the wider rental platform; this crate only reads it.
//! A device model describes a product line ("PCR thermal cycler, rev B") and
//! carries the unit count that capacity math runs against. A device is one
//! physical serial-numbered unit of a model.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Active,
    /// Pulled from the fleet; never offered for assignment.
    Retired,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "Active",
            DeviceStatus::Retired => "Retired",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Active" => DeviceStatus::Active,
            _ => DeviceStatus::Retired,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DeviceModel {
    pub id: i64,
    pub name: String,
    /// Fleet size for capacity checks. Kept in sync with the device table by
    /// the platform, not by this crate.
    pub total_units: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Device {
    pub id: i64,
    pub device_model_id: i64,
    pub serial_number: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn is_assignable(&self) -> bool {
        self.status == DeviceStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retired_device_is_not_assignable() {
        let device = Device {
            id: 1,
            device_model_id: 1,
            serial_number: "SN-0001".into(),
            status: DeviceStatus::Retired,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!device.is_assignable());
    }

    #[test]
    fn unknown_status_string_maps_to_retired() {
        assert_eq!(DeviceStatus::from_str("weird"), DeviceStatus::Retired);
    }
}
