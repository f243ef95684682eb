//! Power domain types
//!
//! NVML reports and accepts power in milliwatts; these types keep that unit
//! and only convert for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power value in milliwatts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PowerLimit(u32);

impl PowerLimit {
    /// Create a new power limit from watts
    pub const fn from_watts(watts: u32) -> Self {
        Self(watts * 1000)
    }

    /// Create a new power limit from milliwatts
    pub const fn from_milliwatts(mw: u32) -> Self {
        Self(mw)
    }

    /// Get the power limit in watts
    #[inline]
    pub const fn as_watts(&self) -> u32 {
        self.0 / 1000
    }

    /// Get the power limit in milliwatts
    #[inline]
    pub const fn as_milliwatts(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PowerLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 1000 == 0 {
            write!(f, "{}W", self.as_watts())
        } else {
            write!(f, "{:.2}W", self.0 as f64 / 1000.0)
        }
    }
}

/// Range accepted by `nvmlDeviceSetPowerManagementLimit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerConstraints {
    /// Minimum power limit
    pub min: PowerLimit,
    /// Maximum power limit
    pub max: PowerLimit,
}

impl PowerConstraints {
    /// Create new power constraints
    pub fn new(min: PowerLimit, max: PowerLimit) -> Self {
        Self { min, max }
    }

    /// Check if a power limit is within constraints
    pub fn contains(&self, limit: &PowerLimit) -> bool {
        limit >= &self.min && limit <= &self.max
    }
}

impl fmt::Display for PowerConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_limit_units() {
        let limit = PowerLimit::from_watts(300);
        assert_eq!(limit.as_watts(), 300);
        assert_eq!(limit.as_milliwatts(), 300_000);
        assert_eq!(PowerLimit::from_milliwatts(71_250).as_watts(), 71);
    }

    #[test]
    fn test_power_limit_display() {
        assert_eq!(PowerLimit::from_watts(350).to_string(), "350W");
        assert_eq!(PowerLimit::from_milliwatts(71_250).to_string(), "71.25W");
    }

    #[test]
    fn test_power_constraints_contains() {
        let constraints =
            PowerConstraints::new(PowerLimit::from_watts(100), PowerLimit::from_watts(400));

        assert!(constraints.contains(&PowerLimit::from_watts(200)));
        assert!(constraints.contains(&PowerLimit::from_watts(100)));
        assert!(constraints.contains(&PowerLimit::from_watts(400)));
        assert!(!constraints.contains(&PowerLimit::from_watts(50)));
        assert!(!constraints.contains(&PowerLimit::from_milliwatts(400_001)));
        assert_eq!(constraints.to_string(), "100W-400W");
    }
}
