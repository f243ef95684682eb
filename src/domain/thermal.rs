//! Thermal domain types
//!
//! Temperatures, threshold kinds and fan speed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Temperature(u32);

impl Temperature {
    /// Create a new Temperature
    pub const fn new(celsius: u32) -> Self {
        Self(celsius)
    }

    /// Get the temperature in Celsius
    #[inline]
    pub const fn as_celsius(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C", self.0)
    }
}

impl From<u32> for Temperature {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Temperature sensor (`nvmlTemperatureSensors_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureSensor {
    /// GPU die
    #[default]
    Gpu,
}

impl TemperatureSensor {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Gpu => 0,
        }
    }
}

/// Threshold kind (`nvmlTemperatureThresholds_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureThreshold {
    /// GPU shuts down
    Shutdown,
    /// Hardware slowdown begins
    Slowdown,
    /// Memory maximum operating temperature
    MemMax,
    /// GPU maximum operating temperature
    GpuMax,
    /// Minimum acoustic limit
    AcousticMin,
    /// Current acoustic limit
    AcousticCurrent,
    /// Maximum acoustic limit
    AcousticMax,
}

impl TemperatureThreshold {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Shutdown => 0,
            Self::Slowdown => 1,
            Self::MemMax => 2,
            Self::GpuMax => 3,
            Self::AcousticMin => 4,
            Self::AcousticCurrent => 5,
            Self::AcousticMax => 6,
        }
    }
}

/// GPU thermal thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThermalThresholds {
    /// Temperature at which GPU will shut down
    pub shutdown: Option<Temperature>,
    /// Temperature at which GPU will throttle
    pub slowdown: Option<Temperature>,
    /// Maximum memory operating temperature
    pub mem_max: Option<Temperature>,
    /// Maximum GPU operating temperature
    pub gpu_max: Option<Temperature>,
}

/// Intended fan speed as a percentage of maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FanSpeed(u32);

impl FanSpeed {
    /// NVML may report more than 100% on boards whose fans exceed their
    /// nominal speed, so the value is not clamped.
    pub const fn new(percent: u32) -> Self {
        Self(percent)
    }

    pub const fn as_percentage(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
