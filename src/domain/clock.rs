//! Clock domain types
//!
//! Clock domains, clock ids, throttle reasons and auto boost state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// GPU clock speed in MHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ClockSpeed(u32);

impl ClockSpeed {
    /// Create a new clock speed value
    pub fn new(mhz: u32) -> Self {
        Self(mhz)
    }

    /// Get clock speed in MHz
    pub fn as_mhz(&self) -> u32 {
        self.0
    }

    /// Get clock speed in GHz
    pub fn as_ghz(&self) -> f32 {
        self.0 as f32 / 1000.0
    }
}

impl fmt::Display for ClockSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.0)
    }
}

/// Clock domain (`nvmlClockType_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockType {
    /// Graphics clock
    Graphics,
    /// Streaming Multiprocessor clock
    SM,
    /// Memory clock
    Memory,
    /// Video encoder/decoder clock
    Video,
}

impl ClockType {
    /// All clock domains, in NVML order
    pub const ALL: [ClockType; 4] = [Self::Graphics, Self::SM, Self::Memory, Self::Video];

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Graphics => 0,
            Self::SM => 1,
            Self::Memory => 2,
            Self::Video => 3,
        }
    }
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphics => write!(f, "Graphics"),
            Self::SM => write!(f, "SM"),
            Self::Memory => write!(f, "Memory"),
            Self::Video => write!(f, "Video"),
        }
    }
}

/// Which value of a clock domain to read (`nvmlClockId_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockId {
    /// Current actual clock
    #[default]
    Current,
    /// Target applications clock
    AppClockTarget,
    /// Default applications clock
    AppClockDefault,
    /// OEM-defined maximum
    CustomerBoostMax,
}

impl ClockId {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Current => 0,
            Self::AppClockTarget => 1,
            Self::AppClockDefault => 2,
            Self::CustomerBoostMax => 3,
        }
    }
}

/// Current and supported values of every clock domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockReading {
    pub current: Option<ClockSpeed>,
    pub max: Option<ClockSpeed>,
    pub applications: Option<ClockSpeed>,
    pub default_applications: Option<ClockSpeed>,
}

/// Reasons why the GPU clocks are being held down
///
/// Decoded from the `nvmlClocksThrottleReason*` bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThrottleReasons {
    /// GPU is idle
    pub idle: bool,
    /// Applications clocks setting
    pub applications_clocks_setting: bool,
    /// Software power cap
    pub sw_power_cap: bool,
    /// Hardware slowdown (temperature/power)
    pub hw_slowdown: bool,
    /// Sync boost
    pub sync_boost: bool,
    /// Software thermal slowdown
    pub sw_thermal: bool,
    /// Hardware thermal slowdown
    pub hw_thermal: bool,
    /// Hardware power brake
    pub hw_power_brake: bool,
    /// Display clock setting
    pub display_clocks: bool,
}

impl ThrottleReasons {
    pub const IDLE: u64 = 0x1;
    pub const APPLICATIONS_CLOCKS_SETTING: u64 = 0x2;
    pub const SW_POWER_CAP: u64 = 0x4;
    pub const HW_SLOWDOWN: u64 = 0x8;
    pub const SYNC_BOOST: u64 = 0x10;
    pub const SW_THERMAL_SLOWDOWN: u64 = 0x20;
    pub const HW_THERMAL_SLOWDOWN: u64 = 0x40;
    pub const HW_POWER_BRAKE_SLOWDOWN: u64 = 0x80;
    pub const DISPLAY_CLOCK_SETTING: u64 = 0x100;

    /// Decode the NVML bit mask
    pub fn from_bits(bits: u64) -> Self {
        Self {
            idle: bits & Self::IDLE != 0,
            applications_clocks_setting: bits & Self::APPLICATIONS_CLOCKS_SETTING != 0,
            sw_power_cap: bits & Self::SW_POWER_CAP != 0,
            hw_slowdown: bits & Self::HW_SLOWDOWN != 0,
            sync_boost: bits & Self::SYNC_BOOST != 0,
            sw_thermal: bits & Self::SW_THERMAL_SLOWDOWN != 0,
            hw_thermal: bits & Self::HW_THERMAL_SLOWDOWN != 0,
            hw_power_brake: bits & Self::HW_POWER_BRAKE_SLOWDOWN != 0,
            display_clocks: bits & Self::DISPLAY_CLOCK_SETTING != 0,
        }
    }

    /// Check if any throttling is active
    pub fn is_throttling(&self) -> bool {
        self.sw_power_cap
            || self.hw_slowdown
            || self.sw_thermal
            || self.hw_thermal
            || self.hw_power_brake
    }

    /// Get a list of active throttle reasons
    pub fn active_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.idle {
            reasons.push("Idle");
        }
        if self.applications_clocks_setting {
            reasons.push("App Clocks");
        }
        if self.sw_power_cap {
            reasons.push("Power Cap");
        }
        if self.hw_slowdown {
            reasons.push("HW Slowdown");
        }
        if self.sw_thermal {
            reasons.push("SW Thermal");
        }
        if self.hw_thermal {
            reasons.push("HW Thermal");
        }
        if self.hw_power_brake {
            reasons.push("Power Brake");
        }
        if self.sync_boost {
            reasons.push("Sync Boost");
        }
        if self.display_clocks {
            reasons.push("Display Clocks");
        }
        reasons
    }
}

/// Auto boosted clocks state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoBoostState {
    /// Currently enabled
    pub enabled: bool,
    /// Enabled by default
    pub default_enabled: bool,
}
