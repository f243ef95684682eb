//! Performance and utilization domain types
//!
//! Types for P-states, utilization rates, encoder statistics and
//! performance policy violation counters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// GPU and memory utilization rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Utilization {
    /// GPU compute utilization (0-100%)
    pub gpu: u8,
    /// Memory bandwidth utilization (0-100%)
    pub memory: u8,
}

impl Utilization {
    /// Create a new utilization value
    pub fn new(gpu: u32, memory: u32) -> Self {
        Self {
            gpu: gpu.min(100) as u8,
            memory: memory.min(100) as u8,
        }
    }
}

/// Video encoder or decoder utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecUtilization {
    /// Utilization (0-100%)
    pub utilization: u8,
    /// Sampling period in microseconds
    pub sampling_period_us: u32,
}

impl CodecUtilization {
    /// Create new codec utilization
    pub fn new(utilization: u32, sampling_period_us: u32) -> Self {
        Self {
            utilization: utilization.min(100) as u8,
            sampling_period_us,
        }
    }

    /// Get utilization as percentage
    pub fn percent(&self) -> u8 {
        self.utilization
    }
}

/// Encoder session statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncoderStats {
    /// Active encoder sessions
    pub session_count: u32,
    /// Trailing average frames per second across sessions
    pub average_fps: u32,
    /// Trailing average latency in microseconds
    pub average_latency_us: u32,
}

/// GPU performance state (P-state)
///
/// Lower numbers = higher performance, higher power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PerformanceState {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
    P11,
    P12,
    P13,
    P14,
    P15,
    #[default]
    Unknown,
}

impl PerformanceState {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::P0,
            1 => Self::P1,
            2 => Self::P2,
            3 => Self::P3,
            4 => Self::P4,
            5 => Self::P5,
            6 => Self::P6,
            7 => Self::P7,
            8 => Self::P8,
            9 => Self::P9,
            10 => Self::P10,
            11 => Self::P11,
            12 => Self::P12,
            13 => Self::P13,
            14 => Self::P14,
            15 => Self::P15,
            _ => Self::Unknown,
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::P0 => 0,
            Self::P1 => 1,
            Self::P2 => 2,
            Self::P3 => 3,
            Self::P4 => 4,
            Self::P5 => 5,
            Self::P6 => 6,
            Self::P7 => 7,
            Self::P8 => 8,
            Self::P9 => 9,
            Self::P10 => 10,
            Self::P11 => 11,
            Self::P12 => 12,
            Self::P13 => 13,
            Self::P14 => 14,
            Self::P15 => 15,
            Self::Unknown => 32,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::P0 => "Maximum Performance",
            Self::P1 => "High Performance",
            Self::P2 => "Balanced",
            Self::P3 | Self::P4 | Self::P5 | Self::P6 | Self::P7 => "Adaptive",
            Self::P8 | Self::P9 | Self::P10 | Self::P11 => "Power Saving",
            Self::P12 => "Minimum Performance",
            Self::P13 | Self::P14 | Self::P15 => "Very Low Power",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PerformanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            _ => write!(f, "P{}", self.as_raw()),
        }
    }
}

/// Performance policy whose violations are counted (`nvmlPerfPolicyType_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerfPolicy {
    Power,
    Thermal,
    SyncBoost,
    BoardLimit,
    LowUtilization,
    Reliability,
    TotalApplicationsClocks,
    TotalBaseClocks,
}

impl PerfPolicy {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Power => 0,
            Self::Thermal => 1,
            Self::SyncBoost => 2,
            Self::BoardLimit => 3,
            Self::LowUtilization => 4,
            Self::Reliability => 5,
            Self::TotalApplicationsClocks => 10,
            Self::TotalBaseClocks => 11,
        }
    }
}

/// Time spent held back by a performance policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationTime {
    /// Timestamp the counter is relative to, in nanoseconds
    pub reference_time_ns: u64,
    /// Accumulated violation time in nanoseconds
    pub violation_time_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_clamp() {
        let util = Utilization::new(150, 40);
        assert_eq!(util.gpu, 100);
        assert_eq!(util.memory, 40);
    }

    #[test]
    fn test_codec_utilization() {
        let encoder = CodecUtilization::new(75, 1000);
        assert_eq!(encoder.percent(), 75);
        assert_eq!(encoder.sampling_period_us, 1000);
        assert_eq!(CodecUtilization::new(200, 1000).percent(), 100);
    }

    #[test]
    fn test_performance_state() {
        assert_eq!(PerformanceState::from_raw(0), PerformanceState::P0);
        assert_eq!(PerformanceState::from_raw(8), PerformanceState::P8);
        assert_eq!(PerformanceState::from_raw(32), PerformanceState::Unknown);
        assert_eq!(PerformanceState::P0.description(), "Maximum Performance");
        assert_eq!(PerformanceState::P8.to_string(), "P8");
    }

    #[test]
    fn test_perf_policy_raw() {
        assert_eq!(PerfPolicy::Reliability.as_raw(), 5);
        assert_eq!(PerfPolicy::TotalApplicationsClocks.as_raw(), 10);
        assert_eq!(PerfPolicy::TotalBaseClocks.as_raw(), 11);
    }
}
