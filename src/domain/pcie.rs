//! PCIe domain types for the GPU interconnect

use crate::error::NvmlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// PCIe generation (version)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PcieGeneration {
    /// PCIe Gen 1 (2.5 GT/s per lane)
    Gen1,
    /// PCIe Gen 2 (5.0 GT/s per lane)
    Gen2,
    /// PCIe Gen 3 (8.0 GT/s per lane)
    Gen3,
    /// PCIe Gen 4 (16.0 GT/s per lane)
    Gen4,
    /// PCIe Gen 5 (32.0 GT/s per lane)
    Gen5,
    /// PCIe Gen 6 (64.0 GT/s per lane)
    Gen6,
}

impl PcieGeneration {
    /// Create from the generation number NVML reports
    pub fn from_raw(value: u32) -> Result<Self, NvmlError> {
        match value {
            1 => Ok(Self::Gen1),
            2 => Ok(Self::Gen2),
            3 => Ok(Self::Gen3),
            4 => Ok(Self::Gen4),
            5 => Ok(Self::Gen5),
            6 => Ok(Self::Gen6),
            other => Err(NvmlError::InvalidArgument(format!(
                "unknown PCIe generation {}",
                other
            ))),
        }
    }

    /// Get theoretical bandwidth per lane in GB/s
    pub fn bandwidth_per_lane_gbps(&self) -> f64 {
        match self {
            Self::Gen1 => 0.25,  // 2.5 GT/s * 8/10 encoding
            Self::Gen2 => 0.5,   // 5.0 GT/s * 8/10 encoding
            Self::Gen3 => 0.985, // 8.0 GT/s * 128/130 encoding
            Self::Gen4 => 1.969, // 16.0 GT/s * 128/130 encoding
            Self::Gen5 => 3.938, // 32.0 GT/s * 128/130 encoding
            Self::Gen6 => 7.877, // 64.0 GT/s * 128/130 encoding
        }
    }

    /// Get generation number
    pub fn generation_number(&self) -> u8 {
        match self {
            Self::Gen1 => 1,
            Self::Gen2 => 2,
            Self::Gen3 => 3,
            Self::Gen4 => 4,
            Self::Gen5 => 5,
            Self::Gen6 => 6,
        }
    }
}

impl fmt::Display for PcieGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen {}", self.generation_number())
    }
}

/// PCIe link width (number of lanes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcieLinkWidth(u32);

impl PcieLinkWidth {
    /// Create from the lane count NVML reports
    pub fn from_raw(lanes: u32) -> Result<Self, NvmlError> {
        match lanes {
            1 | 2 | 4 | 8 | 12 | 16 | 32 => Ok(Self(lanes)),
            other => Err(NvmlError::InvalidArgument(format!(
                "invalid PCIe lane count {}",
                other
            ))),
        }
    }

    /// Get number of lanes
    pub fn lanes(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PcieLinkWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// PCIe link status and capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcieLinkStatus {
    /// Current PCIe generation
    pub current_generation: PcieGeneration,
    /// Maximum supported PCIe generation
    pub max_generation: PcieGeneration,
    /// Current link width
    pub current_width: PcieLinkWidth,
    /// Maximum supported link width
    pub max_width: PcieLinkWidth,
}

impl PcieLinkStatus {
    /// Check if link is operating at maximum capability
    pub fn is_at_max_capability(&self) -> bool {
        self.current_generation == self.max_generation && self.current_width == self.max_width
    }

    /// Get current theoretical maximum bandwidth in GB/s (per direction)
    pub fn current_bandwidth_gbps(&self) -> f64 {
        self.current_generation.bandwidth_per_lane_gbps() * self.current_width.lanes() as f64
    }
}

impl fmt::Display for PcieLinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (max: {} {})",
            self.current_generation, self.current_width, self.max_generation, self.max_width
        )
    }
}

/// Direction of a PCIe throughput counter (`nvmlPcieUtilCounter_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcieUtilCounter {
    Tx,
    Rx,
}

impl PcieUtilCounter {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Tx => 0,
            Self::Rx => 1,
        }
    }
}

/// Interconnect path between two GPUs (`nvmlGpuTopologyLevel_t`)
///
/// Ordered from closest to farthest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TopologyLevel {
    /// Same board (multi-GPU card)
    Internal,
    /// Single PCIe switch
    Single,
    /// Multiple PCIe switches, no host bridge crossing
    Multiple,
    /// Same host bridge
    HostBridge,
    /// Same NUMA node, across host bridges
    Node,
    /// Across NUMA nodes (SMP interconnect)
    System,
}

impl TopologyLevel {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Internal => 0,
            Self::Single => 10,
            Self::Multiple => 20,
            Self::HostBridge => 30,
            Self::Node => 40,
            Self::System => 50,
        }
    }
}

/// PCIe throughput over the last 20ms, in KB/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PcieThroughput {
    pub tx_kbps: u32,
    pub rx_kbps: u32,
}

impl fmt::Display for PcieThroughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TX {:.1} MB/s, RX {:.1} MB/s",
            self.tx_kbps as f64 / 1024.0,
            self.rx_kbps as f64 / 1024.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_levels_ordered_by_distance() {
        assert!(TopologyLevel::Internal < TopologyLevel::System);
        assert_eq!(TopologyLevel::HostBridge.as_raw(), 30);
        assert_eq!(TopologyLevel::System.as_raw(), 50);
    }

    #[test]
    fn test_generation_from_raw() {
        assert_eq!(PcieGeneration::from_raw(4).unwrap(), PcieGeneration::Gen4);
        assert!(PcieGeneration::from_raw(0).is_err());
        assert!(PcieGeneration::from_raw(7).is_err());
        assert_eq!(PcieGeneration::Gen5.to_string(), "Gen 5");
    }

    #[test]
    fn test_link_width_from_raw() {
        assert_eq!(PcieLinkWidth::from_raw(16).unwrap().lanes(), 16);
        assert!(PcieLinkWidth::from_raw(3).is_err());
        assert_eq!(PcieLinkWidth::from_raw(8).unwrap().to_string(), "x8");
    }

    #[test]
    fn test_link_status() {
        let status = PcieLinkStatus {
            current_generation: PcieGeneration::Gen3,
            max_generation: PcieGeneration::Gen4,
            current_width: PcieLinkWidth::from_raw(16).unwrap(),
            max_width: PcieLinkWidth::from_raw(16).unwrap(),
        };
        assert!(!status.is_at_max_capability());
        assert!((status.current_bandwidth_gbps() - 15.76).abs() < 0.01);
        assert_eq!(status.to_string(), "Gen 3 x16 (max: Gen 4 x16)");
    }

    #[test]
    fn test_throughput_display() {
        let throughput = PcieThroughput {
            tx_kbps: 1024,
            rx_kbps: 2048,
        };
        assert_eq!(throughput.to_string(), "TX 1.0 MB/s, RX 2.0 MB/s");
    }
}
