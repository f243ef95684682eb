//! Device identity domain types
//!
//! Brand, PCI location, compute capability and the aggregated
//! [`DeviceInfo`] summary used by the `list` and `info` commands.

use crate::error::NvmlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product brand reported by `nvmlDeviceGetBrand`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    Unknown,
    Quadro,
    Tesla,
    Nvs,
    Grid,
    GeForce,
    Titan,
    NvidiaVapps,
    NvidiaVpc,
    NvidiaVcs,
    NvidiaVws,
    NvidiaCloudGaming,
    QuadroRtx,
    NvidiaRtx,
    Nvidia,
    GeForceRtx,
    TitanRtx,
    /// A brand value newer than this crate
    Other(u32),
}

impl Brand {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Quadro,
            2 => Self::Tesla,
            3 => Self::Nvs,
            4 => Self::Grid,
            5 => Self::GeForce,
            6 => Self::Titan,
            7 => Self::NvidiaVapps,
            8 => Self::NvidiaVpc,
            9 => Self::NvidiaVcs,
            10 => Self::NvidiaVws,
            11 => Self::NvidiaCloudGaming,
            12 => Self::QuadroRtx,
            13 => Self::NvidiaRtx,
            14 => Self::Nvidia,
            15 => Self::GeForceRtx,
            16 => Self::TitanRtx,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Quadro => write!(f, "Quadro"),
            Self::Tesla => write!(f, "Tesla"),
            Self::Nvs => write!(f, "NVS"),
            Self::Grid => write!(f, "GRID"),
            Self::GeForce => write!(f, "GeForce"),
            Self::Titan => write!(f, "Titan"),
            Self::NvidiaVapps => write!(f, "NVIDIA Virtual Applications"),
            Self::NvidiaVpc => write!(f, "NVIDIA Virtual PC"),
            Self::NvidiaVcs => write!(f, "NVIDIA Virtual Compute Server"),
            Self::NvidiaVws => write!(f, "NVIDIA RTX Virtual Workstation"),
            Self::NvidiaCloudGaming => write!(f, "NVIDIA Cloud Gaming"),
            Self::QuadroRtx => write!(f, "Quadro RTX"),
            Self::NvidiaRtx => write!(f, "NVIDIA RTX"),
            Self::Nvidia => write!(f, "NVIDIA"),
            Self::GeForceRtx => write!(f, "GeForce RTX"),
            Self::TitanRtx => write!(f, "Titan RTX"),
            Self::Other(value) => write!(f, "Brand {}", value),
        }
    }
}

/// Compute mode (`nvmlComputeMode_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComputeMode {
    /// Multiple contexts per device
    #[default]
    Default,
    /// Deprecated single-thread exclusive mode
    ExclusiveThread,
    /// No contexts allowed
    Prohibited,
    /// One context per device, usable from many threads
    ExclusiveProcess,
}

impl ComputeMode {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Result<Self, NvmlError> {
        match value {
            0 => Ok(Self::Default),
            1 => Ok(Self::ExclusiveThread),
            2 => Ok(Self::Prohibited),
            3 => Ok(Self::ExclusiveProcess),
            other => Err(NvmlError::InvalidArgument(format!(
                "unknown compute mode {}",
                other
            ))),
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Default => 0,
            Self::ExclusiveThread => 1,
            Self::Prohibited => 2,
            Self::ExclusiveProcess => 3,
        }
    }
}

impl fmt::Display for ComputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::ExclusiveThread => write!(f, "Exclusive Thread"),
            Self::Prohibited => write!(f, "Prohibited"),
            Self::ExclusiveProcess => write!(f, "Exclusive Process"),
        }
    }
}

/// PCI location and ids of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciInfo {
    /// "domain:bus:device.function", e.g. `00000000:01:00.0`
    pub bus_id: String,
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    /// Combined device id (high 16 bits) and vendor id (low 16 bits)
    pub pci_device_id: u32,
    /// Combined subsystem id and subsystem vendor id
    pub pci_sub_system_id: u32,
}

impl PciInfo {
    /// PCI vendor id (0x10de for NVIDIA)
    pub fn vendor_id(&self) -> u16 {
        (self.pci_device_id & 0xffff) as u16
    }

    /// PCI device id
    pub fn device_id(&self) -> u16 {
        (self.pci_device_id >> 16) as u16
    }
}

impl fmt::Display for PciInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}]",
            self.bus_id,
            self.vendor_id(),
            self.device_id()
        )
    }
}

/// CUDA compute capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CudaComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl fmt::Display for CudaComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Device identification and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device index (0-based)
    pub index: u32,
    /// Device name (e.g., "NVIDIA A100-SXM4-40GB")
    pub name: String,
    /// Unique device UUID
    pub uuid: String,
    /// Product brand
    pub brand: Option<Brand>,
    /// Board serial number
    pub serial: Option<String>,
    /// PCI bus ID
    pub pci_bus_id: Option<String>,
    /// VBIOS version
    pub vbios_version: Option<String>,
    /// CUDA compute capability
    pub compute_capability: Option<CudaComputeCapability>,
}

impl DeviceInfo {
    /// Create new device info
    pub fn new(index: u32, name: String, uuid: String) -> Self {
        Self {
            index,
            name,
            uuid,
            brand: None,
            serial: None,
            pci_bus_id: None,
            vbios_version: None,
            compute_capability: None,
        }
    }

    /// Set the brand
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Set the serial number
    pub fn with_serial(mut self, serial: String) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Set the PCI bus ID
    pub fn with_pci_bus_id(mut self, bus_id: String) -> Self {
        self.pci_bus_id = Some(bus_id);
        self
    }

    /// Set the VBIOS version
    pub fn with_vbios_version(mut self, version: String) -> Self {
        self.vbios_version = Some(version);
        self
    }

    /// Set the compute capability
    pub fn with_compute_capability(mut self, capability: CudaComputeCapability) -> Self {
        self.compute_capability = Some(capability);
        self
    }

    /// Get a short display name
    pub fn short_name(&self) -> &str {
        // Remove "NVIDIA " prefix if present
        self.name.strip_prefix("NVIDIA ").unwrap_or(&self.name)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_from_raw() {
        assert_eq!(Brand::from_raw(2), Brand::Tesla);
        assert_eq!(Brand::from_raw(5), Brand::GeForce);
        assert_eq!(Brand::from_raw(16), Brand::TitanRtx);
        assert_eq!(Brand::from_raw(99), Brand::Other(99));
        assert_eq!(Brand::GeForceRtx.to_string(), "GeForce RTX");
    }

    #[test]
    fn test_compute_mode_raw() {
        for raw in 0..4 {
            assert_eq!(ComputeMode::from_raw(raw).unwrap().as_raw(), raw);
        }
        assert!(ComputeMode::from_raw(4).is_err());
    }

    #[test]
    fn test_pci_ids() {
        let pci = PciInfo {
            bus_id: "00000000:01:00.0".to_string(),
            domain: 0,
            bus: 1,
            device: 0,
            pci_device_id: 0x2230_10de,
            pci_sub_system_id: 0,
        };
        assert_eq!(pci.vendor_id(), 0x10de);
        assert_eq!(pci.device_id(), 0x2230);
        assert_eq!(pci.to_string(), "00000000:01:00.0 [10de:2230]");
    }

    #[test]
    fn test_compute_capability_display() {
        let cc = CudaComputeCapability { major: 8, minor: 6 };
        assert_eq!(cc.to_string(), "8.6");
        assert!(cc > CudaComputeCapability { major: 7, minor: 5 });
    }

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::new(0, "NVIDIA A100".to_string(), "GPU-xxx".to_string());
        assert_eq!(info.to_string(), "[0] NVIDIA A100");
        assert_eq!(info.short_name(), "A100");
    }

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new(1, "Test GPU".to_string(), "GPU-123".to_string())
            .with_brand(Brand::Tesla)
            .with_serial("1324".to_string());

        assert_eq!(info.brand, Some(Brand::Tesla));
        assert_eq!(info.serial.as_deref(), Some("1324"));
        assert!(info.pci_bus_id.is_none());
    }
}
