//! System-wide version information

use serde::{Deserialize, Serialize};
use std::fmt;

/// CUDA driver API version, encoded by NVML as `1000 * major + 10 * minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CudaDriverVersion(i32);

impl CudaDriverVersion {
    /// Create from the raw encoded value
    pub const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    /// The raw encoded value
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    pub const fn major(&self) -> i32 {
        self.0 / 1000
    }

    pub const fn minor(&self) -> i32 {
        (self.0 % 1000) / 10
    }
}

impl fmt::Display for CudaDriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// Versions reported by the `system` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Where the NVML library was loaded from
    pub library: String,
    pub driver_version: String,
    pub nvml_version: String,
    pub cuda_driver_version: Option<CudaDriverVersion>,
    pub device_count: u32,
}
