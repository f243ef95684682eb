//! Memory domain types including ECC error counters

use serde::{Deserialize, Serialize};
use std::fmt;

const MIB: u64 = 1024 * 1024;

/// Frame buffer memory usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Total memory in bytes
    pub total: u64,
    /// Used memory in bytes
    pub used: u64,
    /// Free memory in bytes
    pub free: u64,
}

impl MemoryInfo {
    /// Create a new memory info value
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        Self { total, used, free }
    }

    /// Get total memory in MB
    pub fn total_mb(&self) -> u64 {
        self.total / MIB
    }

    /// Get used memory in MB
    pub fn used_mb(&self) -> u64 {
        self.used / MIB
    }

    /// Get free memory in MB
    pub fn free_mb(&self) -> u64 {
        self.free / MIB
    }

    /// Get usage percentage (0 - 100)
    pub fn usage_percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            (self.used.saturating_mul(100) / self.total).min(100) as u8
        }
    }
}

impl fmt::Display for MemoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} MiB", self.used_mb(), self.total_mb())
    }
}

/// BAR1 aperture usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bar1MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// ECC mode, current and pending (applied after the next reboot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EccMode {
    pub current: bool,
    pub pending: bool,
}

impl EccMode {
    /// A mode change is waiting for a reboot
    pub fn is_change_pending(&self) -> bool {
        self.current != self.pending
    }
}

impl fmt::Display for EccMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |enabled: bool| if enabled { "Enabled" } else { "Disabled" };
        if self.is_change_pending() {
            write!(f, "{} (pending: {})", label(self.current), label(self.pending))
        } else {
            write!(f, "{}", label(self.current))
        }
    }
}

/// ECC error class (`nvmlMemoryErrorType_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryErrorType {
    /// Single-bit errors fixed by ECC
    Corrected,
    /// Double-bit errors
    Uncorrected,
}

impl MemoryErrorType {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Corrected => 0,
            Self::Uncorrected => 1,
        }
    }
}

/// ECC counter lifetime (`nvmlEccCounterType_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EccCounterType {
    /// Reset on driver reload
    Volatile,
    /// Persistent across reboots
    Aggregate,
}

impl EccCounterType {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Volatile => 0,
            Self::Aggregate => 1,
        }
    }
}

/// Why a memory page was retired (`nvmlPageRetirementCause_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRetirementCause {
    /// Repeated single-bit ECC errors at the same address
    MultipleSingleBitEccErrors,
    /// A double-bit ECC error
    DoubleBitEccError,
}

impl PageRetirementCause {
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::MultipleSingleBitEccErrors => 0,
            Self::DoubleBitEccError => 1,
        }
    }
}

/// Total ECC error counts for one counter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EccErrorCounts {
    pub corrected: u64,
    pub uncorrected: u64,
}

impl EccErrorCounts {
    /// Uncorrectable errors indicate a hardware fault
    pub fn has_uncorrected(&self) -> bool {
        self.uncorrected > 0
    }
}
