//! Fixed native struct layouts
//!
//! `#[repr(C)]` mirrors of the NVML structs this crate passes by pointer.
//! Field order and widths follow `nvml.h`; they are converted into the
//! owned types in [`crate::domain`] right after each call.

use crate::nvml::marshal::{NativeLayout, DEVICE_PCI_BUS_ID_BUFFER_SIZE};

use std::ffi::{c_char, c_uint, c_ulonglong};

/// `nvmlMemory_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMemory {
    pub total: c_ulonglong,
    pub free: c_ulonglong,
    pub used: c_ulonglong,
}

/// `nvmlBAR1Memory_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBar1Memory {
    pub bar1_total: c_ulonglong,
    pub bar1_free: c_ulonglong,
    pub bar1_used: c_ulonglong,
}

/// `nvmlUtilization_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUtilization {
    pub gpu: c_uint,
    pub memory: c_uint,
}

/// `nvmlPciInfo_t` (v3 layout, as filled by `nvmlDeviceGetPciInfo_v3`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPciInfo {
    /// Legacy 16-byte "domain:bus:device.function" id
    pub bus_id_legacy: [c_char; 16],
    pub domain: c_uint,
    pub bus: c_uint,
    pub device: c_uint,
    /// Combined 16-bit device id and 16-bit vendor id
    pub pci_device_id: c_uint,
    /// Combined 16-bit subsystem id and 16-bit subsystem vendor id
    pub pci_sub_system_id: c_uint,
    pub bus_id: [c_char; DEVICE_PCI_BUS_ID_BUFFER_SIZE],
}

/// `nvmlProcessInfo_v1_t`, the element type of the unversioned
/// `nvmlDeviceGet{Compute,Graphics}RunningProcesses` arrays
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProcessInfo {
    pub pid: c_uint,
    /// Bytes of GPU memory, or `NVML_VALUE_NOT_AVAILABLE` (all ones)
    pub used_gpu_memory: c_ulonglong,
}

/// `nvmlViolationTime_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawViolationTime {
    /// Reference time in nanoseconds
    pub reference_time: c_ulonglong,
    /// Throttled time in nanoseconds
    pub violation_time: c_ulonglong,
}

// SAFETY: all of the above are repr(C) aggregates of integers and integer
// arrays, for which all-zero is a valid value.
unsafe impl NativeLayout for RawMemory {}
unsafe impl NativeLayout for RawBar1Memory {}
unsafe impl NativeLayout for RawUtilization {}
unsafe impl NativeLayout for RawPciInfo {}
unsafe impl NativeLayout for RawProcessInfo {}
unsafe impl NativeLayout for RawViolationTime {}

/// `NVML_VALUE_NOT_AVAILABLE` as written into 64-bit counters
pub const VALUE_NOT_AVAILABLE: c_ulonglong = c_ulonglong::MAX;

/// Decode a fixed `c_char` array up to its first NUL
pub(crate) fn fixed_str(bytes: &[c_char]) -> String {
    let raw: Vec<u8> = bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as u8)
        .collect();
    String::from_utf8_lossy(&raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_layout_sizes_match_header() {
        assert_eq!(size_of::<RawMemory>(), 24);
        assert_eq!(size_of::<RawBar1Memory>(), 24);
        assert_eq!(size_of::<RawUtilization>(), 8);
        assert_eq!(size_of::<RawPciInfo>(), 16 + 5 * 4 + 32);
        assert_eq!(size_of::<RawViolationTime>(), 16);
        // pid is padded up to the 8-byte alignment of used_gpu_memory
        assert_eq!(size_of::<RawProcessInfo>(), 16);
        assert_eq!(align_of::<RawProcessInfo>(), 8);
    }

    #[test]
    fn test_fixed_str() {
        let mut bytes = [0 as c_char; 16];
        for (i, b) in b"0000:01:00.0".iter().enumerate() {
            bytes[i] = *b as c_char;
        }
        assert_eq!(fixed_str(&bytes), "0000:01:00.0");
    }

    #[test]
    fn test_zeroed_pci_info_is_empty() {
        let info = RawPciInfo::zeroed();
        assert_eq!(fixed_str(&info.bus_id), "");
        assert_eq!(info.domain, 0);
    }
}
