//! Argument marshaling conventions
//!
//! Every argument crossing the boundary is one of three shapes:
//!
//! - a scalar passed by value (indices, enum values, limits),
//! - a bounded character buffer ([`OutBuffer`]) passed as pointer plus
//!   capacity, which NVML fills with a NUL-terminated string,
//! - a pointer to a zeroed value of fixed layout ([`NativeLayout`]) that
//!   NVML writes through.
//!
//! Outputs are always zero-initialized before the call since NVML may write
//! partial results before failing.

use crate::error::NvmlError;

use std::ffi::{c_char, c_int, c_uint, CString};

/// `NVML_SYSTEM_DRIVER_VERSION_BUFFER_SIZE`
pub const DRIVER_VERSION_BUFFER_SIZE: usize = 80;
/// `NVML_SYSTEM_NVML_VERSION_BUFFER_SIZE`
pub const NVML_VERSION_BUFFER_SIZE: usize = 80;
/// `NVML_DEVICE_NAME_V2_BUFFER_SIZE`
pub const DEVICE_NAME_BUFFER_SIZE: usize = 96;
/// `NVML_DEVICE_UUID_V2_BUFFER_SIZE`
pub const DEVICE_UUID_BUFFER_SIZE: usize = 96;
/// `NVML_DEVICE_SERIAL_BUFFER_SIZE`
pub const DEVICE_SERIAL_BUFFER_SIZE: usize = 30;
/// `NVML_DEVICE_PART_NUMBER_BUFFER_SIZE`
pub const DEVICE_PART_NUMBER_BUFFER_SIZE: usize = 80;
/// `NVML_DEVICE_VBIOS_VERSION_BUFFER_SIZE`
pub const DEVICE_VBIOS_VERSION_BUFFER_SIZE: usize = 32;
/// `NVML_DEVICE_INFOROM_VERSION_BUFFER_SIZE`
pub const DEVICE_INFOROM_VERSION_BUFFER_SIZE: usize = 16;
/// `NVML_DEVICE_PCI_BUS_ID_BUFFER_SIZE`
pub const DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
/// Buffer used for `nvmlSystemGetProcessName`
pub const PROCESS_NAME_BUFFER_SIZE: usize = 256;

/// A zeroed character region of fixed capacity, owned by the caller for the
/// duration of one native call
#[derive(Clone)]
pub struct OutBuffer<const N: usize> {
    bytes: [c_char; N],
}

impl<const N: usize> OutBuffer<N> {
    /// Create a zero-filled buffer
    pub fn new() -> Self {
        Self { bytes: [0; N] }
    }

    /// Pointer handed to the native call
    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.bytes.as_mut_ptr()
    }

    /// Capacity argument handed alongside the pointer
    pub fn capacity(&self) -> c_uint {
        N as c_uint
    }

    /// Bytes written by the native call, up to the first NUL
    ///
    /// If NVML filled the whole region without a terminator, all `N` bytes
    /// are returned rather than reading past the end.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as u8)
            .collect()
    }

    /// Decode the written bytes, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.as_bytes()).into_owned()
    }
}

impl<const N: usize> Default for OutBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Values NVML writes through a pointer
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or primitive) plain data for which the
/// all-zero bit pattern is a valid value, with the exact layout of the
/// corresponding NVML type.
pub unsafe trait NativeLayout: Copy {
    /// The all-zero value passed into a call before NVML fills it
    fn zeroed() -> Self {
        // SAFETY: guaranteed valid by the trait contract.
        unsafe { std::mem::zeroed() }
    }
}

unsafe impl NativeLayout for c_int {}
unsafe impl NativeLayout for c_uint {}
unsafe impl NativeLayout for u64 {}
unsafe impl NativeLayout for nvml_wrapper_sys::bindings::nvmlDevice_t {}

/// Interpret an NVML enable-state / flag output
///
/// Only strictly positive values count as enabled; zero and any negative
/// value (never produced by conforming drivers) read as disabled.
#[inline]
pub fn flag_from_raw(raw: c_int) -> bool {
    raw > 0
}

/// Encode a boolean for an NVML enable-state input
#[inline]
pub fn flag_to_raw(enabled: bool) -> c_uint {
    if enabled {
        1
    } else {
        0
    }
}

/// Convert a Rust string into the NUL-terminated form NVML expects
///
/// Rejects interior NULs before any native call is attempted.
pub fn c_string(what: &str, value: &str) -> Result<CString, NvmlError> {
    CString::new(value).map_err(|_| {
        NvmlError::InvalidArgument(format!("{} contains an interior NUL byte: {:?}", what, value))
    })
}
