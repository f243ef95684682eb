//! NVML status codes
//!
//! Numeric values of `nvmlReturn_t` used for protocol decisions. Message text
//! is never derived from these; it always comes from `nvmlErrorString`.

pub use nvml_wrapper_sys::bindings::nvmlReturn_enum as Status;

/// The call completed successfully
pub const SUCCESS: Status = nvml_wrapper_sys::bindings::nvmlReturn_enum_NVML_SUCCESS;
/// NVML was not initialized (query before `nvmlInit` or after `nvmlShutdown`)
pub const UNINITIALIZED: Status = 1;
/// A supplied argument is invalid
pub const INVALID_ARGUMENT: Status = 2;
/// The device does not support the requested operation
pub const NOT_SUPPORTED: Status = 3;
/// The caller lacks permission for the operation
pub const NO_PERMISSION: Status = 4;
/// A lookup (UUID, serial, bus id) matched no device
pub const NOT_FOUND: Status = 6;
/// A caller-supplied buffer or array is too small; the required size was reported
pub const INSUFFICIENT_SIZE: Status = 7;
/// The GPU has fallen off the bus or is otherwise inaccessible
pub const GPU_IS_LOST: Status = 15;
/// An internal driver error occurred
pub const UNKNOWN: Status = 999;
