//! Dynamic NVML binding layer
//!
//! The native library is mapped at runtime, its entry points are bound into
//! a typed [`FunctionTable`], and every call goes through an [`Invoker`]
//! that turns status codes into errors.

#[cfg(target_os = "linux")]
pub mod affinity;
pub mod device;
pub mod invoke;
pub mod layout;
pub mod library;
pub mod marshal;
pub mod status;
pub mod system;
pub mod table;
pub mod wrapper;

pub use device::{Device, DeviceHandle};
pub use invoke::Invoker;
pub use library::{Library, Symbol};
pub use status::Status;
pub use table::{BindStrategy, EntryStatus, FunctionTable};
pub use wrapper::{LoadOptions, Nvml};
