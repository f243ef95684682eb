//! Unified error types for nvbind
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::nvml::status;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from NVML operations
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No device matched the requested selector
    #[error("GPU not found: {0}")]
    DeviceNotFound(String),

    /// No GPUs detected in the system
    #[error("No NVIDIA GPUs detected")]
    NoGpusFound,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A native call that returned a non-success status
///
/// Carries the raw status code, the message rendered by `nvmlErrorString`
/// for that code, and the name of the native symbol that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{symbol} call failed with error: {code} {message}")]
pub struct CallError {
    /// Raw `nvmlReturn_t` value
    pub code: u32,
    /// Human readable rendering of `code`
    pub message: String,
    /// Native symbol that produced the status
    pub symbol: &'static str,
}

impl CallError {
    /// The device or driver does not support the requested operation
    pub fn is_not_supported(&self) -> bool {
        self.code == status::NOT_SUPPORTED
    }

    /// The caller lacks the privileges for the operation
    pub fn is_no_permission(&self) -> bool {
        self.code == status::NO_PERMISSION
    }

    /// The library was not initialized (query before init or after shutdown)
    pub fn is_uninitialized(&self) -> bool {
        self.code == status::UNINITIALIZED
    }
}

/// Errors from the NVML binding layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmlError {
    /// The native library image could not be mapped
    #[error("Failed to load NVML library from {path}: {reason}")]
    LibraryLoad { path: String, reason: String },

    /// The native library image could not be unmapped
    #[error("Failed to unload NVML library {path}: {reason}")]
    LibraryUnload { path: String, reason: String },

    /// A required native entry point is absent from the loaded library
    #[error("NVML symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    /// A native call returned a non-success status
    #[error(transparent)]
    Call(#[from] CallError),

    /// Argument rejected before reaching the native call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl NvmlError {
    /// Raw status code if this error came from a native call
    pub fn code(&self) -> Option<u32> {
        match self {
            NvmlError::Call(e) => Some(e.code),
            _ => None,
        }
    }

    /// True if the native call reported `NOT_SUPPORTED`
    pub fn is_not_supported(&self) -> bool {
        matches!(self, NvmlError::Call(e) if e.is_not_supported())
    }

    /// The device or the loaded library does not provide the operation
    ///
    /// Either the call reported `NOT_SUPPORTED` or a lenient bind left the
    /// entry unresolved.
    pub fn is_unavailable(&self) -> bool {
        self.is_not_supported() || matches!(self, NvmlError::SymbolNotFound { .. })
    }
}

/// Treat an unavailable operation as an absent value
///
/// Only [`NvmlError::is_unavailable`] failures become `Ok(None)`; every other
/// error, `Uninitialized` and `GpuIsLost` included, propagates.
pub trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, NvmlError>;
}

impl<T> OptionalExt<T> for std::result::Result<T, NvmlError> {
    fn optional(self) -> std::result::Result<Option<T>, NvmlError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unavailable() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
