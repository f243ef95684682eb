//! nvbind - dynamically loaded NVML bindings
//!
//! The NVIDIA Management Library is opened at runtime and every entry point
//! is resolved into a typed function table, so binaries link without the
//! driver present and can report exactly which symbols a host lacks.
//!
//! # Modules
//!
//! - [`nvml`]: Library loading, symbol binding and the safe device API
//! - [`domain`]: Typed values decoded from native results
//! - [`error`]: Error types
//! - [`config`]: Configuration system
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//!
//! # Example
//!
//! ```no_run
//! use nvbind::nvml::Nvml;
//!
//! let nvml = Nvml::load("")?;
//! nvml.init()?;
//! for device in nvml.devices()? {
//!     println!("{}: {}", device.index()?, device.name()?);
//! }
//! nvml.close()?;
//! # Ok::<(), nvbind::error::NvmlError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod nvml;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
