//! NVML session
//!
//! [`Nvml`] pairs a loaded [`Library`] with its resolved [`FunctionTable`]
//! and is the entry point for every query. Sessions are explicit values;
//! several may coexist, each over its own library image.

use crate::error::NvmlError;
use crate::nvml::invoke::Invoker;
use crate::nvml::library::Library;
use crate::nvml::status::Status;
use crate::nvml::table::{BindStrategy, EntryStatus, FunctionTable};

use std::fmt;
use std::path::PathBuf;

/// How to locate and bind the native library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Explicit library path; `None` searches the platform defaults
    pub path: Option<PathBuf>,
    /// Treatment of symbols the library does not export
    pub strategy: BindStrategy,
}

impl LoadOptions {
    /// Options for an explicit library path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Options with the given bind strategy
    pub fn with_strategy(mut self, strategy: BindStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// A bound NVML library
///
/// Lifecycle: [`Nvml::load`] maps the image and resolves the table,
/// [`Nvml::init`] and [`Nvml::shutdown`] forward to `nvmlInit_v2` and
/// `nvmlShutdown`, and [`Nvml::release`] unmaps the image. Querying before
/// `init` or after `shutdown` is a precondition violation reported by NVML
/// itself (`Uninitialized`).
///
/// The session is read-only after load and may be shared between threads;
/// ordering init, queries and shutdown is the caller's responsibility.
pub struct Nvml {
    // Declared before `library` so the pointers are dropped first.
    table: FunctionTable,
    library: Library,
}

impl Nvml {
    /// Load NVML from `path` (empty for the platform default) with strict binding
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, NvmlError> {
        let path = path.into();
        let options = LoadOptions::default();
        if path.as_os_str().is_empty() {
            Self::load_with(&options)
        } else {
            Self::load_with(&options.with_path(path))
        }
    }

    /// Load NVML as described by `options`
    pub fn load_with(options: &LoadOptions) -> Result<Self, NvmlError> {
        let library = match &options.path {
            Some(path) => Library::load(path)?,
            None => Library::load("")?,
        };
        Self::from_library(library, options.strategy)
    }

    /// Bind an already loaded library
    ///
    /// On failure the library is released before the error is returned.
    pub fn from_library(library: Library, strategy: BindStrategy) -> Result<Self, NvmlError> {
        match FunctionTable::bind(&library, strategy) {
            Ok(table) => {
                log::debug!(
                    "Bound {} NVML symbols from {}",
                    table.entries().len(),
                    library.origin()
                );
                Ok(Self { table, library })
            }
            Err(e) => {
                if let Err(release_err) = library.release() {
                    log::warn!("{}", release_err);
                }
                Err(e)
            }
        }
    }

    /// Initialize NVML (`nvmlInit_v2`)
    pub fn init(&self) -> Result<(), NvmlError> {
        self.invoker().call(&self.table.init, |f| unsafe { f() })?;
        log::info!("NVML initialized");
        Ok(())
    }

    /// Shut NVML down (`nvmlShutdown`)
    ///
    /// A shutdown without a matching `init` reports the native status,
    /// `Uninitialized` on conforming libraries.
    pub fn shutdown(&self) -> Result<(), NvmlError> {
        self.invoker().call(&self.table.shutdown, |f| unsafe { f() })?;
        log::info!("NVML shut down");
        Ok(())
    }

    /// Shut down, then release the library
    ///
    /// The library is released even if shutdown fails; the shutdown error
    /// takes precedence over a release error.
    pub fn close(self) -> Result<(), NvmlError> {
        let shutdown = self.shutdown();
        let released = self.release();
        shutdown.and(released)
    }

    /// Release the library without calling `nvmlShutdown`
    pub fn release(self) -> Result<(), NvmlError> {
        let Self { table, library } = self;
        drop(table);
        library.release()
    }

    /// Render a status code with `nvmlErrorString`
    pub fn error_string(&self, code: Status) -> String {
        self.invoker().error_string(code)
    }

    /// Invoker over this session's table
    pub fn invoker(&self) -> Invoker<'_> {
        Invoker::new(&self.table)
    }

    /// The resolved symbol table
    pub fn table(&self) -> &FunctionTable {
        &self.table
    }

    /// Resolution status of every table entry
    pub fn symbols(&self) -> Vec<EntryStatus> {
        self.table.entries()
    }

    /// Where the library was loaded from
    pub fn origin(&self) -> &str {
        self.library.origin()
    }
}

impl fmt::Debug for Nvml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nvml")
            .field("library", &self.library)
            .field("missing", &self.table.missing())
            .finish()
    }
}
