//! Native library handle management
//!
//! Owns the mapped NVML image and resolves exported symbols from it. A
//! [`Library`] is either backed by a real shared object loaded through
//! `libloading`, or by an in-process symbol table (used by the synthetic
//! stub in tests).

use crate::error::NvmlError;

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Address of an exported function
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(*const c_void);

// SAFETY: a RawSymbol is the address of immutable code in a mapped image;
// sharing the address between threads does not grant any mutable access.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    /// Wrap a function address
    pub fn new(address: *const c_void) -> Self {
        Self(address)
    }

    /// The wrapped address
    pub fn as_ptr(&self) -> *const c_void {
        self.0
    }
}

impl fmt::Debug for RawSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", self.0)
    }
}

enum Backing {
    Native(libloading::Library),
    InProcess(HashMap<String, RawSymbol>),
}

/// A loaded NVML library image
///
/// Shared and read-only once loaded: [`Library::resolve`] takes `&self` and
/// may be called from any thread. Unloading consumes the value, so a symbol
/// can never be resolved from a released library.
pub struct Library {
    backing: Backing,
    origin: String,
}

impl Library {
    /// Load the NVML image at `path`
    ///
    /// An empty path searches the platform default locations
    /// (see [`Library::default_paths`]) and uses the first that loads.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NvmlError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Self::load_default();
        }

        // SAFETY: loading NVML runs its library constructors, which have no
        // preconditions beyond being loaded once per image.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            NvmlError::LibraryLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        log::info!("Loaded NVML from {}", path.display());
        Ok(Self {
            backing: Backing::Native(library),
            origin: path.display().to_string(),
        })
    }

    fn load_default() -> Result<Self, NvmlError> {
        let mut last_error = None;

        for candidate in Self::default_paths() {
            match Self::load(&candidate) {
                Ok(library) => return Ok(library),
                Err(e) => {
                    log::debug!("Failed to load {}: {}", candidate.display(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| NvmlError::LibraryLoad {
            path: String::new(),
            reason: "no default NVML location for this platform".to_string(),
        }))
    }

    /// Default NVML locations for the host platform, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(windows)]
        {
            if let Some(program_files) = std::env::var_os("ProgramW6432") {
                paths.push(
                    PathBuf::from(program_files).join("NVIDIA Corporation\\NVSMI\\nvml.dll"),
                );
            }
            paths.push(PathBuf::from(
                "C:\\Program Files\\NVIDIA Corporation\\NVSMI\\nvml.dll",
            ));
            paths.push(PathBuf::from("nvml.dll"));
        }

        #[cfg(not(windows))]
        {
            paths.push(PathBuf::from("libnvidia-ml.so.1"));
            paths.push(PathBuf::from("libnvidia-ml.so"));
        }

        paths
    }

    /// Build a library from in-process function addresses
    ///
    /// Every address must point at an `extern "C"` function whose signature
    /// matches the NVML declaration of the same name.
    pub fn from_symbols<I>(origin: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, RawSymbol)>,
    {
        let table = symbols
            .into_iter()
            .map(|(name, address)| (name.to_string(), address))
            .collect();

        Self {
            backing: Backing::InProcess(table),
            origin: origin.into(),
        }
    }

    /// Where this library was loaded from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Look up an exported function by name
    ///
    /// Fails with [`NvmlError::SymbolNotFound`] if the image does not export
    /// `name`.
    pub fn resolve(&self, name: &str) -> Result<Symbol<'_>, NvmlError> {
        let address = match &self.backing {
            Backing::Native(library) => {
                // SAFETY: the symbol is only read as an address here; callers
                // choose the function type through `Symbol::cast`.
                let symbol: libloading::Symbol<'_, unsafe extern "C" fn()> =
                    unsafe { library.get(name.as_bytes()) }.map_err(|e| {
                        log::trace!("dlsym({}) failed: {}", name, e);
                        NvmlError::SymbolNotFound {
                            symbol: name.to_string(),
                        }
                    })?;
                RawSymbol::new(*symbol as *const c_void)
            }
            Backing::InProcess(table) => {
                *table.get(name).ok_or_else(|| NvmlError::SymbolNotFound {
                    symbol: name.to_string(),
                })?
            }
        };

        Ok(Symbol {
            name: name.to_string(),
            address,
            _library: PhantomData,
        })
    }

    /// Unmap the library image
    ///
    /// Consumes the handle; every [`Symbol`] borrowed from it must already be
    /// gone, which the borrow checker enforces:
    ///
    /// ```compile_fail
    /// # fn demo(library: nvbind::nvml::Library) {
    /// let symbol = library.resolve("nvmlInit_v2").unwrap();
    /// library.release().unwrap();
    /// let _ = symbol.name();
    /// # }
    /// ```
    pub fn release(self) -> Result<(), NvmlError> {
        let origin = self.origin;
        match self.backing {
            Backing::Native(library) => library.close().map_err(|e| NvmlError::LibraryUnload {
                path: origin.clone(),
                reason: e.to_string(),
            })?,
            Backing::InProcess(_) => {}
        }

        log::debug!("Released NVML library {}", origin);
        Ok(())
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.backing {
            Backing::Native(_) => "native",
            Backing::InProcess(_) => "in-process",
        };
        f.debug_struct("Library")
            .field("origin", &self.origin)
            .field("kind", &kind)
            .finish()
    }
}

/// A resolved entry point, valid while its [`Library`] is alive
#[derive(Debug, Clone)]
pub struct Symbol<'lib> {
    name: String,
    address: RawSymbol,
    _library: PhantomData<&'lib Library>,
}

impl Symbol<'_> {
    /// Exported name of this symbol
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw address of this symbol
    pub fn address(&self) -> RawSymbol {
        self.address
    }

    /// Reinterpret the symbol as a function pointer of type `F`
    ///
    /// # Safety
    ///
    /// `F` must be an `unsafe extern "C" fn` type matching the native
    /// declaration of this symbol, and the returned pointer must not be
    /// called after the owning library has been released.
    pub unsafe fn cast<F: Copy>(&self) -> F {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const c_void>()
        );
        std::mem::transmute_copy::<*const c_void, F>(&self.address.as_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn answer() -> u32 {
        42
    }

    fn stub_library() -> Library {
        Library::from_symbols(
            "stub",
            [("answer", RawSymbol::new(answer as *const c_void))],
        )
    }

    #[test]
    fn test_default_paths_not_empty() {
        assert!(!Library::default_paths().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Library::load("/nonexistent/path/libnvidia-ml.so.1");
        match result {
            Err(NvmlError::LibraryLoad { path, .. }) => {
                assert_eq!(path, "/nonexistent/path/libnvidia-ml.so.1")
            }
            other => panic!("expected LibraryLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_and_call_in_process_symbol() {
        let library = stub_library();
        let symbol = library.resolve("answer").unwrap();
        assert_eq!(symbol.name(), "answer");

        let f: unsafe extern "C" fn() -> u32 = unsafe { symbol.cast() };
        assert_eq!(unsafe { f() }, 42);
    }

    #[test]
    fn test_resolve_unknown_symbol_fails() {
        let library = stub_library();
        let err = library.resolve("nvmlDeviceGetBrand").unwrap_err();
        assert_eq!(
            err,
            NvmlError::SymbolNotFound {
                symbol: "nvmlDeviceGetBrand".to_string()
            }
        );
    }

    #[test]
    fn test_release_in_process() {
        let library = stub_library();
        assert_eq!(library.origin(), "stub");
        assert!(library.release().is_ok());
    }

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_load_default() {
        let library = Library::load("").unwrap();
        assert!(library.resolve("nvmlInit_v2").is_ok());
        library.release().unwrap();
    }
}
