//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command. The
//! data each command prints is gathered by a separate function so it can be
//! exercised against the stub library.

pub mod clocks;
pub mod error_string;
pub mod info;
pub mod list;
pub mod persistence;
pub mod power_limit;
pub mod processes;
pub mod symbols;
pub mod system;

pub use clocks::run_clocks;
pub use error_string::run_error_string;
pub use info::run_info;
pub use list::run_list;
pub use persistence::run_persistence;
pub use power_limit::run_power_limit;
pub use processes::run_processes;
pub use symbols::run_symbols;
pub use system::run_system;

use crate::cli::args::OutputFormat;
use crate::config::{Config, DeviceSelector};
use crate::error::{AppError, Result};
use crate::nvml::{status, Device, Nvml};

/// A loaded NVML library plus the settings commands run with
pub struct Session {
    nvml: Nvml,
    config: Config,
    initialized: bool,
}

impl Session {
    /// Load and bind the library without initializing NVML
    pub fn load(config: Config) -> Result<Self> {
        let nvml = Nvml::load_with(&config.load_options())?;
        Ok(Self::from_nvml(nvml, config))
    }

    /// Load, bind and initialize
    pub fn open(config: Config) -> Result<Self> {
        let mut session = Self::load(config)?;
        session.init()?;
        Ok(session)
    }

    /// Wrap an already bound library
    pub fn from_nvml(nvml: Nvml, config: Config) -> Self {
        Self {
            nvml,
            config,
            initialized: false,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        self.nvml.init()?;
        self.initialized = true;
        Ok(())
    }

    pub fn nvml(&self) -> &Nvml {
        &self.nvml
    }

    pub fn format(&self) -> OutputFormat {
        self.config.output.format
    }

    /// Devices picked by the configured selector
    pub fn devices(&self) -> Result<Vec<Device<'_>>> {
        match self.config.device.selector() {
            DeviceSelector::All => {
                let devices = self.nvml.devices()?;
                if devices.is_empty() {
                    return Err(AppError::NoGpusFound);
                }
                Ok(devices)
            }
            DeviceSelector::Index(index) => {
                let count = self.nvml.device_count()?;
                if index >= count {
                    return Err(AppError::DeviceNotFound(format!(
                        "index {} ({} GPUs detected)",
                        index, count
                    )));
                }
                Ok(vec![self.nvml.device_by_index(index)?])
            }
            DeviceSelector::Uuid(uuid) => match self.nvml.device_by_uuid(&uuid) {
                Ok(device) => Ok(vec![device]),
                Err(e) if e.code() == Some(status::NOT_FOUND) => {
                    Err(AppError::DeviceNotFound(uuid))
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Shut NVML down if this session initialized it, then release the library
    pub fn close(self) -> Result<()> {
        if self.initialized {
            self.nvml.close()?;
        } else {
            self.nvml.release()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Session;
    use crate::config::Config;
    use crate::mock;
    use crate::nvml::{BindStrategy, Nvml};

    /// A session over the stub library; callers install the mock state
    pub fn session(config: Config) -> Session {
        let nvml = Nvml::from_library(mock::library(), BindStrategy::Strict).unwrap();
        Session::from_nvml(nvml, config)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::session;
    use super::*;
    use crate::mock::{self, MockState};

    #[test]
    fn test_select_all_devices() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        assert_eq!(session.devices().unwrap().len(), 2);
    }

    #[test]
    fn test_select_by_index() {
        let _guard = mock::install(MockState::default().initialized());
        let mut config = Config::default();
        config.device.index = Some(1);
        let session = session(config);

        let devices = session.devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].index().unwrap(), 1);
    }

    #[test]
    fn test_select_index_out_of_range() {
        let _guard = mock::install(MockState::default().initialized());
        let mut config = Config::default();
        config.device.index = Some(5);

        let err = session(config).devices().unwrap_err();
        assert_eq!(err.to_string(), "GPU not found: index 5 (2 GPUs detected)");
    }

    #[test]
    fn test_select_by_uuid() {
        let _guard = mock::install(MockState::default().initialized());
        let uuid = mock::inspect(|s| s.devices[1].uuid.clone());
        let mut config = Config::default();
        config.device.uuid = Some(uuid);

        let devices = session(config).devices().map(|d| d.len()).unwrap();
        assert_eq!(devices, 1);
    }

    #[test]
    fn test_select_unknown_uuid() {
        let _guard = mock::install(MockState::default().initialized());
        let mut config = Config::default();
        config.device.uuid = Some("GPU-nope".to_string());

        let err = session(config).devices().unwrap_err();
        assert!(matches!(err, AppError::DeviceNotFound(ref u) if u == "GPU-nope"));
    }

    #[test]
    fn test_no_gpus() {
        let _guard = mock::install(MockState::default().initialized().with_devices(Vec::new()));
        let err = session(Config::default()).devices().unwrap_err();
        assert!(matches!(err, AppError::NoGpusFound));
    }

    #[test]
    fn test_close_shuts_down_only_when_initialized() {
        let _guard = mock::install(MockState::default());

        let mut opened = session(Config::default());
        opened.init().unwrap();
        assert_eq!(mock::inspect(|s| s.init_count), 1);
        opened.close().unwrap();
        assert_eq!(mock::inspect(|s| s.init_count), 0);

        // Never initialized: a shutdown here would report Uninitialized
        session(Config::default()).close().unwrap();
    }
}
