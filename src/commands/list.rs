//! List command implementation
//!
//! Lists all detected NVIDIA GPUs.

use crate::cli::output::{print_output, DeviceList};
use crate::commands::Session;
use crate::error::{AppError, Result};

/// Execute the list command
pub fn run_list(session: &Session) -> Result<()> {
    let list = collect_list(session)?;
    print_output(&list, session.format())?;
    Ok(())
}

/// Every device, regardless of the configured selector
pub fn collect_list(session: &Session) -> Result<DeviceList> {
    let nvml = session.nvml();
    let driver_version = nvml.driver_version()?;

    let devices = nvml
        .devices()?
        .iter()
        .map(|device| device.info())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if devices.is_empty() {
        return Err(AppError::NoGpusFound);
    }

    Ok(DeviceList {
        driver_version,
        devices,
    })
}
