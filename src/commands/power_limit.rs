//! Power-limit command implementation

use crate::cli::output::{print_output, Message};
use crate::commands::Session;
use crate::domain::PowerLimit;
use crate::error::Result;
use crate::nvml::Device;

/// Execute the power-limit command on every selected GPU
pub fn run_power_limit(session: &Session, milliwatts: u32) -> Result<()> {
    let limit = PowerLimit::from_milliwatts(milliwatts);
    for device in session.devices()? {
        let message = apply_power_limit(&device, limit)?;
        print_output(&message, session.format())?;
    }
    Ok(())
}

/// Set the limit, rejecting values outside the device's constraints up front
pub fn apply_power_limit(device: &Device<'_>, limit: PowerLimit) -> Result<Message> {
    let index = device.index()?;

    match device.power_management_limit_constraints() {
        Ok(constraints) if !constraints.contains(&limit) => {
            return Ok(Message {
                message: format!(
                    "GPU {}: {} is outside the allowed range {}",
                    index, limit, constraints
                ),
                success: false,
            });
        }
        Ok(_) => {}
        Err(e) => log::debug!("GPU {}: no power constraints ({}), letting NVML validate", index, e),
    }

    device.set_power_management_limit(limit)?;
    log::info!("GPU {}: power limit set to {}", index, limit);

    Ok(Message {
        message: format!("GPU {}: power limit set to {}", index, limit),
        success: true,
    })
}
