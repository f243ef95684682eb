//! Persistence command implementation

use crate::cli::args::Toggle;
use crate::cli::output::{print_output, Message};
use crate::commands::Session;
use crate::error::Result;
use crate::nvml::Device;

/// Execute the persistence command on every selected GPU
pub fn run_persistence(session: &Session, state: Toggle) -> Result<()> {
    for device in session.devices()? {
        let message = apply_persistence(&device, state)?;
        print_output(&message, session.format())?;
    }
    Ok(())
}

pub fn apply_persistence(device: &Device<'_>, state: Toggle) -> Result<Message> {
    let index = device.index()?;
    let enabled = state.is_on();

    if device.persistence_mode()? == enabled {
        return Ok(Message {
            message: format!(
                "GPU {}: persistence mode already {}",
                index,
                if enabled { "enabled" } else { "disabled" }
            ),
            success: true,
        });
    }

    device.set_persistence_mode(enabled)?;
    log::info!("GPU {}: persistence mode set to {}", index, enabled);

    Ok(Message {
        message: format!(
            "GPU {}: persistence mode {}",
            index,
            if enabled { "enabled" } else { "disabled" }
        ),
        success: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::session;
    use crate::config::Config;
    use crate::error::AppError;
    use crate::mock::{self, MockState};
    use crate::nvml::status;

    #[test]
    fn test_disable_persistence() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let message = apply_persistence(&device, Toggle::Off).unwrap();
        assert_eq!(message.message, "GPU 0: persistence mode disabled");
        assert!(!device.persistence_mode().unwrap());
    }

    #[test]
    fn test_already_enabled_skips_call() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceSetPersistenceMode", status::NO_PERMISSION),
        );
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let message = apply_persistence(&device, Toggle::On).unwrap();
        assert!(message.message.contains("already enabled"));
    }

    #[test]
    fn test_permission_denied() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceSetPersistenceMode", status::NO_PERMISSION),
        );
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let err = apply_persistence(&device, Toggle::Off).unwrap_err();
        assert!(matches!(err, AppError::Nvml(ref e) if e.code() == Some(status::NO_PERMISSION)));
    }
}
