//! Info command implementation
//!
//! Shows detailed GPU information. Values a device does not support are
//! shown as unavailable; any other failure aborts the command.

use crate::cli::args::InfoArgs;
use crate::cli::output::{
    print_output, DeviceDetails, EccStatus, MemoryStatus, PcieStatus, PowerStatus, ThermalStatus,
};
use crate::commands::Session;
use crate::domain::{EccCounterType, TemperatureSensor};
use crate::error::{OptionalExt, Result};
use crate::nvml::Device;

/// Execute the info command
pub fn run_info(session: &Session, args: &InfoArgs) -> Result<()> {
    let devices = session.devices()?;
    let last = devices.len().saturating_sub(1);

    for (i, device) in devices.iter().enumerate() {
        let details = collect_details(device, args)?;
        print_output(&details, session.format())?;

        if i < last {
            println!(); // Separator between GPUs
        }
    }

    Ok(())
}

/// Gather the sections `args` asks for; none selected means all
pub fn collect_details(device: &Device<'_>, args: &InfoArgs) -> Result<DeviceDetails> {
    let show_all = args.all || !(args.memory || args.power || args.pcie || args.ecc);

    let info = device.info()?;
    log::debug!("Collecting details for {}", info);

    Ok(DeviceDetails {
        info,
        memory: (show_all || args.memory).then(|| memory_status(device)).transpose()?,
        power: (show_all || args.power).then(|| power_status(device)).transpose()?,
        thermal: (show_all || args.power).then(|| thermal_status(device)).transpose()?,
        pcie: (show_all || args.pcie).then(|| pcie_status(device)).transpose()?,
        ecc: (show_all || args.ecc).then(|| ecc_status(device)).transpose()?,
    })
}

fn memory_status(device: &Device<'_>) -> Result<MemoryStatus> {
    Ok(MemoryStatus {
        memory: device.memory_info().optional()?,
        bar1: device.bar1_memory_info().optional()?,
        utilization: device.utilization_rates().optional()?,
        encoder: device.encoder_utilization().optional()?,
        decoder: device.decoder_utilization().optional()?,
    })
}

fn power_status(device: &Device<'_>) -> Result<PowerStatus> {
    Ok(PowerStatus {
        usage: device.power_usage().optional()?,
        limit: device.power_management_limit().optional()?,
        enforced_limit: device.enforced_power_limit().optional()?,
        default_limit: device.power_management_default_limit().optional()?,
        constraints: device.power_management_limit_constraints().optional()?,
        energy_mj: device.total_energy_consumption().optional()?,
        performance_state: device.performance_state().optional()?,
    })
}

fn thermal_status(device: &Device<'_>) -> Result<ThermalStatus> {
    Ok(ThermalStatus {
        temperature: device.temperature(TemperatureSensor::Gpu).optional()?,
        thresholds: device.thermal_thresholds()?,
        fan_speed: device.fan_speed().optional()?,
    })
}

fn pcie_status(device: &Device<'_>) -> Result<PcieStatus> {
    Ok(PcieStatus {
        link: device.pcie_link_status().optional()?,
        throughput: device.pcie_throughput_both().optional()?,
        replay_counter: device.pcie_replay_counter().optional()?,
    })
}

fn ecc_status(device: &Device<'_>) -> Result<EccStatus> {
    let mode = device.ecc_mode().optional()?;
    if !mode.is_some_and(|m| m.current) {
        return Ok(EccStatus {
            mode,
            ..Default::default()
        });
    }

    Ok(EccStatus {
        mode,
        volatile: device.ecc_error_counts(EccCounterType::Volatile).optional()?,
        aggregate: device.ecc_error_counts(EccCounterType::Aggregate).optional()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::session;
    use crate::config::Config;
    use crate::domain::PowerLimit;
    use crate::error::AppError;
    use crate::mock::{self, MockState};
    use crate::nvml::status;

    #[test]
    fn test_collect_all_sections() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let details = collect_details(&device, &InfoArgs::default()).unwrap();
        assert_eq!(details.info.name, "NVIDIA Mock GPU 0");

        let power = details.power.unwrap();
        assert_eq!(power.usage, Some(PowerLimit::from_milliwatts(71_250)));
        assert_eq!(power.constraints.map(|c| c.max.as_watts()), Some(350));

        let ecc = details.ecc.unwrap();
        assert_eq!(ecc.volatile.map(|c| c.corrected), Some(3));
        assert_eq!(ecc.aggregate.map(|c| c.corrected), Some(17));

        assert!(details.memory.is_some());
        assert!(details.thermal.is_some());
        assert!(details.pcie.is_some());
    }

    #[test]
    fn test_collect_selected_section() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let args = InfoArgs {
            pcie: true,
            ..Default::default()
        };
        let details = collect_details(&device, &args).unwrap();
        assert!(details.pcie.is_some());
        assert!(details.memory.is_none());
        assert!(details.power.is_none());
        assert!(details.ecc.is_none());
    }

    #[test]
    fn test_unsupported_queries_become_none() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetFanSpeed", status::NOT_SUPPORTED)
                .with_failure("nvmlDeviceGetEccMode", status::NOT_SUPPORTED),
        );
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let details = collect_details(&device, &InfoArgs::default()).unwrap();
        let thermal = details.thermal.unwrap();
        assert_eq!(thermal.fan_speed, None);
        assert!(thermal.temperature.is_some());

        let ecc = details.ecc.unwrap();
        assert!(ecc.mode.is_none());
        assert!(ecc.volatile.is_none());
    }

    #[test]
    fn test_ecc_disabled_skips_counters() {
        let mut state = MockState::default().initialized();
        state.devices[0].ecc_mode = (0, 0);
        let _guard = mock::install(state);
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let ecc = ecc_status(&device).unwrap();
        assert_eq!(ecc.mode.map(|m| m.current), Some(false));
        assert!(ecc.volatile.is_none());
    }

    #[test]
    fn test_lost_gpu_fails_the_command() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetFanSpeed", status::GPU_IS_LOST),
        );
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let err = collect_details(&device, &InfoArgs::default()).unwrap_err();
        assert!(matches!(err, AppError::Nvml(ref e) if e.code() == Some(status::GPU_IS_LOST)));

        // Sections that were not asked for are never queried
        let args = InfoArgs {
            pcie: true,
            ..Default::default()
        };
        assert!(collect_details(&device, &args).is_ok());
    }
}
