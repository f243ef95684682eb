//! Clocks command implementation

use crate::cli::output::{print_output, ClockDomainEntry, ClockStatus};
use crate::commands::Session;
use crate::domain::ClockType;
use crate::error::{OptionalExt, Result};
use crate::nvml::Device;

/// Execute the clocks command
pub fn run_clocks(session: &Session) -> Result<()> {
    for device in session.devices()? {
        let status = collect_clocks(&device)?;
        print_output(&status, session.format())?;
    }
    Ok(())
}

/// Every clock domain plus throttle and boost state
pub fn collect_clocks(device: &Device<'_>) -> Result<ClockStatus> {
    let domains = ClockType::ALL
        .iter()
        .map(|&clock_type| {
            Ok(ClockDomainEntry {
                domain: clock_type.to_string(),
                reading: device.clocks(clock_type)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ClockStatus {
        gpu_name: device.name()?,
        gpu_index: device.index()?,
        domains,
        performance_state: device.performance_state().optional()?,
        throttle_reasons: device.current_clocks_throttle_reasons().optional()?,
        auto_boost: device.auto_boosted_clocks_enabled().optional()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::session;
    use crate::config::Config;
    use crate::domain::{ClockSpeed, PerformanceState};
    use crate::mock::{self, MockState};
    use crate::nvml::status;

    #[test]
    fn test_collect_clocks() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let status = collect_clocks(&device).unwrap();
        assert_eq!(status.domains.len(), 4);
        assert_eq!(status.domains[2].reading.current, Some(ClockSpeed::new(7001)));
        assert_eq!(status.performance_state, Some(PerformanceState::P8));
        assert!(status.throttle_reasons.is_some_and(|t| t.idle));
    }

    #[test]
    fn test_unsupported_max_clock() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetMaxClockInfo", status::NOT_SUPPORTED),
        );
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();

        let status = collect_clocks(&device).unwrap();
        assert!(status.domains.iter().all(|d| d.reading.max.is_none()));
        assert!(status.domains.iter().all(|d| d.reading.current.is_some()));
    }

    #[test]
    fn test_collect_after_shutdown_fails() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();
        session.nvml().shutdown().unwrap();

        assert!(collect_clocks(&device).is_err());
    }
}
