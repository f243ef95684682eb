//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{
    AutoBoostState, Bar1MemoryInfo, ClockReading, CodecUtilization, DeviceInfo, EccErrorCounts,
    EccMode, FanSpeed, MemoryInfo, PcieLinkStatus, PcieThroughput, PerformanceState,
    PowerConstraints, PowerLimit, SystemInfo, Temperature, ThermalThresholds, ThrottleReasons,
    Utilization,
};
use crate::nvml::EntryStatus;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::from)?;
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().trim_end().replace('\n', " | ")
    }
}

fn or_na<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

impl TableDisplay for SystemInfo {
    fn to_table(&self) -> String {
        format!(
            "Library: {}\nDriver Version: {}\nNVML Version: {}\nCUDA Version: {}\nGPUs Found: {}",
            self.library,
            self.driver_version,
            self.nvml_version,
            or_na(&self.cuda_driver_version),
            self.device_count
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "driver {} nvml {} cuda {} gpus {}",
            self.driver_version,
            self.nvml_version,
            or_na(&self.cuda_driver_version),
            self.device_count
        )
    }
}

/// GPU list for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceList {
    pub driver_version: String,
    pub devices: Vec<DeviceInfo>,
}

impl TableDisplay for DeviceList {
    fn to_table(&self) -> String {
        let mut output = format!("Driver Version: {}\n", self.driver_version);
        output.push_str(&format!("GPUs Found: {}\n\n", self.devices.len()));

        for device in &self.devices {
            output.push_str(&format!(
                "[{}] {} (UUID: {}, Bus: {})\n",
                device.index,
                device.name,
                device.uuid,
                or_na(&device.pci_bus_id)
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        self.devices
            .iter()
            .map(|d| format!("{}:{}", d.index, d.short_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Memory and utilization section
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStatus {
    pub memory: Option<MemoryInfo>,
    pub bar1: Option<Bar1MemoryInfo>,
    pub utilization: Option<Utilization>,
    pub encoder: Option<CodecUtilization>,
    pub decoder: Option<CodecUtilization>,
}

impl TableDisplay for MemoryStatus {
    fn to_table(&self) -> String {
        let mut output = String::new();
        match &self.memory {
            Some(m) => output.push_str(&format!("  Memory: {} ({}%)\n", m, m.usage_percent())),
            None => output.push_str("  Memory: N/A\n"),
        }
        if let Some(bar1) = &self.bar1 {
            output.push_str(&format!(
                "  BAR1: {} / {} MiB\n",
                bar1.used / 1024 / 1024,
                bar1.total / 1024 / 1024
            ));
        }
        if let Some(u) = &self.utilization {
            output.push_str(&format!("  Utilization: GPU {}%, Memory {}%\n", u.gpu, u.memory));
        }
        let codec = |c: &Option<CodecUtilization>| {
            c.map(|c| format!("{}%", c.percent()))
                .unwrap_or_else(|| "N/A".to_string())
        };
        output.push_str(&format!(
            "  Encoder: {}, Decoder: {}\n",
            codec(&self.encoder),
            codec(&self.decoder)
        ));
        output
    }
}

/// Power section
#[derive(Debug, Clone, Default, Serialize)]
pub struct PowerStatus {
    pub usage: Option<PowerLimit>,
    pub limit: Option<PowerLimit>,
    pub enforced_limit: Option<PowerLimit>,
    pub default_limit: Option<PowerLimit>,
    pub constraints: Option<PowerConstraints>,
    pub energy_mj: Option<u64>,
    pub performance_state: Option<PerformanceState>,
}

impl TableDisplay for PowerStatus {
    fn to_table(&self) -> String {
        let mut output = format!(
            "  Power Usage: {}\n  Power Limit: {} (enforced {})\n",
            or_na(&self.usage),
            or_na(&self.limit),
            or_na(&self.enforced_limit)
        );
        if let Some(c) = &self.constraints {
            output.push_str(&format!("  Range: {}\n", c));
        }
        if let Some(d) = &self.default_limit {
            output.push_str(&format!("  Default: {}\n", d));
        }
        if let Some(e) = self.energy_mj {
            output.push_str(&format!("  Energy: {:.1} kJ\n", e as f64 / 1_000_000.0));
        }
        output.push_str(&format!(
            "  Performance State: {}\n",
            or_na(&self.performance_state)
        ));
        output
    }
}

/// Thermal section
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThermalStatus {
    pub temperature: Option<Temperature>,
    pub thresholds: ThermalThresholds,
    pub fan_speed: Option<FanSpeed>,
}

impl TableDisplay for ThermalStatus {
    fn to_table(&self) -> String {
        let mut output = format!("  Temperature: {}\n", or_na(&self.temperature));

        if let Some(t) = self.thresholds.shutdown {
            output.push_str(&format!("  Shutdown Threshold: {}\n", t));
        }
        if let Some(t) = self.thresholds.slowdown {
            output.push_str(&format!("  Slowdown Threshold: {}\n", t));
        }
        if let Some(t) = self.thresholds.gpu_max {
            output.push_str(&format!("  Max Operating: {}\n", t));
        }
        output.push_str(&format!("  Fan Speed: {}\n", or_na(&self.fan_speed)));

        output
    }
}

/// PCIe section
#[derive(Debug, Clone, Default, Serialize)]
pub struct PcieStatus {
    pub link: Option<PcieLinkStatus>,
    pub throughput: Option<PcieThroughput>,
    pub replay_counter: Option<u32>,
}

impl TableDisplay for PcieStatus {
    fn to_table(&self) -> String {
        let mut output = format!("  PCIe Link: {}\n", or_na(&self.link));
        if let Some(link) = &self.link {
            output.push_str(&format!(
                "  Bandwidth: {:.1} GB/s per direction\n",
                link.current_bandwidth_gbps()
            ));
        }
        if let Some(t) = &self.throughput {
            output.push_str(&format!("  Throughput: {}\n", t));
        }
        output.push_str(&format!("  Replay Counter: {}\n", or_na(&self.replay_counter)));
        output
    }
}

/// ECC section
#[derive(Debug, Clone, Default, Serialize)]
pub struct EccStatus {
    pub mode: Option<EccMode>,
    pub volatile: Option<EccErrorCounts>,
    pub aggregate: Option<EccErrorCounts>,
}

impl TableDisplay for EccStatus {
    fn to_table(&self) -> String {
        let Some(mode) = &self.mode else {
            return "  ECC: Not Supported\n".to_string();
        };

        let mut output = format!("  ECC: {}\n", mode);
        if let Some(c) = &self.volatile {
            output.push_str(&format!(
                "  Errors (Current Boot): {} corrected, {} uncorrected\n",
                c.corrected, c.uncorrected
            ));
        }
        if let Some(c) = &self.aggregate {
            output.push_str(&format!(
                "  Errors (Lifetime): {} corrected, {} uncorrected\n",
                c.corrected, c.uncorrected
            ));
        }
        output
    }
}

/// Detailed information about one device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetails {
    pub info: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal: Option<ThermalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcie: Option<PcieStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecc: Option<EccStatus>,
}

impl TableDisplay for DeviceDetails {
    fn to_table(&self) -> String {
        let info = &self.info;
        let mut output = format!("{}\n", info);
        output.push_str(&format!("  UUID: {}\n", info.uuid));
        output.push_str(&format!("  Brand: {}\n", or_na(&info.brand)));
        output.push_str(&format!("  Serial: {}\n", or_na(&info.serial)));
        output.push_str(&format!("  PCI Bus: {}\n", or_na(&info.pci_bus_id)));
        output.push_str(&format!("  VBIOS: {}\n", or_na(&info.vbios_version)));
        output.push_str(&format!(
            "  Compute Capability: {}\n",
            or_na(&info.compute_capability)
        ));

        if let Some(s) = &self.memory {
            output.push_str(&s.to_table());
        }
        if let Some(s) = &self.power {
            output.push_str(&s.to_table());
        }
        if let Some(s) = &self.thermal {
            output.push_str(&s.to_table());
        }
        if let Some(s) = &self.pcie {
            output.push_str(&s.to_table());
        }
        if let Some(s) = &self.ecc {
            output.push_str(&s.to_table());
        }

        output
    }

    fn to_compact(&self) -> String {
        let mut parts = vec![format!("{}:{}", self.info.index, self.info.short_name())];
        if let Some(m) = self.memory.as_ref().and_then(|s| s.memory) {
            parts.push(format!("mem {}%", m.usage_percent()));
        }
        if let Some(p) = self.power.as_ref().and_then(|s| s.usage) {
            parts.push(p.to_string());
        }
        if let Some(t) = self.thermal.as_ref().and_then(|s| s.temperature) {
            parts.push(t.to_string());
        }
        parts.join(" ")
    }
}

/// One clock domain row
#[derive(Debug, Clone, Serialize)]
pub struct ClockDomainEntry {
    pub domain: String,
    #[serde(flatten)]
    pub reading: ClockReading,
}

/// Clock status display
#[derive(Debug, Clone, Serialize)]
pub struct ClockStatus {
    pub gpu_name: String,
    pub gpu_index: u32,
    pub domains: Vec<ClockDomainEntry>,
    pub performance_state: Option<PerformanceState>,
    pub throttle_reasons: Option<ThrottleReasons>,
    pub auto_boost: Option<AutoBoostState>,
}

impl TableDisplay for ClockStatus {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] {}\n", self.gpu_index, self.gpu_name);
        output.push_str("  Domain     Current     Max         App         Default\n");
        output.push_str("  ─────────────────────────────────────────────────────────\n");

        for d in &self.domains {
            let r = &d.reading;
            output.push_str(&format!(
                "  {:<10} {:<11} {:<11} {:<11} {}\n",
                d.domain,
                or_na(&r.current),
                or_na(&r.max),
                or_na(&r.applications),
                or_na(&r.default_applications)
            ));
        }

        output.push_str(&format!(
            "\n  Performance State: {}\n",
            or_na(&self.performance_state)
        ));

        match &self.throttle_reasons {
            Some(t) if t.active_reasons().is_empty() => output.push_str("  Throttling: None\n"),
            Some(t) => output.push_str(&format!(
                "  Throttling: {}\n",
                t.active_reasons().join(", ")
            )),
            None => output.push_str("  Throttling: N/A\n"),
        }

        if let Some(b) = &self.auto_boost {
            output.push_str(&format!(
                "  Auto Boost: {} (default {})\n",
                if b.enabled { "On" } else { "Off" },
                if b.default_enabled { "On" } else { "Off" }
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        let current: Vec<String> = self
            .domains
            .iter()
            .map(|d| format!("{} {}", d.domain, or_na(&d.reading.current)))
            .collect();
        format!("GPU {}: {}", self.gpu_index, current.join(", "))
    }
}

/// Process list output
#[derive(Debug, Clone, Serialize)]
pub struct ProcessListOutput {
    pub gpu_name: String,
    pub gpu_index: u32,
    pub process_count: usize,
    pub total_memory_mb: f64,
    pub processes: Vec<ProcessEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub memory_mb: Option<f64>,
    pub process_type: String,
}

impl TableDisplay for ProcessListOutput {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] {}\n", self.gpu_index, self.gpu_name);
        output.push_str(&format!(
            "  Processes: {} (Total Memory: {:.1} MB)\n\n",
            self.process_count, self.total_memory_mb
        ));

        if self.processes.is_empty() {
            output.push_str("  No processes running on GPU\n");
            return output;
        }

        // Table header
        output.push_str("  PID      Memory      Type       Name\n");
        output.push_str("  ────────────────────────────────────────────────────────────\n");

        for process in &self.processes {
            let memory = process
                .memory_mb
                .map(|mb| format!("{:.1} MB", mb))
                .unwrap_or_else(|| "N/A".to_string());
            output.push_str(&format!(
                "  {:<8} {:<11} {:<10} {}\n",
                process.pid, memory, process.process_type, process.name
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        if self.processes.is_empty() {
            format!("GPU {}: No processes", self.gpu_index)
        } else {
            format!(
                "GPU {}: {} processes, {:.1} MB total",
                self.gpu_index, self.process_count, self.total_memory_mb
            )
        }
    }
}

/// Symbol resolution report
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub library: String,
    pub resolved: usize,
    pub missing: usize,
    pub symbols: Vec<EntryStatus>,
}

impl TableDisplay for SymbolReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "Library: {}\nResolved: {}, Missing: {}\n\n",
            self.library, self.resolved, self.missing
        );
        for entry in &self.symbols {
            output.push_str(&format!(
                "  {} {}({})\n",
                if entry.resolved { "✓" } else { "✗" },
                entry.symbol,
                entry.signature
            ));
        }
        output
    }

    fn to_compact(&self) -> String {
        format!("{} resolved, {} missing", self.resolved, self.missing)
    }
}

/// Rendered status code
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStringOutput {
    pub code: u32,
    pub message: String,
}

impl TableDisplay for ErrorStringOutput {
    fn to_table(&self) -> String {
        format!("{}: {}", self.code, self.message)
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClockSpeed, CudaDriverVersion};

    fn device_info() -> DeviceInfo {
        DeviceInfo::new(0, "NVIDIA Test GPU".to_string(), "GPU-123".to_string())
            .with_pci_bus_id("00000000:01:00.0".to_string())
    }

    #[test]
    fn test_device_list_table() {
        let list = DeviceList {
            driver_version: "535.104.05".to_string(),
            devices: vec![device_info()],
        };

        let output = list.to_table();
        assert!(output.contains("Driver Version: 535.104.05"));
        assert!(output.contains("[0] NVIDIA Test GPU (UUID: GPU-123, Bus: 00000000:01:00.0)"));
        assert_eq!(list.to_compact(), "0:Test GPU");
    }

    #[test]
    fn test_system_info_missing_cuda() {
        let mut info = SystemInfo {
            library: "libnvidia-ml.so.1".to_string(),
            driver_version: "535.104.05".to_string(),
            nvml_version: "12.535.104.05".to_string(),
            cuda_driver_version: None,
            device_count: 2,
        };
        assert!(info.to_table().contains("CUDA Version: N/A"));

        info.cuda_driver_version = Some(CudaDriverVersion::from_raw(12020));
        assert!(info.to_table().contains("CUDA Version: 12.2"));
    }

    #[test]
    fn test_device_details_sections_are_optional() {
        let details = DeviceDetails {
            info: device_info(),
            memory: None,
            power: Some(PowerStatus {
                usage: Some(PowerLimit::from_milliwatts(71_250)),
                ..Default::default()
            }),
            thermal: None,
            pcie: None,
            ecc: Some(EccStatus::default()),
        };

        let table = details.to_table();
        assert!(table.contains("Power Usage: 71.25W"));
        assert!(table.contains("ECC: Not Supported"));
        assert!(!table.contains("Temperature"));

        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("thermal").is_none());
        assert_eq!(json["power"]["usage"], 71_250);
    }

    #[test]
    fn test_clock_status_table() {
        let status = ClockStatus {
            gpu_name: "Test GPU".to_string(),
            gpu_index: 1,
            domains: vec![ClockDomainEntry {
                domain: "Graphics".to_string(),
                reading: ClockReading {
                    current: Some(ClockSpeed::new(1410)),
                    ..Default::default()
                },
            }],
            performance_state: None,
            throttle_reasons: Some(ThrottleReasons::from_bits(ThrottleReasons::IDLE)),
            auto_boost: None,
        };

        let table = status.to_table();
        assert!(table.contains("1410 MHz"));
        assert!(table.contains("Throttling: Idle"));
        assert_eq!(status.to_compact(), "GPU 1: Graphics 1410 MHz");
    }

    #[test]
    fn test_symbol_report() {
        let report = SymbolReport {
            library: "mock".to_string(),
            resolved: 1,
            missing: 1,
            symbols: vec![
                EntryStatus {
                    symbol: "nvmlInit_v2",
                    signature: "",
                    resolved: true,
                },
                EntryStatus {
                    symbol: "nvmlDeviceGetFanSpeed",
                    signature: "nvmlDevice_t, *mut c_uint",
                    resolved: false,
                },
            ],
        };

        let table = report.to_table();
        assert!(table.contains("✓ nvmlInit_v2()"));
        assert!(table.contains("✗ nvmlDeviceGetFanSpeed(nvmlDevice_t, *mut c_uint)"));
        assert_eq!(report.to_compact(), "1 resolved, 1 missing");
    }

    #[test]
    fn test_default_compact_joins_lines() {
        let output = ErrorStringOutput {
            code: 3,
            message: "Not Supported".to_string(),
        };
        assert_eq!(output.to_compact(), "3: Not Supported");
    }

    #[test]
    fn test_message_display() {
        let msg = Message {
            message: "Operation completed".to_string(),
            success: true,
        };

        assert!(msg.to_table().starts_with('✓'));
    }
}
