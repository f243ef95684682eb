//! NVML symbol table
//!
//! Every native entry point the crate calls is declared once below with its
//! exported name and C signature. The declaration produces a field of
//! [`FunctionTable`] holding a typed function pointer, so argument order and
//! arity are checked by the compiler at every call site instead of by
//! convention.
//!
//! The table is resolved eagerly when a library is bound; see
//! [`BindStrategy`] for how missing symbols are treated.

use crate::error::NvmlError;
use crate::nvml::layout::{
    RawBar1Memory, RawMemory, RawPciInfo, RawProcessInfo, RawUtilization, RawViolationTime,
};
use crate::nvml::library::Library;
use crate::nvml::status::Status;

use serde::Serialize;
use nvml_wrapper_sys::bindings::nvmlDevice_t;
use std::ffi::{c_char, c_int, c_uint, c_ulonglong};
#[cfg(target_os = "linux")]
use std::ffi::c_ulong;

/// How symbols missing from the loaded library are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindStrategy {
    /// Fail the load if any table symbol is missing
    #[default]
    Strict,
    /// Fail the load only if a core symbol is missing; other operations
    /// report [`NvmlError::SymbolNotFound`] when called
    Lenient,
}

/// Symbols without which no session can work, regardless of strategy
pub const CORE_SYMBOLS: &[&str] = &["nvmlInit_v2", "nvmlShutdown", "nvmlErrorString"];

/// A table slot: the exported name and, if resolved, its typed pointer
#[derive(Debug, Clone, Copy)]
pub struct Entry<F> {
    symbol: &'static str,
    func: Option<F>,
}

impl<F: Copy> Entry<F> {
    fn resolve(library: &Library, symbol: &'static str) -> Self {
        let func = match library.resolve(symbol) {
            // SAFETY: F is the signature declared for `symbol` in the table
            // below, and the table never outlives the library it came from
            // (both are owned by the same `Nvml`).
            Ok(sym) => Some(unsafe { sym.cast::<F>() }),
            Err(_) => None,
        };
        Self { symbol, func }
    }

    /// Exported name of this entry
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Whether the library exported this symbol
    pub fn is_resolved(&self) -> bool {
        self.func.is_some()
    }

    /// The typed pointer, or `SymbolNotFound` if the library lacks it
    pub fn get(&self) -> Result<F, NvmlError> {
        self.func.ok_or_else(|| NvmlError::SymbolNotFound {
            symbol: self.symbol.to_string(),
        })
    }
}

/// Resolution status of one table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStatus {
    /// Exported name
    pub symbol: &'static str,
    /// C parameter list as declared in the table
    pub signature: &'static str,
    /// Whether the library exported it
    pub resolved: bool,
}

macro_rules! nvml_fn {
    (($($arg:ty),*) -> $ret:ty) => { unsafe extern "C" fn($($arg),*) -> $ret };
    (($($arg:ty),*)) => { unsafe extern "C" fn($($arg),*) -> Status };
}

macro_rules! nvml_functions {
    (
        $(
            $(#[cfg($cfg:meta)])?
            $field:ident = $symbol:literal ($($arg:ty),* $(,)?) $(-> $ret:ty)?;
        )*
    ) => {
        /// Typed NVML entry points resolved from one [`Library`]
        pub struct FunctionTable {
            $(
                $(#[cfg($cfg)])?
                pub $field: Entry<nvml_fn!(($($arg),*) $(-> $ret)?)>,
            )*
        }

        impl FunctionTable {
            /// Resolve every entry from `library`, leaving missing ones empty
            pub fn resolve(library: &Library) -> Self {
                Self {
                    $(
                        $(#[cfg($cfg)])?
                        $field: Entry::resolve(library, $symbol),
                    )*
                }
            }

            /// Resolution status of every entry, in declaration order
            pub fn entries(&self) -> Vec<EntryStatus> {
                let mut entries = Vec::new();
                $(
                    $(#[cfg($cfg)])?
                    entries.push(EntryStatus {
                        symbol: $symbol,
                        signature: stringify!(($($arg),*)),
                        resolved: self.$field.is_resolved(),
                    });
                )*
                entries
            }
        }
    };
}

nvml_functions! {
    // Initialization and error reporting
    init = "nvmlInit_v2"();
    shutdown = "nvmlShutdown"();
    error_string = "nvmlErrorString"(Status) -> *const c_char;

    // System queries
    system_get_cuda_driver_version = "nvmlSystemGetCudaDriverVersion"(*mut c_int);
    system_get_driver_version = "nvmlSystemGetDriverVersion"(*mut c_char, c_uint);
    system_get_nvml_version = "nvmlSystemGetNVMLVersion"(*mut c_char, c_uint);
    system_get_process_name = "nvmlSystemGetProcessName"(c_uint, *mut c_char, c_uint);

    // Device enumeration and lookup
    device_get_count = "nvmlDeviceGetCount_v2"(*mut c_uint);
    device_get_handle_by_index = "nvmlDeviceGetHandleByIndex_v2"(c_uint, *mut nvmlDevice_t);
    device_get_handle_by_uuid = "nvmlDeviceGetHandleByUUID"(*const c_char, *mut nvmlDevice_t);
    device_get_handle_by_serial = "nvmlDeviceGetHandleBySerial"(*const c_char, *mut nvmlDevice_t);
    device_get_handle_by_pci_bus_id = "nvmlDeviceGetHandleByPciBusId_v2"(*const c_char, *mut nvmlDevice_t);
    device_get_index = "nvmlDeviceGetIndex"(nvmlDevice_t, *mut c_uint);

    // Device identity
    device_get_name = "nvmlDeviceGetName"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_uuid = "nvmlDeviceGetUUID"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_serial = "nvmlDeviceGetSerial"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_brand = "nvmlDeviceGetBrand"(nvmlDevice_t, *mut c_uint);
    device_get_board_part_number = "nvmlDeviceGetBoardPartNumber"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_board_id = "nvmlDeviceGetBoardId"(nvmlDevice_t, *mut c_uint);
    device_get_vbios_version = "nvmlDeviceGetVbiosVersion"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_minor_number = "nvmlDeviceGetMinorNumber"(nvmlDevice_t, *mut c_uint);
    device_get_inforom_image_version = "nvmlDeviceGetInforomImageVersion"(nvmlDevice_t, *mut c_char, c_uint);
    device_get_pci_info = "nvmlDeviceGetPciInfo_v3"(nvmlDevice_t, *mut RawPciInfo);
    device_get_cuda_compute_capability = "nvmlDeviceGetCudaComputeCapability"(nvmlDevice_t, *mut c_int, *mut c_int);

    // Clocks
    device_get_clock_info = "nvmlDeviceGetClockInfo"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_max_clock_info = "nvmlDeviceGetMaxClockInfo"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_applications_clock = "nvmlDeviceGetApplicationsClock"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_default_applications_clock = "nvmlDeviceGetDefaultApplicationsClock"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_clock = "nvmlDeviceGetClock"(nvmlDevice_t, c_uint, c_uint, *mut c_uint);
    device_get_supported_memory_clocks = "nvmlDeviceGetSupportedMemoryClocks"(nvmlDevice_t, *mut c_uint, *mut c_uint);
    device_get_supported_graphics_clocks = "nvmlDeviceGetSupportedGraphicsClocks"(nvmlDevice_t, c_uint, *mut c_uint, *mut c_uint);
    device_get_current_clocks_throttle_reasons = "nvmlDeviceGetCurrentClocksThrottleReasons"(nvmlDevice_t, *mut c_ulonglong);
    device_get_supported_clocks_throttle_reasons = "nvmlDeviceGetSupportedClocksThrottleReasons"(nvmlDevice_t, *mut c_ulonglong);
    device_get_auto_boosted_clocks_enabled = "nvmlDeviceGetAutoBoostedClocksEnabled"(nvmlDevice_t, *mut c_int, *mut c_int);
    device_set_auto_boosted_clocks_enabled = "nvmlDeviceSetAutoBoostedClocksEnabled"(nvmlDevice_t, c_uint);
    device_set_applications_clocks = "nvmlDeviceSetApplicationsClocks"(nvmlDevice_t, c_uint, c_uint);
    device_reset_applications_clocks = "nvmlDeviceResetApplicationsClocks"(nvmlDevice_t);

    // Thermal, fan and power
    device_get_temperature = "nvmlDeviceGetTemperature"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_temperature_threshold = "nvmlDeviceGetTemperatureThreshold"(nvmlDevice_t, c_uint, *mut c_uint);
    device_get_fan_speed = "nvmlDeviceGetFanSpeed"(nvmlDevice_t, *mut c_uint);
    device_get_power_usage = "nvmlDeviceGetPowerUsage"(nvmlDevice_t, *mut c_uint);
    device_get_power_management_limit = "nvmlDeviceGetPowerManagementLimit"(nvmlDevice_t, *mut c_uint);
    device_get_power_management_limit_constraints = "nvmlDeviceGetPowerManagementLimitConstraints"(nvmlDevice_t, *mut c_uint, *mut c_uint);
    device_get_power_management_default_limit = "nvmlDeviceGetPowerManagementDefaultLimit"(nvmlDevice_t, *mut c_uint);
    device_get_enforced_power_limit = "nvmlDeviceGetEnforcedPowerLimit"(nvmlDevice_t, *mut c_uint);
    device_set_power_management_limit = "nvmlDeviceSetPowerManagementLimit"(nvmlDevice_t, c_uint);
    device_get_total_energy_consumption = "nvmlDeviceGetTotalEnergyConsumption"(nvmlDevice_t, *mut c_ulonglong);
    device_get_performance_state = "nvmlDeviceGetPerformanceState"(nvmlDevice_t, *mut c_uint);
    device_get_violation_status = "nvmlDeviceGetViolationStatus"(nvmlDevice_t, c_uint, *mut RawViolationTime);

    // Memory, utilization and ECC
    device_get_memory_info = "nvmlDeviceGetMemoryInfo"(nvmlDevice_t, *mut RawMemory);
    device_get_bar1_memory_info = "nvmlDeviceGetBAR1MemoryInfo"(nvmlDevice_t, *mut RawBar1Memory);
    device_get_utilization_rates = "nvmlDeviceGetUtilizationRates"(nvmlDevice_t, *mut RawUtilization);
    device_get_encoder_utilization = "nvmlDeviceGetEncoderUtilization"(nvmlDevice_t, *mut c_uint, *mut c_uint);
    device_get_decoder_utilization = "nvmlDeviceGetDecoderUtilization"(nvmlDevice_t, *mut c_uint, *mut c_uint);
    device_get_encoder_stats = "nvmlDeviceGetEncoderStats"(nvmlDevice_t, *mut c_uint, *mut c_uint, *mut c_uint);
    device_get_ecc_mode = "nvmlDeviceGetEccMode"(nvmlDevice_t, *mut c_int, *mut c_int);
    device_get_total_ecc_errors = "nvmlDeviceGetTotalEccErrors"(nvmlDevice_t, c_uint, c_uint, *mut c_ulonglong);
    device_clear_ecc_error_counts = "nvmlDeviceClearEccErrorCounts"(nvmlDevice_t, c_uint);
    device_get_retired_pages = "nvmlDeviceGetRetiredPages"(nvmlDevice_t, c_uint, *mut c_uint, *mut c_ulonglong);
    device_get_retired_pages_pending_status = "nvmlDeviceGetRetiredPagesPendingStatus"(nvmlDevice_t, *mut c_int);

    // PCIe
    device_get_curr_pcie_link_generation = "nvmlDeviceGetCurrPcieLinkGeneration"(nvmlDevice_t, *mut c_uint);
    device_get_curr_pcie_link_width = "nvmlDeviceGetCurrPcieLinkWidth"(nvmlDevice_t, *mut c_uint);
    device_get_max_pcie_link_generation = "nvmlDeviceGetMaxPcieLinkGeneration"(nvmlDevice_t, *mut c_uint);
    device_get_max_pcie_link_width = "nvmlDeviceGetMaxPcieLinkWidth"(nvmlDevice_t, *mut c_uint);
    device_get_pcie_replay_counter = "nvmlDeviceGetPcieReplayCounter"(nvmlDevice_t, *mut c_uint);
    device_get_pcie_throughput = "nvmlDeviceGetPcieThroughput"(nvmlDevice_t, c_uint, *mut c_uint);

    // Processes
    device_get_compute_running_processes = "nvmlDeviceGetComputeRunningProcesses"(nvmlDevice_t, *mut c_uint, *mut RawProcessInfo);
    device_get_graphics_running_processes = "nvmlDeviceGetGraphicsRunningProcesses"(nvmlDevice_t, *mut c_uint, *mut RawProcessInfo);

    // Modes and flags
    device_get_display_active = "nvmlDeviceGetDisplayActive"(nvmlDevice_t, *mut c_int);
    device_get_display_mode = "nvmlDeviceGetDisplayMode"(nvmlDevice_t, *mut c_int);
    device_get_persistence_mode = "nvmlDeviceGetPersistenceMode"(nvmlDevice_t, *mut c_int);
    device_set_persistence_mode = "nvmlDeviceSetPersistenceMode"(nvmlDevice_t, c_uint);
    device_get_compute_mode = "nvmlDeviceGetComputeMode"(nvmlDevice_t, *mut c_uint);
    device_set_compute_mode = "nvmlDeviceSetComputeMode"(nvmlDevice_t, c_uint);
    device_on_same_board = "nvmlDeviceOnSameBoard"(nvmlDevice_t, nvmlDevice_t, *mut c_int);

    // CPU affinity and topology
    #[cfg(target_os = "linux")]
    device_get_topology_nearest_gpus = "nvmlDeviceGetTopologyNearestGpus"(nvmlDevice_t, c_uint, *mut c_uint, *mut nvmlDevice_t);
    #[cfg(target_os = "linux")]
    device_get_cpu_affinity = "nvmlDeviceGetCpuAffinity"(nvmlDevice_t, c_uint, *mut c_ulong);
    #[cfg(target_os = "linux")]
    device_set_cpu_affinity = "nvmlDeviceSetCpuAffinity"(nvmlDevice_t);
    #[cfg(target_os = "linux")]
    device_clear_cpu_affinity = "nvmlDeviceClearCpuAffinity"(nvmlDevice_t);
}

impl FunctionTable {
    /// Names of all declared symbols the library did not export
    pub fn missing(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|e| !e.resolved)
            .map(|e| e.symbol)
            .collect()
    }

    /// Resolve `library` and apply `strategy` to any missing symbols
    pub fn bind(library: &Library, strategy: BindStrategy) -> Result<Self, NvmlError> {
        let table = Self::resolve(library);
        let missing = table.missing();

        if let Some(core) = missing.iter().find(|s| CORE_SYMBOLS.contains(*s)) {
            return Err(NvmlError::SymbolNotFound {
                symbol: core.to_string(),
            });
        }

        match (strategy, missing.first()) {
            (_, None) => {}
            (BindStrategy::Strict, Some(first)) => {
                log::error!(
                    "{} does not export {} NVML symbol(s), first: {}",
                    library.origin(),
                    missing.len(),
                    first
                );
                return Err(NvmlError::SymbolNotFound {
                    symbol: first.to_string(),
                });
            }
            (BindStrategy::Lenient, Some(_)) => {
                for symbol in &missing {
                    log::warn!("NVML symbol {} not available; calls to it will fail", symbol);
                }
            }
        }

        Ok(table)
    }
}
