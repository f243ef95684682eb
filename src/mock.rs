//! Synthetic NVML library for testing
//!
//! Provides `extern "C"` stand-ins for every symbol in the NVML table,
//! backed by per-thread state, so the whole binding (resolution, marshaling,
//! status rendering, enumeration) can be exercised without a GPU.
//!
//! ```ignore
//! let _guard = mock::install(MockState::default().initialized());
//! let nvml = Nvml::from_library(mock::library(), BindStrategy::Strict)?;
//! ```

use crate::nvml::layout::{
    RawBar1Memory, RawMemory, RawPciInfo, RawProcessInfo, RawUtilization, RawViolationTime,
    VALUE_NOT_AVAILABLE,
};
use crate::nvml::library::{Library, RawSymbol};
use crate::nvml::status::{self, Status};

use nvml_wrapper_sys::bindings::nvmlDevice_t;
use std::cell::RefCell;
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::ffi::c_ulong;
use std::ffi::{c_char, c_int, c_uint, c_ulonglong, c_void, CStr};
use std::marker::PhantomData;
use std::ptr;

/// First fake handle value; device `i` is `HANDLE_BASE + i`
const HANDLE_BASE: usize = 0x1000;

/// Fake handle for the device at `index`
pub fn handle(index: usize) -> nvmlDevice_t {
    (HANDLE_BASE + index) as nvmlDevice_t
}

/// State of one synthetic GPU
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
    pub uuid: String,
    pub serial: String,
    pub brand: c_uint,
    pub board_part_number: String,
    pub board_id: c_uint,
    pub vbios_version: String,
    pub minor_number: c_uint,
    pub inforom_image_version: String,
    pub pci_bus_id: String,
    pub pci_device_id: c_uint,
    pub pci_sub_system_id: c_uint,
    pub cuda_compute_capability: (c_int, c_int),

    /// Indexed by clock type (graphics, SM, memory, video)
    pub clocks: [c_uint; 4],
    pub max_clocks: [c_uint; 4],
    pub applications_clocks: [c_uint; 4],
    pub default_applications_clocks: [c_uint; 4],
    pub memory_clocks: Vec<c_uint>,
    pub graphics_clocks: Vec<c_uint>,
    pub throttle_reasons: c_ulonglong,
    pub supported_throttle_reasons: c_ulonglong,
    /// (enabled, default enabled)
    pub auto_boost: (c_int, c_int),

    pub temperature: c_uint,
    /// Indexed by threshold type
    pub thresholds: [c_uint; 7],
    pub fan_speed: c_uint,

    pub power_usage: c_uint,
    pub power_limit: c_uint,
    pub power_limit_min: c_uint,
    pub power_limit_max: c_uint,
    pub power_default_limit: c_uint,
    pub enforced_power_limit: c_uint,
    pub energy: c_ulonglong,
    pub performance_state: c_uint,
    pub violation: RawViolationTime,

    pub memory: RawMemory,
    pub bar1: RawBar1Memory,
    pub utilization: RawUtilization,
    pub encoder: (c_uint, c_uint),
    pub decoder: (c_uint, c_uint),
    pub encoder_stats: (c_uint, c_uint, c_uint),
    /// (current, pending)
    pub ecc_mode: (c_int, c_int),
    /// Indexed by `[error type][counter type]`
    pub ecc_errors: [[c_ulonglong; 2]; 2],
    /// Retired page addresses, indexed by retirement cause
    pub retired_pages: [Vec<c_ulonglong>; 2],
    pub retired_pages_pending: c_int,

    /// (current, max)
    pub pcie_generation: (c_uint, c_uint),
    /// (current, max)
    pub pcie_width: (c_uint, c_uint),
    pub pcie_replay_counter: c_uint,
    /// (tx, rx) in KB/s
    pub pcie_throughput: (c_uint, c_uint),

    pub compute_processes: Vec<RawProcessInfo>,
    pub graphics_processes: Vec<RawProcessInfo>,

    pub display_active: c_int,
    pub display_mode: c_int,
    pub persistence_mode: c_int,
    pub compute_mode: c_uint,

    #[cfg(target_os = "linux")]
    pub cpu_affinity: Vec<c_ulong>,
    #[cfg(target_os = "linux")]
    pub cpu_affinity_applied: bool,
    /// (topology level, device index) of every peer GPU
    #[cfg(target_os = "linux")]
    pub nearest_gpus: Vec<(c_uint, usize)>,
}

impl MockDevice {
    /// A plausible data-center board at position `index`
    pub fn new(index: usize) -> Self {
        const MIB: c_ulonglong = 1024 * 1024;
        let total = 24_576 * MIB;
        let used = 2_048 * MIB;

        Self {
            name: format!("NVIDIA Mock GPU {}", index),
            uuid: format!("GPU-00000000-0000-0000-0000-{:012x}", index),
            serial: format!("13240000{:05}", index),
            brand: 2,
            board_part_number: "900-2G133-0000-000".to_string(),
            board_id: 0x100 + index as c_uint,
            vbios_version: "94.02.5C.00.01".to_string(),
            minor_number: index as c_uint,
            inforom_image_version: "G133.0500.00.05".to_string(),
            pci_bus_id: format!("00000000:{:02X}:00.0", index + 1),
            pci_device_id: 0x2230_10DE,
            pci_sub_system_id: 0x1459_10DE,
            cuda_compute_capability: (8, 6),

            clocks: [1410, 1410, 7001, 1275],
            max_clocks: [2100, 2100, 7001, 1950],
            applications_clocks: [1410, 1410, 7001, 1275],
            default_applications_clocks: [1410, 1410, 7001, 1275],
            memory_clocks: vec![7001, 5001, 810, 405],
            graphics_clocks: vec![2100, 1800, 1410, 1005, 705, 210],
            throttle_reasons: 0x1,
            supported_throttle_reasons: 0x1ff,
            auto_boost: (1, 1),

            temperature: 41,
            thresholds: [98, 95, 92, 90, 0, 0, 0],
            fan_speed: 30,

            power_usage: 71_250,
            power_limit: 300_000,
            power_limit_min: 100_000,
            power_limit_max: 350_000,
            power_default_limit: 300_000,
            enforced_power_limit: 300_000,
            energy: 1_234_567_890,
            performance_state: 8,
            violation: RawViolationTime {
                reference_time: 1_700_000_000_000_000,
                violation_time: 12_000_000,
            },

            memory: RawMemory {
                total,
                free: total - used,
                used,
            },
            bar1: RawBar1Memory {
                bar1_total: 256 * MIB,
                bar1_free: 250 * MIB,
                bar1_used: 6 * MIB,
            },
            utilization: RawUtilization { gpu: 12, memory: 4 },
            encoder: (0, 167_000),
            decoder: (5, 167_000),
            encoder_stats: (0, 0, 0),
            ecc_mode: (1, 1),
            ecc_errors: [[3, 17], [0, 0]],
            retired_pages: [Vec::new(), vec![0x0003_a1f0_0000]],
            retired_pages_pending: 0,

            pcie_generation: (4, 4),
            pcie_width: (16, 16),
            pcie_replay_counter: 0,
            pcie_throughput: (1_200, 5_800),

            compute_processes: Vec::new(),
            graphics_processes: Vec::new(),

            display_active: 0,
            display_mode: 0,
            persistence_mode: 1,
            compute_mode: 0,

            #[cfg(target_os = "linux")]
            cpu_affinity: vec![0x0000_ffff],
            #[cfg(target_os = "linux")]
            cpu_affinity_applied: false,
            #[cfg(target_os = "linux")]
            nearest_gpus: Vec::new(),
        }
    }
}

/// Whole-library state driving the stub functions
#[derive(Debug, Clone)]
pub struct MockState {
    pub devices: Vec<MockDevice>,
    pub driver_version: String,
    pub nvml_version: String,
    pub cuda_driver_version: c_int,
    pub process_names: HashMap<c_uint, String>,
    /// Outstanding `nvmlInit_v2` calls not yet matched by `nvmlShutdown`
    pub init_count: u32,
    /// Status forced for a symbol, checked before anything else
    pub failures: HashMap<&'static str, Status>,
    /// Make `nvmlErrorString` return an empty string
    pub silent_errors: bool,
    /// Number of enumeration data calls that find one more element than
    /// the preceding size query reported
    pub grow_between_calls: usize,
}

impl Default for MockState {
    fn default() -> Self {
        let mut first = MockDevice::new(0);
        first.compute_processes = vec![
            RawProcessInfo {
                pid: 4242,
                used_gpu_memory: 512 * 1024 * 1024,
            },
            RawProcessInfo {
                pid: 4343,
                used_gpu_memory: VALUE_NOT_AVAILABLE,
            },
        ];
        first.graphics_processes = vec![RawProcessInfo {
            pid: 1200,
            used_gpu_memory: 64 * 1024 * 1024,
        }];

        let process_names = [(4242, "python3"), (1200, "Xorg")]
            .into_iter()
            .map(|(pid, name)| (pid, name.to_string()))
            .collect();

        Self {
            devices: vec![first, MockDevice::new(1)],
            driver_version: "535.104.05".to_string(),
            nvml_version: "12.535.104.05".to_string(),
            cuda_driver_version: 12020,
            process_names,
            init_count: 0,
            failures: HashMap::new(),
            silent_errors: false,
            grow_between_calls: 0,
        }
    }
}

impl MockState {
    /// Start as if `nvmlInit_v2` had already been called once
    pub fn initialized(mut self) -> Self {
        self.init_count = 1;
        self
    }

    /// Force `symbol` to return `code`
    pub fn with_failure(mut self, symbol: &'static str, code: Status) -> Self {
        self.failures.insert(symbol, code);
        self
    }

    /// Replace the supported memory clocks of device 0
    pub fn with_memory_clocks(mut self, clocks: Vec<c_uint>) -> Self {
        if let Some(device) = self.devices.first_mut() {
            device.memory_clocks = clocks;
        }
        self
    }

    /// Replace the device list
    pub fn with_devices(mut self, devices: Vec<MockDevice>) -> Self {
        self.devices = devices;
        self
    }

    fn enter(&self, symbol: &'static str) -> Result<(), Status> {
        if let Some(&code) = self.failures.get(symbol) {
            return Err(code);
        }
        if self.init_count == 0 {
            return Err(status::UNINITIALIZED);
        }
        Ok(())
    }

    fn enter_device(&self, symbol: &'static str, dev: nvmlDevice_t) -> Result<usize, Status> {
        self.enter(symbol)?;
        let index = (dev as usize).wrapping_sub(HANDLE_BASE);
        if index < self.devices.len() {
            Ok(index)
        } else {
            Err(status::INVALID_ARGUMENT)
        }
    }
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

/// Restores the default state when dropped
#[must_use = "the mock state is reset when the guard is dropped"]
pub struct MockGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        STATE.with(|s| *s.borrow_mut() = MockState::default());
    }
}

/// Replace the current thread's stub state
pub fn install(state: MockState) -> MockGuard {
    STATE.with(|s| *s.borrow_mut() = state);
    MockGuard {
        _not_send: PhantomData,
    }
}

/// Read the current thread's stub state
pub fn inspect<R>(f: impl FnOnce(&MockState) -> R) -> R {
    STATE.with(|s| f(&s.borrow()))
}

fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

fn system_call(symbol: &'static str, f: impl FnOnce(&mut MockState) -> Status) -> Status {
    with_state(|state| match state.enter(symbol) {
        Ok(()) => f(state),
        Err(code) => code,
    })
}

fn device_call(
    symbol: &'static str,
    dev: nvmlDevice_t,
    f: impl FnOnce(&mut MockDevice) -> Status,
) -> Status {
    with_state(|state| match state.enter_device(symbol, dev) {
        Ok(index) => f(&mut state.devices[index]),
        Err(code) => code,
    })
}

fn list_call<T: Copy>(
    symbol: &'static str,
    dev: nvmlDevice_t,
    count: *mut c_uint,
    buf: *mut T,
    select: fn(&mut MockDevice) -> &mut Vec<T>,
) -> Status {
    with_state(|state| {
        let index = match state.enter_device(symbol, dev) {
            Ok(index) => index,
            Err(code) => return code,
        };

        let grow = !buf.is_null() && state.grow_between_calls > 0;
        if grow {
            state.grow_between_calls -= 1;
        }

        let list = select(&mut state.devices[index]);
        if grow {
            if let Some(&last) = list.last() {
                list.push(last);
            }
        }
        put_list(count, buf, list)
    })
}

// The helpers below write through caller pointers. They are only reached
// through table entries whose declared signature makes every non-null
// pointer valid for the written type and length.

fn put<T>(out: *mut T, value: T) -> Status {
    if out.is_null() {
        return status::INVALID_ARGUMENT;
    }
    unsafe { out.write(value) };
    status::SUCCESS
}

fn put_str(buf: *mut c_char, len: c_uint, value: &str) -> Status {
    if buf.is_null() {
        return status::INVALID_ARGUMENT;
    }
    let bytes = value.as_bytes();
    if bytes.len() >= len as usize {
        return status::INSUFFICIENT_SIZE;
    }
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, bytes.len());
        *buf.add(bytes.len()) = 0;
    }
    status::SUCCESS
}

fn put_list<T: Copy>(count: *mut c_uint, buf: *mut T, items: &[T]) -> Status {
    if count.is_null() {
        return status::INVALID_ARGUMENT;
    }
    let capacity = unsafe { *count } as usize;
    unsafe { *count = items.len() as c_uint };

    if items.is_empty() {
        return status::SUCCESS;
    }
    if buf.is_null() || capacity < items.len() {
        return status::INSUFFICIENT_SIZE;
    }
    unsafe { ptr::copy_nonoverlapping(items.as_ptr(), buf, items.len()) };
    status::SUCCESS
}

fn read_str(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

fn fixed<const N: usize>(value: &str) -> [c_char; N] {
    let mut out = [0 as c_char; N];
    for (slot, byte) in out.iter_mut().zip(value.bytes().take(N - 1)) {
        *slot = byte as c_char;
    }
    out
}

fn pick<T: Copy>(values: &[T], index: c_uint, out: *mut T) -> Status {
    match values.get(index as usize) {
        Some(&value) => put(out, value),
        None => status::INVALID_ARGUMENT,
    }
}

// Initialization

extern "C" fn init() -> Status {
    with_state(|state| {
        if let Some(&code) = state.failures.get("nvmlInit_v2") {
            return code;
        }
        state.init_count += 1;
        status::SUCCESS
    })
}

extern "C" fn shutdown() -> Status {
    with_state(|state| {
        if let Some(&code) = state.failures.get("nvmlShutdown") {
            return code;
        }
        if state.init_count == 0 {
            return status::UNINITIALIZED;
        }
        state.init_count -= 1;
        status::SUCCESS
    })
}

extern "C" fn error_string(code: Status) -> *const c_char {
    if with_state(|state| state.silent_errors) {
        return b"\0".as_ptr() as *const c_char;
    }
    let message: &'static [u8] = match code {
        0 => b"Success\0",
        1 => b"Uninitialized\0",
        2 => b"Invalid Argument\0",
        3 => b"Not Supported\0",
        4 => b"Insufficient Permissions\0",
        5 => b"Already Initialized\0",
        6 => b"Not Found\0",
        7 => b"Insufficient Size\0",
        9 => b"Driver Not Loaded\0",
        15 => b"GPU is lost\0",
        _ => b"Unknown Error\0",
    };
    message.as_ptr() as *const c_char
}

// System

extern "C" fn system_cuda_driver_version(out: *mut c_int) -> Status {
    system_call("nvmlSystemGetCudaDriverVersion", |s| {
        put(out, s.cuda_driver_version)
    })
}

extern "C" fn system_driver_version(buf: *mut c_char, len: c_uint) -> Status {
    system_call("nvmlSystemGetDriverVersion", |s| {
        put_str(buf, len, &s.driver_version)
    })
}

extern "C" fn system_nvml_version(buf: *mut c_char, len: c_uint) -> Status {
    system_call("nvmlSystemGetNVMLVersion", |s| {
        put_str(buf, len, &s.nvml_version)
    })
}

extern "C" fn system_process_name(pid: c_uint, buf: *mut c_char, len: c_uint) -> Status {
    system_call("nvmlSystemGetProcessName", |s| {
        match s.process_names.get(&pid) {
            Some(name) => put_str(buf, len, name),
            None => status::NOT_FOUND,
        }
    })
}

// Enumeration and lookup

extern "C" fn device_count(out: *mut c_uint) -> Status {
    system_call("nvmlDeviceGetCount_v2", |s| {
        put(out, s.devices.len() as c_uint)
    })
}

extern "C" fn handle_by_index(index: c_uint, out: *mut nvmlDevice_t) -> Status {
    system_call("nvmlDeviceGetHandleByIndex_v2", |s| {
        if (index as usize) < s.devices.len() {
            put(out, handle(index as usize))
        } else {
            status::INVALID_ARGUMENT
        }
    })
}

fn handle_by(
    symbol: &'static str,
    key: *const c_char,
    out: *mut nvmlDevice_t,
    field: fn(&MockDevice) -> &str,
) -> Status {
    system_call(symbol, |s| {
        let Some(key) = read_str(key) else {
            return status::INVALID_ARGUMENT;
        };
        match s.devices.iter().position(|d| field(d) == key) {
            Some(index) => put(out, handle(index)),
            None => status::NOT_FOUND,
        }
    })
}

extern "C" fn handle_by_uuid(uuid: *const c_char, out: *mut nvmlDevice_t) -> Status {
    handle_by("nvmlDeviceGetHandleByUUID", uuid, out, |d| d.uuid.as_str())
}

extern "C" fn handle_by_serial(serial: *const c_char, out: *mut nvmlDevice_t) -> Status {
    handle_by("nvmlDeviceGetHandleBySerial", serial, out, |d| d.serial.as_str())
}

extern "C" fn handle_by_pci_bus_id(bus_id: *const c_char, out: *mut nvmlDevice_t) -> Status {
    handle_by("nvmlDeviceGetHandleByPciBusId_v2", bus_id, out, |d| {
        d.pci_bus_id.as_str()
    })
}

extern "C" fn device_index(dev: nvmlDevice_t, out: *mut c_uint) -> Status {
    with_state(|state| match state.enter_device("nvmlDeviceGetIndex", dev) {
        Ok(index) => put(out, index as c_uint),
        Err(code) => code,
    })
}

macro_rules! string_getters {
    ($(fn $name:ident($symbol:literal) = |$d:ident| $value:expr;)*) => {$(
        extern "C" fn $name(dev: nvmlDevice_t, buf: *mut c_char, len: c_uint) -> Status {
            device_call($symbol, dev, |$d| put_str(buf, len, &$value))
        }
    )*};
}

macro_rules! scalar_getters {
    ($(fn $name:ident($symbol:literal) -> $ty:ty = |$d:ident| $value:expr;)*) => {$(
        extern "C" fn $name(dev: nvmlDevice_t, out: *mut $ty) -> Status {
            device_call($symbol, dev, |$d| put(out, $value))
        }
    )*};
}

macro_rules! pair_getters {
    ($(fn $name:ident($symbol:literal) -> $ty:ty = |$d:ident| $value:expr;)*) => {$(
        extern "C" fn $name(dev: nvmlDevice_t, first: *mut $ty, second: *mut $ty) -> Status {
            device_call($symbol, dev, |$d| {
                let (a, b) = $value;
                match put(first, a) {
                    status::SUCCESS => put(second, b),
                    code => code,
                }
            })
        }
    )*};
}

macro_rules! indexed_getters {
    ($(fn $name:ident($symbol:literal) = |$d:ident| $values:expr;)*) => {$(
        extern "C" fn $name(dev: nvmlDevice_t, kind: c_uint, out: *mut c_uint) -> Status {
            device_call($symbol, dev, |$d| pick(&$values, kind, out))
        }
    )*};
}

string_getters! {
    fn device_name("nvmlDeviceGetName") = |d| d.name;
    fn device_uuid("nvmlDeviceGetUUID") = |d| d.uuid;
    fn device_serial("nvmlDeviceGetSerial") = |d| d.serial;
    fn device_board_part_number("nvmlDeviceGetBoardPartNumber") = |d| d.board_part_number;
    fn device_vbios_version("nvmlDeviceGetVbiosVersion") = |d| d.vbios_version;
    fn device_inforom_image_version("nvmlDeviceGetInforomImageVersion") = |d| d.inforom_image_version;
}

scalar_getters! {
    fn device_brand("nvmlDeviceGetBrand") -> c_uint = |d| d.brand;
    fn device_board_id("nvmlDeviceGetBoardId") -> c_uint = |d| d.board_id;
    fn device_minor_number("nvmlDeviceGetMinorNumber") -> c_uint = |d| d.minor_number;
    fn device_current_throttle_reasons("nvmlDeviceGetCurrentClocksThrottleReasons") -> c_ulonglong = |d| d.throttle_reasons;
    fn device_supported_throttle_reasons("nvmlDeviceGetSupportedClocksThrottleReasons") -> c_ulonglong = |d| d.supported_throttle_reasons;
    fn device_fan_speed("nvmlDeviceGetFanSpeed") -> c_uint = |d| d.fan_speed;
    fn device_power_usage("nvmlDeviceGetPowerUsage") -> c_uint = |d| d.power_usage;
    fn device_power_limit("nvmlDeviceGetPowerManagementLimit") -> c_uint = |d| d.power_limit;
    fn device_power_default_limit("nvmlDeviceGetPowerManagementDefaultLimit") -> c_uint = |d| d.power_default_limit;
    fn device_enforced_power_limit("nvmlDeviceGetEnforcedPowerLimit") -> c_uint = |d| d.enforced_power_limit;
    fn device_energy("nvmlDeviceGetTotalEnergyConsumption") -> c_ulonglong = |d| d.energy;
    fn device_performance_state("nvmlDeviceGetPerformanceState") -> c_uint = |d| d.performance_state;
    fn device_memory_info("nvmlDeviceGetMemoryInfo") -> RawMemory = |d| d.memory;
    fn device_bar1_memory_info("nvmlDeviceGetBAR1MemoryInfo") -> RawBar1Memory = |d| d.bar1;
    fn device_utilization("nvmlDeviceGetUtilizationRates") -> RawUtilization = |d| d.utilization;
    fn device_curr_pcie_generation("nvmlDeviceGetCurrPcieLinkGeneration") -> c_uint = |d| d.pcie_generation.0;
    fn device_max_pcie_generation("nvmlDeviceGetMaxPcieLinkGeneration") -> c_uint = |d| d.pcie_generation.1;
    fn device_curr_pcie_width("nvmlDeviceGetCurrPcieLinkWidth") -> c_uint = |d| d.pcie_width.0;
    fn device_max_pcie_width("nvmlDeviceGetMaxPcieLinkWidth") -> c_uint = |d| d.pcie_width.1;
    fn device_pcie_replay_counter("nvmlDeviceGetPcieReplayCounter") -> c_uint = |d| d.pcie_replay_counter;
    fn device_display_active("nvmlDeviceGetDisplayActive") -> c_int = |d| d.display_active;
    fn device_display_mode("nvmlDeviceGetDisplayMode") -> c_int = |d| d.display_mode;
    fn device_persistence_mode("nvmlDeviceGetPersistenceMode") -> c_int = |d| d.persistence_mode;
    fn device_compute_mode("nvmlDeviceGetComputeMode") -> c_uint = |d| d.compute_mode;
    fn device_retired_pages_pending("nvmlDeviceGetRetiredPagesPendingStatus") -> c_int = |d| d.retired_pages_pending;
    fn device_pci_info("nvmlDeviceGetPciInfo_v3") -> RawPciInfo = |d| pci_info(d);
}

pair_getters! {
    fn device_cuda_compute_capability("nvmlDeviceGetCudaComputeCapability") -> c_int = |d| d.cuda_compute_capability;
    fn device_auto_boosted_clocks("nvmlDeviceGetAutoBoostedClocksEnabled") -> c_int = |d| d.auto_boost;
    fn device_power_limit_constraints("nvmlDeviceGetPowerManagementLimitConstraints") -> c_uint = |d| (d.power_limit_min, d.power_limit_max);
    fn device_encoder_utilization("nvmlDeviceGetEncoderUtilization") -> c_uint = |d| d.encoder;
    fn device_decoder_utilization("nvmlDeviceGetDecoderUtilization") -> c_uint = |d| d.decoder;
    fn device_ecc_mode("nvmlDeviceGetEccMode") -> c_int = |d| d.ecc_mode;
}

indexed_getters! {
    fn device_clock_info("nvmlDeviceGetClockInfo") = |d| d.clocks;
    fn device_max_clock_info("nvmlDeviceGetMaxClockInfo") = |d| d.max_clocks;
    fn device_applications_clock("nvmlDeviceGetApplicationsClock") = |d| d.applications_clocks;
    fn device_default_applications_clock("nvmlDeviceGetDefaultApplicationsClock") = |d| d.default_applications_clocks;
    fn device_temperature_threshold("nvmlDeviceGetTemperatureThreshold") = |d| d.thresholds;
    fn device_pcie_throughput("nvmlDeviceGetPcieThroughput") = |d| [d.pcie_throughput.0, d.pcie_throughput.1];
}

fn pci_info(device: &MockDevice) -> RawPciInfo {
    let legacy = device
        .pci_bus_id
        .get(4..)
        .unwrap_or(device.pci_bus_id.as_str());
    let field = |range: std::ops::Range<usize>| {
        device
            .pci_bus_id
            .get(range)
            .and_then(|s| c_uint::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };

    RawPciInfo {
        bus_id_legacy: fixed(legacy),
        domain: field(0..8),
        bus: field(9..11),
        device: field(12..14),
        pci_device_id: device.pci_device_id,
        pci_sub_system_id: device.pci_sub_system_id,
        bus_id: fixed(&device.pci_bus_id),
    }
}

extern "C" fn device_temperature(dev: nvmlDevice_t, sensor: c_uint, out: *mut c_uint) -> Status {
    device_call("nvmlDeviceGetTemperature", dev, |d| match sensor {
        0 => put(out, d.temperature),
        _ => status::INVALID_ARGUMENT,
    })
}

extern "C" fn device_clock(
    dev: nvmlDevice_t,
    clock_type: c_uint,
    clock_id: c_uint,
    out: *mut c_uint,
) -> Status {
    device_call("nvmlDeviceGetClock", dev, |d| {
        let table = match clock_id {
            0 => d.clocks,
            1 => d.applications_clocks,
            2 => d.default_applications_clocks,
            3 => d.max_clocks,
            _ => return status::INVALID_ARGUMENT,
        };
        pick(&table, clock_type, out)
    })
}

extern "C" fn device_supported_memory_clocks(
    dev: nvmlDevice_t,
    count: *mut c_uint,
    buf: *mut c_uint,
) -> Status {
    list_call("nvmlDeviceGetSupportedMemoryClocks", dev, count, buf, |d| {
        &mut d.memory_clocks
    })
}

extern "C" fn device_supported_graphics_clocks(
    dev: nvmlDevice_t,
    memory_clock: c_uint,
    count: *mut c_uint,
    buf: *mut c_uint,
) -> Status {
    device_call("nvmlDeviceGetSupportedGraphicsClocks", dev, |d| {
        if !d.memory_clocks.contains(&memory_clock) {
            return status::NOT_FOUND;
        }
        put_list(count, buf, &d.graphics_clocks)
    })
}

extern "C" fn device_compute_processes(
    dev: nvmlDevice_t,
    count: *mut c_uint,
    buf: *mut RawProcessInfo,
) -> Status {
    list_call("nvmlDeviceGetComputeRunningProcesses", dev, count, buf, |d| {
        &mut d.compute_processes
    })
}

extern "C" fn device_graphics_processes(
    dev: nvmlDevice_t,
    count: *mut c_uint,
    buf: *mut RawProcessInfo,
) -> Status {
    list_call("nvmlDeviceGetGraphicsRunningProcesses", dev, count, buf, |d| {
        &mut d.graphics_processes
    })
}

extern "C" fn device_encoder_stats(
    dev: nvmlDevice_t,
    sessions: *mut c_uint,
    fps: *mut c_uint,
    latency: *mut c_uint,
) -> Status {
    device_call("nvmlDeviceGetEncoderStats", dev, |d| {
        let (s, f, l) = d.encoder_stats;
        [put(sessions, s), put(fps, f), put(latency, l)]
            .into_iter()
            .find(|&code| code != status::SUCCESS)
            .unwrap_or(status::SUCCESS)
    })
}

extern "C" fn device_total_ecc_errors(
    dev: nvmlDevice_t,
    error_type: c_uint,
    counter_type: c_uint,
    out: *mut c_ulonglong,
) -> Status {
    device_call("nvmlDeviceGetTotalEccErrors", dev, |d| {
        match d.ecc_errors.get(error_type as usize) {
            Some(counters) => pick(counters, counter_type, out),
            None => status::INVALID_ARGUMENT,
        }
    })
}

extern "C" fn device_violation_status(
    dev: nvmlDevice_t,
    policy: c_uint,
    out: *mut RawViolationTime,
) -> Status {
    device_call("nvmlDeviceGetViolationStatus", dev, |d| match policy {
        0..=5 | 10 | 11 => put(out, d.violation),
        _ => status::INVALID_ARGUMENT,
    })
}

extern "C" fn device_on_same_board(a: nvmlDevice_t, b: nvmlDevice_t, out: *mut c_int) -> Status {
    with_state(|state| {
        let first = match state.enter_device("nvmlDeviceOnSameBoard", a) {
            Ok(index) => index,
            Err(code) => return code,
        };
        let second = match state.enter_device("nvmlDeviceOnSameBoard", b) {
            Ok(index) => index,
            Err(code) => return code,
        };
        let same = state.devices[first].board_id == state.devices[second].board_id;
        put(out, same as c_int)
    })
}

// Mutations

extern "C" fn device_set_persistence_mode(dev: nvmlDevice_t, mode: c_uint) -> Status {
    device_call("nvmlDeviceSetPersistenceMode", dev, |d| match mode {
        0 | 1 => {
            d.persistence_mode = mode as c_int;
            status::SUCCESS
        }
        _ => status::INVALID_ARGUMENT,
    })
}

extern "C" fn device_set_power_limit(dev: nvmlDevice_t, limit: c_uint) -> Status {
    device_call("nvmlDeviceSetPowerManagementLimit", dev, |d| {
        if limit < d.power_limit_min || limit > d.power_limit_max {
            return status::INVALID_ARGUMENT;
        }
        d.power_limit = limit;
        d.enforced_power_limit = limit;
        status::SUCCESS
    })
}

extern "C" fn device_set_compute_mode(dev: nvmlDevice_t, mode: c_uint) -> Status {
    device_call("nvmlDeviceSetComputeMode", dev, |d| match mode {
        0..=3 => {
            d.compute_mode = mode;
            status::SUCCESS
        }
        _ => status::INVALID_ARGUMENT,
    })
}

extern "C" fn device_set_auto_boosted_clocks(dev: nvmlDevice_t, enabled: c_uint) -> Status {
    device_call("nvmlDeviceSetAutoBoostedClocksEnabled", dev, |d| {
        d.auto_boost.0 = (enabled != 0) as c_int;
        status::SUCCESS
    })
}

extern "C" fn device_set_applications_clocks(
    dev: nvmlDevice_t,
    memory: c_uint,
    graphics: c_uint,
) -> Status {
    device_call("nvmlDeviceSetApplicationsClocks", dev, |d| {
        if !d.memory_clocks.contains(&memory) || !d.graphics_clocks.contains(&graphics) {
            return status::INVALID_ARGUMENT;
        }
        d.applications_clocks[0] = graphics;
        d.applications_clocks[1] = graphics;
        d.applications_clocks[2] = memory;
        status::SUCCESS
    })
}

extern "C" fn device_reset_applications_clocks(dev: nvmlDevice_t) -> Status {
    device_call("nvmlDeviceResetApplicationsClocks", dev, |d| {
        d.applications_clocks = d.default_applications_clocks;
        status::SUCCESS
    })
}

extern "C" fn device_clear_ecc_error_counts(dev: nvmlDevice_t, counter_type: c_uint) -> Status {
    device_call("nvmlDeviceClearEccErrorCounts", dev, |d| {
        let counter = counter_type as usize;
        if counter > 1 {
            return status::INVALID_ARGUMENT;
        }
        for counters in d.ecc_errors.iter_mut() {
            counters[counter] = 0;
        }
        status::SUCCESS
    })
}

extern "C" fn device_retired_pages(
    dev: nvmlDevice_t,
    cause: c_uint,
    count: *mut c_uint,
    buf: *mut c_ulonglong,
) -> Status {
    device_call("nvmlDeviceGetRetiredPages", dev, |d| {
        match d.retired_pages.get(cause as usize) {
            Some(pages) => put_list(count, buf, pages),
            None => status::INVALID_ARGUMENT,
        }
    })
}

#[cfg(target_os = "linux")]
extern "C" fn device_topology_nearest_gpus(
    dev: nvmlDevice_t,
    level: c_uint,
    count: *mut c_uint,
    buf: *mut nvmlDevice_t,
) -> Status {
    device_call("nvmlDeviceGetTopologyNearestGpus", dev, |d| {
        if count.is_null() {
            return status::INVALID_ARGUMENT;
        }
        let peers: Vec<nvmlDevice_t> = d
            .nearest_gpus
            .iter()
            .filter(|&&(at, _)| at == level)
            .map(|&(_, index)| handle(index))
            .collect();

        // A zero count is a size query, answered with SUCCESS like the driver does.
        if unsafe { *count } == 0 {
            unsafe { *count = peers.len() as c_uint };
            return status::SUCCESS;
        }
        put_list(count, buf, &peers)
    })
}

#[cfg(target_os = "linux")]
extern "C" fn device_cpu_affinity(dev: nvmlDevice_t, set_size: c_uint, out: *mut c_ulong) -> Status {
    device_call("nvmlDeviceGetCpuAffinity", dev, |d| {
        if out.is_null() {
            return status::INVALID_ARGUMENT;
        }
        for i in 0..set_size as usize {
            let word = d.cpu_affinity.get(i).copied().unwrap_or(0);
            unsafe { *out.add(i) = word };
        }
        status::SUCCESS
    })
}

#[cfg(target_os = "linux")]
extern "C" fn device_set_cpu_affinity(dev: nvmlDevice_t) -> Status {
    device_call("nvmlDeviceSetCpuAffinity", dev, |d| {
        d.cpu_affinity_applied = true;
        status::SUCCESS
    })
}

#[cfg(target_os = "linux")]
extern "C" fn device_clear_cpu_affinity(dev: nvmlDevice_t) -> Status {
    device_call("nvmlDeviceClearCpuAffinity", dev, |d| {
        d.cpu_affinity_applied = false;
        status::SUCCESS
    })
}

macro_rules! exports {
    ($($symbol:literal => $func:ident,)*) => {
        vec![$(($symbol, RawSymbol::new($func as *const c_void)),)*]
    };
}

/// Every stub symbol with its address
pub fn symbols() -> Vec<(&'static str, RawSymbol)> {
    #[allow(unused_mut)]
    let mut symbols = exports! {
        "nvmlInit_v2" => init,
        "nvmlShutdown" => shutdown,
        "nvmlErrorString" => error_string,
        "nvmlSystemGetCudaDriverVersion" => system_cuda_driver_version,
        "nvmlSystemGetDriverVersion" => system_driver_version,
        "nvmlSystemGetNVMLVersion" => system_nvml_version,
        "nvmlSystemGetProcessName" => system_process_name,
        "nvmlDeviceGetCount_v2" => device_count,
        "nvmlDeviceGetHandleByIndex_v2" => handle_by_index,
        "nvmlDeviceGetHandleByUUID" => handle_by_uuid,
        "nvmlDeviceGetHandleBySerial" => handle_by_serial,
        "nvmlDeviceGetHandleByPciBusId_v2" => handle_by_pci_bus_id,
        "nvmlDeviceGetIndex" => device_index,
        "nvmlDeviceGetName" => device_name,
        "nvmlDeviceGetUUID" => device_uuid,
        "nvmlDeviceGetSerial" => device_serial,
        "nvmlDeviceGetBrand" => device_brand,
        "nvmlDeviceGetBoardPartNumber" => device_board_part_number,
        "nvmlDeviceGetBoardId" => device_board_id,
        "nvmlDeviceGetVbiosVersion" => device_vbios_version,
        "nvmlDeviceGetMinorNumber" => device_minor_number,
        "nvmlDeviceGetInforomImageVersion" => device_inforom_image_version,
        "nvmlDeviceGetPciInfo_v3" => device_pci_info,
        "nvmlDeviceGetCudaComputeCapability" => device_cuda_compute_capability,
        "nvmlDeviceGetClockInfo" => device_clock_info,
        "nvmlDeviceGetMaxClockInfo" => device_max_clock_info,
        "nvmlDeviceGetApplicationsClock" => device_applications_clock,
        "nvmlDeviceGetDefaultApplicationsClock" => device_default_applications_clock,
        "nvmlDeviceGetClock" => device_clock,
        "nvmlDeviceGetSupportedMemoryClocks" => device_supported_memory_clocks,
        "nvmlDeviceGetSupportedGraphicsClocks" => device_supported_graphics_clocks,
        "nvmlDeviceGetCurrentClocksThrottleReasons" => device_current_throttle_reasons,
        "nvmlDeviceGetSupportedClocksThrottleReasons" => device_supported_throttle_reasons,
        "nvmlDeviceGetAutoBoostedClocksEnabled" => device_auto_boosted_clocks,
        "nvmlDeviceSetAutoBoostedClocksEnabled" => device_set_auto_boosted_clocks,
        "nvmlDeviceSetApplicationsClocks" => device_set_applications_clocks,
        "nvmlDeviceResetApplicationsClocks" => device_reset_applications_clocks,
        "nvmlDeviceGetTemperature" => device_temperature,
        "nvmlDeviceGetTemperatureThreshold" => device_temperature_threshold,
        "nvmlDeviceGetFanSpeed" => device_fan_speed,
        "nvmlDeviceGetPowerUsage" => device_power_usage,
        "nvmlDeviceGetPowerManagementLimit" => device_power_limit,
        "nvmlDeviceGetPowerManagementLimitConstraints" => device_power_limit_constraints,
        "nvmlDeviceGetPowerManagementDefaultLimit" => device_power_default_limit,
        "nvmlDeviceGetEnforcedPowerLimit" => device_enforced_power_limit,
        "nvmlDeviceSetPowerManagementLimit" => device_set_power_limit,
        "nvmlDeviceGetTotalEnergyConsumption" => device_energy,
        "nvmlDeviceGetPerformanceState" => device_performance_state,
        "nvmlDeviceGetViolationStatus" => device_violation_status,
        "nvmlDeviceGetMemoryInfo" => device_memory_info,
        "nvmlDeviceGetBAR1MemoryInfo" => device_bar1_memory_info,
        "nvmlDeviceGetUtilizationRates" => device_utilization,
        "nvmlDeviceGetEncoderUtilization" => device_encoder_utilization,
        "nvmlDeviceGetDecoderUtilization" => device_decoder_utilization,
        "nvmlDeviceGetEncoderStats" => device_encoder_stats,
        "nvmlDeviceGetEccMode" => device_ecc_mode,
        "nvmlDeviceGetTotalEccErrors" => device_total_ecc_errors,
        "nvmlDeviceClearEccErrorCounts" => device_clear_ecc_error_counts,
        "nvmlDeviceGetRetiredPages" => device_retired_pages,
        "nvmlDeviceGetRetiredPagesPendingStatus" => device_retired_pages_pending,
        "nvmlDeviceGetCurrPcieLinkGeneration" => device_curr_pcie_generation,
        "nvmlDeviceGetCurrPcieLinkWidth" => device_curr_pcie_width,
        "nvmlDeviceGetMaxPcieLinkGeneration" => device_max_pcie_generation,
        "nvmlDeviceGetMaxPcieLinkWidth" => device_max_pcie_width,
        "nvmlDeviceGetPcieReplayCounter" => device_pcie_replay_counter,
        "nvmlDeviceGetPcieThroughput" => device_pcie_throughput,
        "nvmlDeviceGetComputeRunningProcesses" => device_compute_processes,
        "nvmlDeviceGetGraphicsRunningProcesses" => device_graphics_processes,
        "nvmlDeviceGetDisplayActive" => device_display_active,
        "nvmlDeviceGetDisplayMode" => device_display_mode,
        "nvmlDeviceGetPersistenceMode" => device_persistence_mode,
        "nvmlDeviceSetPersistenceMode" => device_set_persistence_mode,
        "nvmlDeviceGetComputeMode" => device_compute_mode,
        "nvmlDeviceSetComputeMode" => device_set_compute_mode,
        "nvmlDeviceOnSameBoard" => device_on_same_board,
    };

    #[cfg(target_os = "linux")]
    symbols.extend(exports! {
        "nvmlDeviceGetCpuAffinity" => device_cpu_affinity,
        "nvmlDeviceSetCpuAffinity" => device_set_cpu_affinity,
        "nvmlDeviceClearCpuAffinity" => device_clear_cpu_affinity,
        "nvmlDeviceGetTopologyNearestGpus" => device_topology_nearest_gpus,
    });

    symbols
}

/// A library exporting every stub symbol
pub fn library() -> Library {
    Library::from_symbols("mock", symbols())
}

/// A library exporting every stub symbol except `missing`
pub fn library_without(missing: &[&str]) -> Library {
    Library::from_symbols(
        "mock",
        symbols()
            .into_iter()
            .filter(|(name, _)| !missing.contains(name)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_resets_state() {
        {
            let _guard = install(MockState::default().initialized().with_devices(vec![]));
            assert_eq!(inspect(|s| s.devices.len()), 0);
            assert_eq!(inspect(|s| s.init_count), 1);
        }
        assert_eq!(inspect(|s| s.devices.len()), 2);
        assert_eq!(inspect(|s| s.init_count), 0);
    }

    #[test]
    fn test_put_str_reports_small_buffer() {
        let mut buf = [0 as c_char; 4];
        assert_eq!(put_str(buf.as_mut_ptr(), 4, "abcd"), status::INSUFFICIENT_SIZE);
        assert_eq!(put_str(buf.as_mut_ptr(), 4, "abc"), status::SUCCESS);
    }

    #[test]
    fn test_pci_info_fields() {
        let info = pci_info(&MockDevice::new(0));
        assert_eq!(info.bus, 1);
        assert_eq!(info.domain, 0);
        assert_eq!(crate::nvml::layout::fixed_str(&info.bus_id), "00000000:01:00.0");
        assert_eq!(crate::nvml::layout::fixed_str(&info.bus_id_legacy), "0000:01:00.0");
    }

    #[test]
    fn test_symbols_are_unique() {
        let symbols = symbols();
        let mut names: Vec<_> = symbols.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), symbols.len());
    }
}
