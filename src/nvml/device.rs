//! Device handles and per-device queries
//!
//! A [`Device`] pairs an opaque NVML handle with the session it came from.
//! Every query follows the same shape: zero the outputs, call the table
//! entry through the session's [`Invoker`](crate::nvml::Invoker), convert
//! the raw outputs into [`crate::domain`] values.
//!
//! All `unsafe` blocks in this module call a table entry whose signature
//! matches the native declaration, passing the device handle and pointers
//! to locals that outlive the call.

use crate::domain::{
    AutoBoostState, Bar1MemoryInfo, Brand, ClockId, ClockReading, ClockSpeed, ClockType,
    CodecUtilization, ComputeMode, CudaComputeCapability, DeviceInfo, EccCounterType,
    EccErrorCounts, EccMode, EncoderStats, FanSpeed, GpuProcess, MemoryErrorType, MemoryInfo,
    PageRetirementCause, PciInfo, PcieGeneration, PcieLinkStatus, PcieLinkWidth,
    PcieThroughput, PcieUtilCounter, PerfPolicy, PerformanceState, PowerConstraints,
    PowerLimit, ProcessList, ProcessType, Temperature, TemperatureSensor, TemperatureThreshold,
    ThermalThresholds, ThrottleReasons, Utilization, ViolationTime,
};
use crate::error::{NvmlError, OptionalExt};
use crate::nvml::layout::{
    fixed_str, RawBar1Memory, RawMemory, RawPciInfo, RawProcessInfo, RawUtilization,
    RawViolationTime, VALUE_NOT_AVAILABLE,
};
use crate::nvml::marshal::{
    c_string, flag_from_raw, flag_to_raw, NativeLayout, OutBuffer, DEVICE_INFOROM_VERSION_BUFFER_SIZE,
    DEVICE_NAME_BUFFER_SIZE, DEVICE_PART_NUMBER_BUFFER_SIZE, DEVICE_SERIAL_BUFFER_SIZE,
    DEVICE_UUID_BUFFER_SIZE, DEVICE_VBIOS_VERSION_BUFFER_SIZE,
};
use crate::nvml::status::{self, Status};
use crate::nvml::table::Entry;
use crate::nvml::wrapper::Nvml;

use nvml_wrapper_sys::bindings::nvmlDevice_t;
use std::ffi::{c_char, c_int, c_uint, c_ulonglong};
use std::fmt;
use std::ptr;

type UintQuery = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint) -> Status;
type FlagQuery = unsafe extern "C" fn(nvmlDevice_t, *mut c_int) -> Status;
type U64Query = unsafe extern "C" fn(nvmlDevice_t, *mut c_ulonglong) -> Status;
type StringQuery = unsafe extern "C" fn(nvmlDevice_t, *mut c_char, c_uint) -> Status;
type KindQuery = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_uint) -> Status;
type PairQuery = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint, *mut c_uint) -> Status;
type LookupQuery = unsafe extern "C" fn(*const c_char, *mut nvmlDevice_t) -> Status;
type ProcessQuery =
    unsafe extern "C" fn(nvmlDevice_t, *mut c_uint, *mut RawProcessInfo) -> Status;

/// Opaque NVML device token
///
/// Only produced by lookup calls; valid until the session is shut down.
/// Copying it carries no ownership.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(nvmlDevice_t);

// SAFETY: the handle is an opaque token that NVML accepts from any thread;
// this crate never dereferences it.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    pub(crate) fn from_raw(raw: nvmlDevice_t) -> Self {
        Self(raw)
    }

    /// The raw `nvmlDevice_t`
    pub fn as_raw(&self) -> nvmlDevice_t {
        self.0
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceHandle({:p})", self.0)
    }
}

impl Nvml {
    /// Number of devices visible to NVML
    pub fn device_count(&self) -> Result<u32, NvmlError> {
        let mut count: c_uint = 0;
        self.invoker()
            .call(&self.table().device_get_count, |f| unsafe { f(&mut count) })?;
        Ok(count)
    }

    /// Device at `index` (0-based, NVML enumeration order)
    pub fn device_by_index(&self, index: u32) -> Result<Device<'_>, NvmlError> {
        let mut raw: nvmlDevice_t = ptr::null_mut();
        self.invoker()
            .call(&self.table().device_get_handle_by_index, |f| unsafe {
                f(index, &mut raw)
            })?;
        Ok(self.device(DeviceHandle::from_raw(raw)))
    }

    /// Device with the given UUID (`GPU-...`)
    pub fn device_by_uuid(&self, uuid: &str) -> Result<Device<'_>, NvmlError> {
        self.lookup(&self.table().device_get_handle_by_uuid, "uuid", uuid)
    }

    /// Device with the given board serial number
    pub fn device_by_serial(&self, serial: &str) -> Result<Device<'_>, NvmlError> {
        self.lookup(&self.table().device_get_handle_by_serial, "serial", serial)
    }

    /// Device at the given PCI bus id (`domain:bus:device.function`)
    pub fn device_by_pci_bus_id(&self, bus_id: &str) -> Result<Device<'_>, NvmlError> {
        self.lookup(
            &self.table().device_get_handle_by_pci_bus_id,
            "PCI bus id",
            bus_id,
        )
    }

    /// Every device, in enumeration order
    pub fn devices(&self) -> Result<Vec<Device<'_>>, NvmlError> {
        (0..self.device_count()?)
            .map(|index| self.device_by_index(index))
            .collect()
    }

    /// Re-attach a stored handle to this session
    pub fn device(&self, handle: DeviceHandle) -> Device<'_> {
        Device { nvml: self, handle }
    }

    fn lookup(
        &self,
        entry: &Entry<LookupQuery>,
        what: &str,
        key: &str,
    ) -> Result<Device<'_>, NvmlError> {
        let key = c_string(what, key)?;
        let mut raw: nvmlDevice_t = ptr::null_mut();
        self.invoker()
            .call(entry, |f| unsafe { f(key.as_ptr(), &mut raw) })?;
        Ok(self.device(DeviceHandle::from_raw(raw)))
    }
}

/// A device within an NVML session
#[derive(Clone, Copy)]
pub struct Device<'nvml> {
    nvml: &'nvml Nvml,
    handle: DeviceHandle,
}

impl fmt::Debug for Device<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Device").field(&self.handle).finish()
    }
}

impl<'nvml> Device<'nvml> {
    /// The opaque handle, for storing beyond this borrow of the session
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub(crate) fn raw(&self) -> nvmlDevice_t {
        self.handle.as_raw()
    }

    /// Call `entry` with one zeroed output of fixed layout
    fn query<F, T, C>(&self, entry: &Entry<F>, call: C) -> Result<T, NvmlError>
    where
        F: Copy,
        T: NativeLayout,
        C: FnOnce(F, nvmlDevice_t, *mut T) -> Status,
    {
        let mut value = T::zeroed();
        let raw = self.raw();
        self.nvml
            .invoker()
            .call(entry, |f| call(f, raw, &mut value))?;
        Ok(value)
    }

    fn uint(&self, entry: &Entry<UintQuery>) -> Result<u32, NvmlError> {
        self.query(entry, |f, dev, out| unsafe { f(dev, out) })
    }

    fn u64(&self, entry: &Entry<U64Query>) -> Result<u64, NvmlError> {
        self.query(entry, |f, dev, out| unsafe { f(dev, out) })
    }

    fn flag(&self, entry: &Entry<FlagQuery>) -> Result<bool, NvmlError> {
        let raw: c_int = self.query(entry, |f, dev, out| unsafe { f(dev, out) })?;
        Ok(flag_from_raw(raw))
    }

    fn kind(&self, entry: &Entry<KindQuery>, kind: u32) -> Result<u32, NvmlError> {
        self.query(entry, |f, dev, out| unsafe { f(dev, kind, out) })
    }

    fn string<const N: usize>(&self, entry: &Entry<StringQuery>) -> Result<String, NvmlError> {
        let mut buffer = OutBuffer::<N>::new();
        let raw = self.raw();
        self.nvml.invoker().call(entry, |f| unsafe {
            f(raw, buffer.as_mut_ptr(), buffer.capacity())
        })?;
        Ok(buffer.to_string_lossy())
    }

    fn pair(&self, entry: &Entry<PairQuery>) -> Result<(u32, u32), NvmlError> {
        let (mut first, mut second): (c_uint, c_uint) = (0, 0);
        let raw = self.raw();
        self.nvml
            .invoker()
            .call(entry, |f| unsafe { f(raw, &mut first, &mut second) })?;
        Ok((first, second))
    }

    fn flag_pair(
        &self,
        entry: &Entry<unsafe extern "C" fn(nvmlDevice_t, *mut c_int, *mut c_int) -> Status>,
    ) -> Result<(bool, bool), NvmlError> {
        let (mut first, mut second): (c_int, c_int) = (0, 0);
        let raw = self.raw();
        self.nvml
            .invoker()
            .call(entry, |f| unsafe { f(raw, &mut first, &mut second) })?;
        Ok((flag_from_raw(first), flag_from_raw(second)))
    }

    fn set(
        &self,
        entry: &Entry<unsafe extern "C" fn(nvmlDevice_t, c_uint) -> Status>,
        value: u32,
    ) -> Result<(), NvmlError> {
        let raw = self.raw();
        self.nvml
            .invoker()
            .call(entry, |f| unsafe { f(raw, value) })
    }

    fn processes(
        &self,
        entry: &Entry<ProcessQuery>,
        process_type: ProcessType,
    ) -> Result<Vec<GpuProcess>, NvmlError> {
        let raw = self.raw();
        let infos: Vec<RawProcessInfo> = self
            .nvml
            .invoker()
            .enumerate(entry, |f, count, buf| unsafe { f(raw, count, buf) })?;

        Ok(infos
            .into_iter()
            .map(|info| {
                let used = (info.used_gpu_memory != VALUE_NOT_AVAILABLE)
                    .then_some(info.used_gpu_memory);
                GpuProcess::new(info.pid, used, process_type)
            })
            .collect())
    }

    // Identity

    /// NVML enumeration index of this device
    pub fn index(&self) -> Result<u32, NvmlError> {
        self.uint(&self.nvml.table().device_get_index)
    }

    /// Product name
    pub fn name(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_NAME_BUFFER_SIZE>(&self.nvml.table().device_get_name)
    }

    /// Globally unique identifier (`GPU-...`)
    pub fn uuid(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_UUID_BUFFER_SIZE>(&self.nvml.table().device_get_uuid)
    }

    /// Board serial number
    pub fn serial(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_SERIAL_BUFFER_SIZE>(&self.nvml.table().device_get_serial)
    }

    pub fn brand(&self) -> Result<Brand, NvmlError> {
        self.uint(&self.nvml.table().device_get_brand)
            .map(Brand::from_raw)
    }

    pub fn board_part_number(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_PART_NUMBER_BUFFER_SIZE>(&self.nvml.table().device_get_board_part_number)
    }

    pub fn board_id(&self) -> Result<u32, NvmlError> {
        self.uint(&self.nvml.table().device_get_board_id)
    }

    pub fn vbios_version(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_VBIOS_VERSION_BUFFER_SIZE>(&self.nvml.table().device_get_vbios_version)
    }

    /// Minor number of the `/dev/nvidiaN` node
    pub fn minor_number(&self) -> Result<u32, NvmlError> {
        self.uint(&self.nvml.table().device_get_minor_number)
    }

    pub fn inforom_image_version(&self) -> Result<String, NvmlError> {
        self.string::<DEVICE_INFOROM_VERSION_BUFFER_SIZE>(
            &self.nvml.table().device_get_inforom_image_version,
        )
    }

    /// PCI location and ids
    pub fn pci_info(&self) -> Result<PciInfo, NvmlError> {
        let raw: RawPciInfo = self.query(&self.nvml.table().device_get_pci_info, |f, dev, out| unsafe {
            f(dev, out)
        })?;
        Ok(PciInfo {
            bus_id: fixed_str(&raw.bus_id),
            domain: raw.domain,
            bus: raw.bus,
            device: raw.device,
            pci_device_id: raw.pci_device_id,
            pci_sub_system_id: raw.pci_sub_system_id,
        })
    }

    /// CUDA compute capability (major, minor)
    pub fn cuda_compute_capability(&self) -> Result<CudaComputeCapability, NvmlError> {
        let (mut major, mut minor): (c_int, c_int) = (0, 0);
        let raw = self.raw();
        self.nvml.invoker().call(
            &self.nvml.table().device_get_cuda_compute_capability,
            |f| unsafe { f(raw, &mut major, &mut minor) },
        )?;
        Ok(CudaComputeCapability { major, minor })
    }

    /// Identity summary; only name and UUID are required
    ///
    /// Unsupported optional fields are left unset, other failures propagate.
    pub fn info(&self) -> Result<DeviceInfo, NvmlError> {
        let index = self.index()?;
        let mut info = DeviceInfo::new(index, self.name()?, self.uuid()?);

        if let Some(brand) = self.brand().optional()? {
            info = info.with_brand(brand);
        }
        if let Some(serial) = self.serial().optional()? {
            info = info.with_serial(serial);
        }
        if let Some(pci) = self.pci_info().optional()? {
            info = info.with_pci_bus_id(pci.bus_id);
        }
        if let Some(vbios) = self.vbios_version().optional()? {
            info = info.with_vbios_version(vbios);
        }
        if let Some(cc) = self.cuda_compute_capability().optional()? {
            info = info.with_compute_capability(cc);
        }

        Ok(info)
    }

    // Clocks

    /// Current clock of a domain
    pub fn clock_info(&self, clock_type: ClockType) -> Result<ClockSpeed, NvmlError> {
        self.kind(&self.nvml.table().device_get_clock_info, clock_type.as_raw())
            .map(ClockSpeed::new)
    }

    /// Maximum clock of a domain
    pub fn max_clock_info(&self, clock_type: ClockType) -> Result<ClockSpeed, NvmlError> {
        self.kind(&self.nvml.table().device_get_max_clock_info, clock_type.as_raw())
            .map(ClockSpeed::new)
    }

    /// Applications clock target of a domain
    pub fn applications_clock(&self, clock_type: ClockType) -> Result<ClockSpeed, NvmlError> {
        self.kind(
            &self.nvml.table().device_get_applications_clock,
            clock_type.as_raw(),
        )
        .map(ClockSpeed::new)
    }

    /// Default applications clock of a domain
    pub fn default_applications_clock(
        &self,
        clock_type: ClockType,
    ) -> Result<ClockSpeed, NvmlError> {
        self.kind(
            &self.nvml.table().device_get_default_applications_clock,
            clock_type.as_raw(),
        )
        .map(ClockSpeed::new)
    }

    /// A specific clock value of a domain
    pub fn clock(&self, clock_type: ClockType, id: ClockId) -> Result<ClockSpeed, NvmlError> {
        let (clock_type, id) = (clock_type.as_raw(), id.as_raw());
        self.query(&self.nvml.table().device_get_clock, |f, dev, out| unsafe {
            f(dev, clock_type, id, out)
        })
        .map(ClockSpeed::new)
    }

    /// All clock values of a domain; unsupported ones are `None`
    pub fn clocks(&self, clock_type: ClockType) -> Result<ClockReading, NvmlError> {
        Ok(ClockReading {
            current: self.clock_info(clock_type).optional()?,
            max: self.max_clock_info(clock_type).optional()?,
            applications: self.applications_clock(clock_type).optional()?,
            default_applications: self.default_applications_clock(clock_type).optional()?,
        })
    }

    /// Memory clocks usable as applications clocks
    pub fn supported_memory_clocks(&self) -> Result<Vec<ClockSpeed>, NvmlError> {
        let raw = self.raw();
        let clocks: Vec<c_uint> = self.nvml.invoker().enumerate(
            &self.nvml.table().device_get_supported_memory_clocks,
            |f, count, buf| unsafe { f(raw, count, buf) },
        )?;
        Ok(clocks.into_iter().map(ClockSpeed::new).collect())
    }

    /// Graphics clocks usable together with `memory_clock`
    pub fn supported_graphics_clocks(
        &self,
        memory_clock: ClockSpeed,
    ) -> Result<Vec<ClockSpeed>, NvmlError> {
        let raw = self.raw();
        let memory_clock = memory_clock.as_mhz();
        let clocks: Vec<c_uint> = self.nvml.invoker().enumerate(
            &self.nvml.table().device_get_supported_graphics_clocks,
            |f, count, buf| unsafe { f(raw, memory_clock, count, buf) },
        )?;
        Ok(clocks.into_iter().map(ClockSpeed::new).collect())
    }

    pub fn current_clocks_throttle_reasons(&self) -> Result<ThrottleReasons, NvmlError> {
        self.u64(&self.nvml.table().device_get_current_clocks_throttle_reasons)
            .map(ThrottleReasons::from_bits)
    }

    pub fn supported_clocks_throttle_reasons(&self) -> Result<ThrottleReasons, NvmlError> {
        self.u64(&self.nvml.table().device_get_supported_clocks_throttle_reasons)
            .map(ThrottleReasons::from_bits)
    }

    pub fn auto_boosted_clocks_enabled(&self) -> Result<AutoBoostState, NvmlError> {
        let (enabled, default_enabled) =
            self.flag_pair(&self.nvml.table().device_get_auto_boosted_clocks_enabled)?;
        Ok(AutoBoostState {
            enabled,
            default_enabled,
        })
    }

    pub fn set_auto_boosted_clocks_enabled(&self, enabled: bool) -> Result<(), NvmlError> {
        self.set(
            &self.nvml.table().device_set_auto_boosted_clocks_enabled,
            flag_to_raw(enabled),
        )
    }

    /// Pin memory and graphics clocks (requires root)
    pub fn set_applications_clocks(
        &self,
        memory: ClockSpeed,
        graphics: ClockSpeed,
    ) -> Result<(), NvmlError> {
        let raw = self.raw();
        let (memory, graphics) = (memory.as_mhz(), graphics.as_mhz());
        self.nvml.invoker().call(
            &self.nvml.table().device_set_applications_clocks,
            |f| unsafe { f(raw, memory, graphics) },
        )
    }

    pub fn reset_applications_clocks(&self) -> Result<(), NvmlError> {
        let raw = self.raw();
        self.nvml.invoker().call(
            &self.nvml.table().device_reset_applications_clocks,
            |f| unsafe { f(raw) },
        )
    }

    // Thermal, fan and power

    pub fn temperature(&self, sensor: TemperatureSensor) -> Result<Temperature, NvmlError> {
        self.kind(&self.nvml.table().device_get_temperature, sensor.as_raw())
            .map(Temperature::new)
    }

    pub fn temperature_threshold(
        &self,
        threshold: TemperatureThreshold,
    ) -> Result<Temperature, NvmlError> {
        self.kind(
            &self.nvml.table().device_get_temperature_threshold,
            threshold.as_raw(),
        )
        .map(Temperature::new)
    }

    /// The thresholds the device reports; unsupported ones are `None`
    pub fn thermal_thresholds(&self) -> Result<ThermalThresholds, NvmlError> {
        let get = |threshold| self.temperature_threshold(threshold).optional();
        Ok(ThermalThresholds {
            shutdown: get(TemperatureThreshold::Shutdown)?,
            slowdown: get(TemperatureThreshold::Slowdown)?,
            mem_max: get(TemperatureThreshold::MemMax)?,
            gpu_max: get(TemperatureThreshold::GpuMax)?,
        })
    }

    pub fn fan_speed(&self) -> Result<FanSpeed, NvmlError> {
        self.uint(&self.nvml.table().device_get_fan_speed)
            .map(FanSpeed::new)
    }

    /// Current board power draw
    pub fn power_usage(&self) -> Result<PowerLimit, NvmlError> {
        self.uint(&self.nvml.table().device_get_power_usage)
            .map(PowerLimit::from_milliwatts)
    }

    pub fn power_management_limit(&self) -> Result<PowerLimit, NvmlError> {
        self.uint(&self.nvml.table().device_get_power_management_limit)
            .map(PowerLimit::from_milliwatts)
    }

    pub fn power_management_limit_constraints(&self) -> Result<PowerConstraints, NvmlError> {
        let (min, max) = self.pair(&self.nvml.table().device_get_power_management_limit_constraints)?;
        Ok(PowerConstraints::new(
            PowerLimit::from_milliwatts(min),
            PowerLimit::from_milliwatts(max),
        ))
    }

    pub fn power_management_default_limit(&self) -> Result<PowerLimit, NvmlError> {
        self.uint(&self.nvml.table().device_get_power_management_default_limit)
            .map(PowerLimit::from_milliwatts)
    }

    /// Limit actually enforced, after all limiters
    pub fn enforced_power_limit(&self) -> Result<PowerLimit, NvmlError> {
        self.uint(&self.nvml.table().device_get_enforced_power_limit)
            .map(PowerLimit::from_milliwatts)
    }

    /// Set the power management limit (requires root)
    pub fn set_power_management_limit(&self, limit: PowerLimit) -> Result<(), NvmlError> {
        self.set(
            &self.nvml.table().device_set_power_management_limit,
            limit.as_milliwatts(),
        )
    }

    /// Energy consumed since the driver was last reloaded, in millijoules
    pub fn total_energy_consumption(&self) -> Result<u64, NvmlError> {
        self.u64(&self.nvml.table().device_get_total_energy_consumption)
    }

    pub fn performance_state(&self) -> Result<PerformanceState, NvmlError> {
        self.uint(&self.nvml.table().device_get_performance_state)
            .map(PerformanceState::from_raw)
    }

    /// Time spent held back by `policy`
    pub fn violation_status(&self, policy: PerfPolicy) -> Result<ViolationTime, NvmlError> {
        let policy = policy.as_raw();
        let raw: RawViolationTime = self.query(
            &self.nvml.table().device_get_violation_status,
            |f, dev, out| unsafe { f(dev, policy, out) },
        )?;
        Ok(ViolationTime {
            reference_time_ns: raw.reference_time,
            violation_time_ns: raw.violation_time,
        })
    }

    // Memory, utilization and ECC

    pub fn memory_info(&self) -> Result<MemoryInfo, NvmlError> {
        let raw: RawMemory = self.query(&self.nvml.table().device_get_memory_info, |f, dev, out| unsafe {
            f(dev, out)
        })?;
        Ok(MemoryInfo::new(raw.total, raw.used, raw.free))
    }

    pub fn bar1_memory_info(&self) -> Result<Bar1MemoryInfo, NvmlError> {
        let raw: RawBar1Memory = self.query(
            &self.nvml.table().device_get_bar1_memory_info,
            |f, dev, out| unsafe { f(dev, out) },
        )?;
        Ok(Bar1MemoryInfo {
            total: raw.bar1_total,
            used: raw.bar1_used,
            free: raw.bar1_free,
        })
    }

    pub fn utilization_rates(&self) -> Result<Utilization, NvmlError> {
        let raw: RawUtilization = self.query(
            &self.nvml.table().device_get_utilization_rates,
            |f, dev, out| unsafe { f(dev, out) },
        )?;
        Ok(Utilization::new(raw.gpu, raw.memory))
    }

    pub fn encoder_utilization(&self) -> Result<CodecUtilization, NvmlError> {
        let (utilization, period) = self.pair(&self.nvml.table().device_get_encoder_utilization)?;
        Ok(CodecUtilization::new(utilization, period))
    }

    pub fn decoder_utilization(&self) -> Result<CodecUtilization, NvmlError> {
        let (utilization, period) = self.pair(&self.nvml.table().device_get_decoder_utilization)?;
        Ok(CodecUtilization::new(utilization, period))
    }

    pub fn encoder_stats(&self) -> Result<EncoderStats, NvmlError> {
        let (mut sessions, mut fps, mut latency): (c_uint, c_uint, c_uint) = (0, 0, 0);
        let raw = self.raw();
        self.nvml.invoker().call(
            &self.nvml.table().device_get_encoder_stats,
            |f| unsafe { f(raw, &mut sessions, &mut fps, &mut latency) },
        )?;
        Ok(EncoderStats {
            session_count: sessions,
            average_fps: fps,
            average_latency_us: latency,
        })
    }

    pub fn ecc_mode(&self) -> Result<EccMode, NvmlError> {
        let (current, pending) = self.flag_pair(&self.nvml.table().device_get_ecc_mode)?;
        Ok(EccMode { current, pending })
    }

    pub fn total_ecc_errors(
        &self,
        error_type: MemoryErrorType,
        counter_type: EccCounterType,
    ) -> Result<u64, NvmlError> {
        let (error_type, counter_type) = (error_type.as_raw(), counter_type.as_raw());
        self.query(
            &self.nvml.table().device_get_total_ecc_errors,
            |f, dev, out| unsafe { f(dev, error_type, counter_type, out) },
        )
    }

    /// Corrected and uncorrected totals for one counter type
    pub fn ecc_error_counts(&self, counter_type: EccCounterType) -> Result<EccErrorCounts, NvmlError> {
        Ok(EccErrorCounts {
            corrected: self.total_ecc_errors(MemoryErrorType::Corrected, counter_type)?,
            uncorrected: self.total_ecc_errors(MemoryErrorType::Uncorrected, counter_type)?,
        })
    }

    pub fn clear_ecc_error_counts(&self, counter_type: EccCounterType) -> Result<(), NvmlError> {
        self.set(
            &self.nvml.table().device_clear_ecc_error_counts,
            counter_type.as_raw(),
        )
    }

    /// Physical addresses of pages retired for `cause`
    pub fn retired_pages(&self, cause: PageRetirementCause) -> Result<Vec<u64>, NvmlError> {
        let (raw, cause) = (self.raw(), cause.as_raw());
        self.nvml.invoker().enumerate(
            &self.nvml.table().device_get_retired_pages,
            |f, count, buf| unsafe { f(raw, cause, count, buf) },
        )
    }

    /// Pages are waiting for a reboot to be retired
    pub fn retired_pages_pending(&self) -> Result<bool, NvmlError> {
        self.flag(&self.nvml.table().device_get_retired_pages_pending_status)
    }

    // PCIe

    pub fn current_pcie_link_generation(&self) -> Result<PcieGeneration, NvmlError> {
        PcieGeneration::from_raw(self.uint(&self.nvml.table().device_get_curr_pcie_link_generation)?)
    }

    pub fn current_pcie_link_width(&self) -> Result<PcieLinkWidth, NvmlError> {
        PcieLinkWidth::from_raw(self.uint(&self.nvml.table().device_get_curr_pcie_link_width)?)
    }

    pub fn max_pcie_link_generation(&self) -> Result<PcieGeneration, NvmlError> {
        PcieGeneration::from_raw(self.uint(&self.nvml.table().device_get_max_pcie_link_generation)?)
    }

    pub fn max_pcie_link_width(&self) -> Result<PcieLinkWidth, NvmlError> {
        PcieLinkWidth::from_raw(self.uint(&self.nvml.table().device_get_max_pcie_link_width)?)
    }

    pub fn pcie_link_status(&self) -> Result<PcieLinkStatus, NvmlError> {
        Ok(PcieLinkStatus {
            current_generation: self.current_pcie_link_generation()?,
            max_generation: self.max_pcie_link_generation()?,
            current_width: self.current_pcie_link_width()?,
            max_width: self.max_pcie_link_width()?,
        })
    }

    pub fn pcie_replay_counter(&self) -> Result<u32, NvmlError> {
        self.uint(&self.nvml.table().device_get_pcie_replay_counter)
    }

    /// Throughput in one direction, in KB/s
    pub fn pcie_throughput(&self, counter: PcieUtilCounter) -> Result<u32, NvmlError> {
        self.kind(&self.nvml.table().device_get_pcie_throughput, counter.as_raw())
    }

    /// Throughput in both directions
    pub fn pcie_throughput_both(&self) -> Result<PcieThroughput, NvmlError> {
        Ok(PcieThroughput {
            tx_kbps: self.pcie_throughput(PcieUtilCounter::Tx)?,
            rx_kbps: self.pcie_throughput(PcieUtilCounter::Rx)?,
        })
    }

    // Processes

    pub fn compute_running_processes(&self) -> Result<Vec<GpuProcess>, NvmlError> {
        self.processes(
            &self.nvml.table().device_get_compute_running_processes,
            ProcessType::Compute,
        )
    }

    pub fn graphics_running_processes(&self) -> Result<Vec<GpuProcess>, NvmlError> {
        self.processes(
            &self.nvml.table().device_get_graphics_running_processes,
            ProcessType::Graphics,
        )
    }

    /// Compute and graphics processes, with names resolved where possible
    ///
    /// A process that exited since enumeration (`NOT_FOUND`) or whose name
    /// is unavailable keeps no name; other failures propagate.
    pub fn running_processes(&self) -> Result<ProcessList, NvmlError> {
        let mut processes = self.compute_running_processes()?;
        processes.extend(self.graphics_running_processes()?);

        let processes = processes
            .into_iter()
            .map(|p| match self.nvml.process_name(p.pid) {
                Ok(name) => Ok(p.with_name(name)),
                Err(e) if e.is_unavailable() || e.code() == Some(status::NOT_FOUND) => {
                    log::debug!("No name for pid {}: {}", p.pid, e);
                    Ok(p)
                }
                Err(e) => Err(e),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProcessList::new(processes))
    }

    // Modes and flags

    /// A display is initialized on the device
    pub fn display_active(&self) -> Result<bool, NvmlError> {
        self.flag(&self.nvml.table().device_get_display_active)
    }

    /// A physical display is connected
    pub fn display_mode(&self) -> Result<bool, NvmlError> {
        self.flag(&self.nvml.table().device_get_display_mode)
    }

    pub fn persistence_mode(&self) -> Result<bool, NvmlError> {
        self.flag(&self.nvml.table().device_get_persistence_mode)
    }

    /// Enable or disable persistence mode (Linux, requires root)
    pub fn set_persistence_mode(&self, enabled: bool) -> Result<(), NvmlError> {
        self.set(
            &self.nvml.table().device_set_persistence_mode,
            flag_to_raw(enabled),
        )
    }

    pub fn compute_mode(&self) -> Result<ComputeMode, NvmlError> {
        ComputeMode::from_raw(self.uint(&self.nvml.table().device_get_compute_mode)?)
    }

    pub fn set_compute_mode(&self, mode: ComputeMode) -> Result<(), NvmlError> {
        self.set(&self.nvml.table().device_set_compute_mode, mode.as_raw())
    }

    /// Both devices sit on the same physical board
    pub fn on_same_board(&self, other: &Device<'_>) -> Result<bool, NvmlError> {
        let (a, b) = (self.raw(), other.raw());
        let mut raw: c_int = 0;
        self.nvml
            .invoker()
            .call(&self.nvml.table().device_on_same_board, |f| unsafe {
                f(a, b, &mut raw)
            })?;
        Ok(flag_from_raw(raw))
    }

    pub(crate) fn nvml(&self) -> &'nvml Nvml {
        self.nvml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::mock::{self, MockDevice, MockState};
    use crate::nvml::status;
    use crate::nvml::BindStrategy;

    fn session() -> Nvml {
        Nvml::from_library(mock::library(), BindStrategy::Strict).unwrap()
    }

    fn with_device(configure: impl FnOnce(&mut MockDevice)) -> mock::MockGuard {
        let mut state = MockState::default().initialized();
        configure(&mut state.devices[0]);
        mock::install(state)
    }

    #[test]
    fn test_device_count_and_index() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();

        assert_eq!(nvml.device_count().unwrap(), 2);
        let device = nvml.device_by_index(1).unwrap();
        assert_eq!(device.index().unwrap(), 1);
        assert_eq!(nvml.devices().unwrap().len(), 2);
    }

    #[test]
    fn test_device_by_index_out_of_range() {
        let _guard = mock::install(MockState::default().initialized());
        let err = session().device_by_index(7).unwrap_err();
        assert_eq!(err.code(), Some(status::INVALID_ARGUMENT));
        assert_eq!(
            err.to_string(),
            "nvmlDeviceGetHandleByIndex_v2 call failed with error: 2 Invalid Argument"
        );
    }

    #[test]
    fn test_lookups_return_same_handle() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(1).unwrap();

        let uuid = device.uuid().unwrap();
        let serial = device.serial().unwrap();
        let bus_id = device.pci_info().unwrap().bus_id;

        assert_eq!(nvml.device_by_uuid(&uuid).unwrap().handle(), device.handle());
        assert_eq!(nvml.device_by_serial(&serial).unwrap().handle(), device.handle());
        assert_eq!(nvml.device_by_pci_bus_id(&bus_id).unwrap().handle(), device.handle());
    }

    #[test]
    fn test_lookup_not_found() {
        let _guard = mock::install(MockState::default().initialized());
        let err = session().device_by_uuid("GPU-missing").unwrap_err();
        assert_eq!(err.code(), Some(status::NOT_FOUND));
    }

    #[test]
    fn test_lookup_rejects_interior_nul() {
        let _guard = mock::install(MockState::default().initialized());
        let err = session().device_by_serial("13\0").unwrap_err();
        assert!(matches!(err, NvmlError::InvalidArgument(_)));
    }

    #[test]
    fn test_identity_strings() {
        let _guard = with_device(|d| {
            d.name = "NVIDIA A100-SXM4-40GB".to_string();
            d.vbios_version = "92.00.19.00.01".to_string();
        });
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert_eq!(device.name().unwrap(), "NVIDIA A100-SXM4-40GB");
        assert_eq!(device.vbios_version().unwrap(), "92.00.19.00.01");
        assert_eq!(device.board_part_number().unwrap(), "900-2G133-0000-000");
        assert_eq!(device.inforom_image_version().unwrap(), "G133.0500.00.05");
        assert_eq!(device.brand().unwrap(), Brand::Tesla);
        assert_eq!(device.minor_number().unwrap(), 0);
    }

    #[test]
    fn test_pci_info() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let pci = nvml.device_by_index(0).unwrap().pci_info().unwrap();

        assert_eq!(pci.bus_id, "00000000:01:00.0");
        assert_eq!(pci.bus, 1);
        assert_eq!(pci.vendor_id(), 0x10de);
    }

    #[test]
    fn test_multi_output_sentinels_are_ordered() {
        let _guard = with_device(|d| {
            d.cuda_compute_capability = (7, 5);
            d.encoder_stats = (11, 22, 33);
            d.power_limit_min = 123_000;
            d.power_limit_max = 456_000;
            d.encoder = (44, 55);
            d.decoder = (66, 77);
            d.auto_boost = (0, 1);
        });
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert_eq!(
            device.cuda_compute_capability().unwrap(),
            CudaComputeCapability { major: 7, minor: 5 }
        );
        assert_eq!(
            device.encoder_stats().unwrap(),
            EncoderStats {
                session_count: 11,
                average_fps: 22,
                average_latency_us: 33,
            }
        );
        let constraints = device.power_management_limit_constraints().unwrap();
        assert_eq!(constraints.min.as_milliwatts(), 123_000);
        assert_eq!(constraints.max.as_milliwatts(), 456_000);
        assert_eq!(device.encoder_utilization().unwrap(), CodecUtilization::new(44, 55));
        assert_eq!(device.decoder_utilization().unwrap(), CodecUtilization::new(66, 77));
        assert_eq!(
            device.auto_boosted_clocks_enabled().unwrap(),
            AutoBoostState {
                enabled: false,
                default_enabled: true,
            }
        );
    }

    #[test]
    fn test_boolean_flags() {
        for (raw, expected) in [(1, true), (5, true), (0, false), (-1, false)] {
            let _guard = with_device(|d| {
                d.display_active = raw;
                d.display_mode = raw;
                d.persistence_mode = raw;
                d.ecc_mode = (raw, 0);
            });
            let nvml = session();
            let device = nvml.device_by_index(0).unwrap();

            assert_eq!(device.display_active().unwrap(), expected, "raw {}", raw);
            assert_eq!(device.display_mode().unwrap(), expected, "raw {}", raw);
            assert_eq!(device.persistence_mode().unwrap(), expected, "raw {}", raw);
            assert_eq!(device.ecc_mode().unwrap().current, expected, "raw {}", raw);
        }
    }

    #[test]
    fn test_on_same_board() {
        let mut state = MockState::default().initialized();
        state.devices.push(MockDevice::new(2));
        state.devices[2].board_id = state.devices[0].board_id;
        let _guard = mock::install(state);

        let nvml = session();
        let devices = nvml.devices().unwrap();
        assert!(!devices[0].on_same_board(&devices[1]).unwrap());
        assert!(devices[0].on_same_board(&devices[2]).unwrap());
    }

    #[test]
    fn test_clocks() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert_eq!(device.clock_info(ClockType::Memory).unwrap().as_mhz(), 7001);
        assert_eq!(device.max_clock_info(ClockType::Graphics).unwrap().as_mhz(), 2100);
        assert_eq!(
            device
                .clock(ClockType::Graphics, ClockId::CustomerBoostMax)
                .unwrap()
                .as_mhz(),
            2100
        );
        let reading = device.clocks(ClockType::Video).unwrap();
        assert_eq!(reading.current, Some(ClockSpeed::new(1275)));
        assert_eq!(reading.max, Some(ClockSpeed::new(1950)));
    }

    #[test]
    fn test_clocks_unsupported_domain_value_is_none() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetApplicationsClock", status::NOT_SUPPORTED),
        );
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let reading = device.clocks(ClockType::Graphics).unwrap();
        assert_eq!(reading.applications, None);
        assert_eq!(reading.current, Some(ClockSpeed::new(1410)));
    }

    #[test]
    fn test_combined_queries_fail_after_shutdown() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();
        nvml.shutdown().unwrap();

        let err = device.clocks(ClockType::Graphics).unwrap_err();
        assert_eq!(err.code(), Some(status::UNINITIALIZED));
        let err = device.thermal_thresholds().unwrap_err();
        assert_eq!(err.code(), Some(status::UNINITIALIZED));
    }

    #[test]
    fn test_combined_queries_propagate_lost_gpu() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetMaxClockInfo", status::GPU_IS_LOST)
                .with_failure("nvmlDeviceGetTemperatureThreshold", status::GPU_IS_LOST)
                .with_failure("nvmlDeviceGetBrand", status::GPU_IS_LOST),
        );
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let errors = [
            device.clocks(ClockType::Memory).unwrap_err(),
            device.thermal_thresholds().unwrap_err(),
            device.info().unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.code(), Some(status::GPU_IS_LOST));
        }
    }

    #[test]
    fn test_supported_clocks() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let memory = device.supported_memory_clocks().unwrap();
        assert_eq!(memory.len(), 4);
        assert_eq!(memory[0].as_mhz(), 7001);

        let graphics = device.supported_graphics_clocks(memory[0]).unwrap();
        assert_eq!(graphics.first().map(|c| c.as_mhz()), Some(2100));

        let err = device
            .supported_graphics_clocks(ClockSpeed::new(1))
            .unwrap_err();
        assert_eq!(err.code(), Some(status::NOT_FOUND));
    }

    #[test]
    fn test_applications_clocks_roundtrip() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        device
            .set_applications_clocks(ClockSpeed::new(5001), ClockSpeed::new(1800))
            .unwrap();
        assert_eq!(
            device.applications_clock(ClockType::Graphics).unwrap().as_mhz(),
            1800
        );
        device.reset_applications_clocks().unwrap();
        assert_eq!(
            device.applications_clock(ClockType::Graphics).unwrap(),
            device.default_applications_clock(ClockType::Graphics).unwrap()
        );
    }

    #[test]
    fn test_throttle_reasons() {
        let _guard = with_device(|d| d.throttle_reasons = ThrottleReasons::SW_POWER_CAP);
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let reasons = device.current_clocks_throttle_reasons().unwrap();
        assert!(reasons.sw_power_cap);
        assert!(reasons.is_throttling());
        assert_eq!(
            device.supported_clocks_throttle_reasons().unwrap().active_reasons().len(),
            9
        );
    }

    #[test]
    fn test_thermal_and_power() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert_eq!(device.temperature(TemperatureSensor::Gpu).unwrap().as_celsius(), 41);
        let thresholds = device.thermal_thresholds().unwrap();
        assert_eq!(thresholds.shutdown, Some(Temperature::new(98)));
        assert_eq!(thresholds.gpu_max, Some(Temperature::new(90)));
        assert_eq!(device.fan_speed().unwrap().as_percentage(), 30);
        assert_eq!(device.power_usage().unwrap().as_milliwatts(), 71_250);
        assert_eq!(device.power_management_limit().unwrap().as_watts(), 300);
        assert_eq!(device.power_management_default_limit().unwrap().as_watts(), 300);
        assert_eq!(device.total_energy_consumption().unwrap(), 1_234_567_890);
        assert_eq!(device.performance_state().unwrap(), PerformanceState::P8);
        assert_eq!(
            device.violation_status(PerfPolicy::Power).unwrap().violation_time_ns,
            12_000_000
        );
    }

    #[test]
    fn test_set_power_limit() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        device
            .set_power_management_limit(PowerLimit::from_watts(250))
            .unwrap();
        assert_eq!(device.enforced_power_limit().unwrap().as_watts(), 250);

        let err = device
            .set_power_management_limit(PowerLimit::from_watts(1000))
            .unwrap_err();
        assert_eq!(err.code(), Some(status::INVALID_ARGUMENT));
    }

    #[test]
    fn test_set_persistence_mode_without_permission() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceSetPersistenceMode", status::NO_PERMISSION),
        );
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let err = device.set_persistence_mode(false).unwrap_err();
        match err {
            NvmlError::Call(call) => {
                assert!(call.is_no_permission());
                assert_eq!(call.message, "Insufficient Permissions");
            }
            other => panic!("expected call error, got {:?}", other),
        }
    }

    #[test]
    fn test_compute_mode_roundtrip() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert_eq!(device.compute_mode().unwrap(), ComputeMode::Default);
        device.set_compute_mode(ComputeMode::ExclusiveProcess).unwrap();
        assert_eq!(device.compute_mode().unwrap(), ComputeMode::ExclusiveProcess);
    }

    #[test]
    fn test_memory_and_utilization() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let memory = device.memory_info().unwrap();
        assert_eq!(memory.total_mb(), 24_576);
        assert_eq!(memory.used_mb(), 2_048);
        assert_eq!(device.bar1_memory_info().unwrap().used, 6 * 1024 * 1024);

        let util = device.utilization_rates().unwrap();
        assert_eq!((util.gpu, util.memory), (12, 4));
    }

    #[test]
    fn test_ecc_counters() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let volatile = device.ecc_error_counts(EccCounterType::Volatile).unwrap();
        assert_eq!(volatile.corrected, 3);
        assert!(!volatile.has_uncorrected());
        assert_eq!(
            device
                .total_ecc_errors(MemoryErrorType::Corrected, EccCounterType::Aggregate)
                .unwrap(),
            17
        );

        device.clear_ecc_error_counts(EccCounterType::Volatile).unwrap();
        assert_eq!(
            device.ecc_error_counts(EccCounterType::Volatile).unwrap(),
            EccErrorCounts::default()
        );
    }

    #[test]
    fn test_retired_pages_by_cause() {
        let many: Vec<u64> = (0..40).map(|i| 0x0001_0000_0000 + i * 0x1000).collect();
        let _guard = with_device(|d| d.retired_pages[0] = many.clone());
        let nvml = session();

        let device = nvml.device_by_index(0).unwrap();
        assert_eq!(
            device
                .retired_pages(PageRetirementCause::MultipleSingleBitEccErrors)
                .unwrap(),
            many
        );
        assert_eq!(
            device
                .retired_pages(PageRetirementCause::DoubleBitEccError)
                .unwrap(),
            vec![0x0003_a1f0_0000]
        );
    }

    #[test]
    fn test_retired_pages_none_retired() {
        let _guard = with_device(|d| d.retired_pages = [Vec::new(), Vec::new()]);
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        for cause in [
            PageRetirementCause::MultipleSingleBitEccErrors,
            PageRetirementCause::DoubleBitEccError,
        ] {
            assert!(device.retired_pages(cause).unwrap().is_empty());
        }
        assert!(!device.retired_pages_pending().unwrap());
    }

    #[test]
    fn test_retired_pages_pending_and_unsupported() {
        let _guard = mock::install(
            MockState {
                devices: vec![
                    MockDevice {
                        retired_pages_pending: 1,
                        ..MockDevice::new(0)
                    },
                    MockDevice::new(1),
                ],
                ..MockState::default().initialized()
            }
            .with_failure("nvmlDeviceGetRetiredPages", status::NOT_SUPPORTED),
        );
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        assert!(device.retired_pages_pending().unwrap());
        let err = device
            .retired_pages(PageRetirementCause::DoubleBitEccError)
            .unwrap_err();
        assert!(matches!(
            err,
            NvmlError::Call(CallError {
                symbol: "nvmlDeviceGetRetiredPages",
                code: status::NOT_SUPPORTED,
                ..
            })
        ));
    }

    #[test]
    fn test_pcie() {
        let _guard = with_device(|d| d.pcie_generation = (3, 4));
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let link = device.pcie_link_status().unwrap();
        assert_eq!(link.current_generation, PcieGeneration::Gen3);
        assert_eq!(link.max_width.lanes(), 16);
        assert!(!link.is_at_max_capability());
        assert_eq!(device.pcie_replay_counter().unwrap(), 0);
        assert_eq!(
            device.pcie_throughput_both().unwrap(),
            PcieThroughput {
                tx_kbps: 1_200,
                rx_kbps: 5_800,
            }
        );
    }

    #[test]
    fn test_pcie_generation_out_of_range() {
        let _guard = with_device(|d| d.pcie_generation = (0, 4));
        let nvml = session();
        let err = nvml
            .device_by_index(0)
            .unwrap()
            .current_pcie_link_generation()
            .unwrap_err();
        assert!(matches!(err, NvmlError::InvalidArgument(_)));
    }

    #[test]
    fn test_processes() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let compute = device.compute_running_processes().unwrap();
        assert_eq!(compute.len(), 2);
        assert_eq!(compute[0].used_memory, Some(512 * 1024 * 1024));
        assert_eq!(compute[1].used_memory, None);

        let list = device.running_processes().unwrap();
        assert_eq!(list.count(), 3);
        assert_eq!(list.processes[0].name.as_deref(), Some("python3"));
        assert_eq!(list.processes[1].name, None);
        assert_eq!(list.processes[2].process_type, ProcessType::Graphics);
        assert_eq!(list.processes[2].name.as_deref(), Some("Xorg"));
    }

    #[test]
    fn test_processes_empty() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let device = nvml.device_by_index(1).unwrap();
        assert!(device.compute_running_processes().unwrap().is_empty());
        assert_eq!(device.running_processes().unwrap().count(), 0);
    }

    #[test]
    fn test_process_name_failure_propagates() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlSystemGetProcessName", status::UNINITIALIZED),
        );
        let nvml = session();
        let device = nvml.device_by_index(0).unwrap();

        let err = device.running_processes().unwrap_err();
        assert_eq!(err.code(), Some(status::UNINITIALIZED));
    }

    #[test]
    fn test_info_tolerates_unsupported_fields() {
        let _guard = mock::install(
            MockState::default()
                .initialized()
                .with_failure("nvmlDeviceGetSerial", status::NOT_SUPPORTED),
        );
        let nvml = session();
        let info = nvml.device_by_index(0).unwrap().info().unwrap();

        assert_eq!(info.index, 0);
        assert_eq!(info.brand, Some(Brand::Tesla));
        assert_eq!(info.serial, None);
        assert_eq!(info.pci_bus_id.as_deref(), Some("00000000:01:00.0"));
    }

    #[test]
    fn test_lenient_missing_symbol_fails_only_that_query() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = Nvml::from_library(
            mock::library_without(&["nvmlDeviceGetFanSpeed"]),
            BindStrategy::Lenient,
        )
        .unwrap();
        let device = nvml.device_by_index(0).unwrap();

        assert!(matches!(
            device.fan_speed(),
            Err(NvmlError::SymbolNotFound { .. })
        ));
        assert!(device.name().is_ok());
    }

    #[test]
    fn test_stored_handle_reattaches() {
        let _guard = mock::install(MockState::default().initialized());
        let nvml = session();
        let handle = nvml.device_by_index(1).unwrap().handle();
        assert_eq!(nvml.device(handle).index().unwrap(), 1);
    }

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_real_device_queries() {
        let nvml = Nvml::load("").unwrap();
        nvml.init().unwrap();
        let device = nvml.device_by_index(0).unwrap();
        assert!(!device.name().unwrap().is_empty());
        assert!(device.uuid().unwrap().starts_with("GPU-"));
        assert!(device.memory_info().unwrap().total > 0);
        nvml.close().unwrap();
    }
}
