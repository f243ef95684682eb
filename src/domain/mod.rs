//! Domain models for nvbind
//!
//! Owned Rust values for what the NVML queries return, converted from the
//! raw native layouts right after each call.

pub mod clock;
pub mod device;
pub mod memory;
pub mod pcie;
pub mod performance;
pub mod power;
pub mod process;
pub mod system;
pub mod thermal;

pub use clock::{AutoBoostState, ClockId, ClockReading, ClockSpeed, ClockType, ThrottleReasons};
pub use device::{Brand, ComputeMode, CudaComputeCapability, DeviceInfo, PciInfo};
pub use memory::{
    Bar1MemoryInfo, EccCounterType, EccErrorCounts, EccMode, MemoryErrorType, MemoryInfo,
    PageRetirementCause,
};
pub use pcie::{
    PcieGeneration, PcieLinkStatus, PcieLinkWidth, PcieThroughput, PcieUtilCounter, TopologyLevel,
};
pub use performance::{
    CodecUtilization, EncoderStats, PerfPolicy, PerformanceState, Utilization, ViolationTime,
};
pub use power::{PowerConstraints, PowerLimit};
pub use process::{GpuProcess, ProcessList, ProcessType};
pub use system::{CudaDriverVersion, SystemInfo};
pub use thermal::{FanSpeed, Temperature, TemperatureSensor, TemperatureThreshold, ThermalThresholds};
