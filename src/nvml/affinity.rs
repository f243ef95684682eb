//! CPU affinity and GPU topology of a device (Linux)
//!
//! NVML describes the CPUs ideally placed for a device as a bit mask split
//! into `unsigned long` words. The words are returned as-is.

use crate::domain::TopologyLevel;
use crate::error::NvmlError;
use crate::nvml::device::{Device, DeviceHandle};

use nvml_wrapper_sys::bindings::nvmlDevice_t;
use std::ffi::c_ulong;

impl<'nvml> Device<'nvml> {
    /// Other GPUs connected to this one through a path of type `level`
    pub fn topology_nearest_gpus(
        &self,
        level: TopologyLevel,
    ) -> Result<Vec<Device<'nvml>>, NvmlError> {
        let nvml = self.nvml();
        let (raw, level) = (self.raw(), level.as_raw());
        let handles: Vec<nvmlDevice_t> = nvml.invoker().enumerate(
            &nvml.table().device_get_topology_nearest_gpus,
            |f, count, buf| unsafe { f(raw, level, count, buf) },
        )?;

        Ok(handles
            .into_iter()
            .map(|handle| nvml.device(DeviceHandle::from_raw(handle)))
            .collect())
    }

    /// Ideal CPU mask for this device, as `set_size` words
    pub fn cpu_affinity(&self, set_size: u32) -> Result<Vec<c_ulong>, NvmlError> {
        if set_size == 0 {
            return Ok(Vec::new());
        }

        let mut words: Vec<c_ulong> = vec![0; set_size as usize];
        let raw = self.raw();
        self.nvml().invoker().call(
            &self.nvml().table().device_get_cpu_affinity,
            // SAFETY: `words` holds exactly `set_size` elements.
            |f| unsafe { f(raw, set_size, words.as_mut_ptr()) },
        )?;
        Ok(words)
    }

    /// Pin the calling thread to this device's ideal CPUs
    pub fn set_cpu_affinity(&self) -> Result<(), NvmlError> {
        let raw = self.raw();
        self.nvml()
            .invoker()
            .call(&self.nvml().table().device_set_cpu_affinity, |f| unsafe {
                f(raw)
            })
    }

    /// Undo [`Device::set_cpu_affinity`]
    pub fn clear_cpu_affinity(&self) -> Result<(), NvmlError> {
        let raw = self.raw();
        self.nvml()
            .invoker()
            .call(&self.nvml().table().device_clear_cpu_affinity, |f| unsafe {
                f(raw)
            })
    }
}
