//! System-level queries

use crate::domain::{CudaDriverVersion, SystemInfo};
use crate::error::{NvmlError, OptionalExt};
use crate::nvml::marshal::{
    OutBuffer, DRIVER_VERSION_BUFFER_SIZE, NVML_VERSION_BUFFER_SIZE, PROCESS_NAME_BUFFER_SIZE,
};
use crate::nvml::wrapper::Nvml;

use std::ffi::c_int;

impl Nvml {
    /// CUDA version supported by the installed driver
    pub fn cuda_driver_version(&self) -> Result<CudaDriverVersion, NvmlError> {
        let mut version: c_int = 0;
        self.invoker()
            .call(&self.table().system_get_cuda_driver_version, |f| unsafe {
                f(&mut version)
            })?;
        Ok(CudaDriverVersion::from_raw(version))
    }

    /// Installed driver version, e.g. `535.104.05`
    pub fn driver_version(&self) -> Result<String, NvmlError> {
        let mut buffer = OutBuffer::<DRIVER_VERSION_BUFFER_SIZE>::new();
        self.invoker()
            .call(&self.table().system_get_driver_version, |f| unsafe {
                f(buffer.as_mut_ptr(), buffer.capacity())
            })?;
        Ok(buffer.to_string_lossy())
    }

    /// NVML library version, e.g. `12.535.104.05`
    pub fn nvml_version(&self) -> Result<String, NvmlError> {
        let mut buffer = OutBuffer::<NVML_VERSION_BUFFER_SIZE>::new();
        self.invoker()
            .call(&self.table().system_get_nvml_version, |f| unsafe {
                f(buffer.as_mut_ptr(), buffer.capacity())
            })?;
        Ok(buffer.to_string_lossy())
    }

    /// Name of the process with the given pid
    pub fn process_name(&self, pid: u32) -> Result<String, NvmlError> {
        let mut buffer = OutBuffer::<PROCESS_NAME_BUFFER_SIZE>::new();
        self.invoker()
            .call(&self.table().system_get_process_name, |f| unsafe {
                f(pid, buffer.as_mut_ptr(), buffer.capacity())
            })?;
        Ok(buffer.to_string_lossy())
    }

    /// Versions and device count in one value
    ///
    /// The CUDA version is optional since older drivers lack the entry point;
    /// any other failure propagates.
    pub fn system_info(&self) -> Result<SystemInfo, NvmlError> {
        Ok(SystemInfo {
            library: self.origin().to_string(),
            driver_version: self.driver_version()?,
            nvml_version: self.nvml_version()?,
            cuda_driver_version: self.cuda_driver_version().optional()?,
            device_count: self.device_count()?,
        })
    }
}
