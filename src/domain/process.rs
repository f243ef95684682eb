//! Process domain types
//!
//! Types for processes holding a context on a GPU.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A process with a context on the GPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuProcess {
    /// Process ID
    pub pid: u32,
    /// Process name, if it could be resolved
    pub name: Option<String>,
    /// GPU memory used by this process in bytes; `None` when the driver
    /// cannot attribute memory (e.g. under some virtualization modes)
    pub used_memory: Option<u64>,
    /// Kind of context (graphics, compute)
    pub process_type: ProcessType,
}

impl GpuProcess {
    /// Create a new GPU process
    pub fn new(pid: u32, used_memory: Option<u64>, process_type: ProcessType) -> Self {
        Self {
            pid,
            name: None,
            used_memory,
            process_type,
        }
    }

    /// Set the process name
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Get memory usage in MB
    pub fn memory_mb(&self) -> Option<f64> {
        self.used_memory.map(|bytes| bytes as f64 / 1024.0 / 1024.0)
    }

    /// Get display name (name or PID)
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Process {}", self.pid))
    }
}

impl fmt::Display for GpuProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memory_mb() {
            Some(mb) => write!(f, "PID {} ({}): {:.1} MB", self.pid, self.process_type, mb),
            None => write!(f, "PID {} ({}): N/A", self.pid, self.process_type),
        }
    }
}

/// Type of GPU context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    /// Graphics rendering context
    Graphics,
    /// Compute/CUDA context
    Compute,
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphics => write!(f, "Graphics"),
            Self::Compute => write!(f, "Compute"),
        }
    }
}

/// Summary of all processes using a GPU
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessList {
    /// List of processes
    pub processes: Vec<GpuProcess>,
    /// Total attributed memory in bytes
    pub total_used_memory: u64,
}

impl ProcessList {
    /// Create a new process list
    pub fn new(processes: Vec<GpuProcess>) -> Self {
        let total_used_memory = processes.iter().filter_map(|p| p.used_memory).sum();
        Self {
            processes,
            total_used_memory,
        }
    }

    /// Get number of processes
    pub fn count(&self) -> usize {
        self.processes.len()
    }

    /// Get processes sorted by memory usage (descending, unattributed last)
    pub fn sorted_by_memory(&self) -> Vec<&GpuProcess> {
        let mut sorted: Vec<&GpuProcess> = self.processes.iter().collect();
        sorted.sort_by(|a, b| b.used_memory.cmp(&a.used_memory));
        sorted
    }

    /// Filter by process type
    pub fn filter_by_type(&self, process_type: ProcessType) -> Vec<&GpuProcess> {
        self.processes
            .iter()
            .filter(|p| p.process_type == process_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_gpu_process_creation() {
        let process = GpuProcess::new(1234, Some(512 * MIB), ProcessType::Graphics);
        assert_eq!(process.pid, 1234);
        assert_eq!(process.memory_mb(), Some(512.0));
        assert!(process.name.is_none());
        assert_eq!(process.display_name(), "Process 1234");
        assert_eq!(process.to_string(), "PID 1234 (Graphics): 512.0 MB");
    }

    #[test]
    fn test_gpu_process_with_name() {
        let process =
            GpuProcess::new(1234, None, ProcessType::Compute).with_name("python3".to_string());
        assert_eq!(process.display_name(), "python3");
        assert_eq!(process.to_string(), "PID 1234 (Compute): N/A");
    }

    #[test]
    fn test_process_list_totals_skip_unattributed() {
        let list = ProcessList::new(vec![
            GpuProcess::new(100, Some(512 * MIB), ProcessType::Graphics),
            GpuProcess::new(200, None, ProcessType::Compute),
            GpuProcess::new(300, Some(1024 * MIB), ProcessType::Compute),
        ]);
        assert_eq!(list.count(), 3);
        assert_eq!(list.total_used_memory, 1536 * MIB);
    }

    #[test]
    fn test_process_list_sorting() {
        let list = ProcessList::new(vec![
            GpuProcess::new(100, Some(256 * MIB), ProcessType::Graphics),
            GpuProcess::new(200, None, ProcessType::Compute),
            GpuProcess::new(300, Some(512 * MIB), ProcessType::Graphics),
        ]);
        let pids: Vec<u32> = list.sorted_by_memory().iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![300, 100, 200]);
    }

    #[test]
    fn test_process_list_filter_by_type() {
        let list = ProcessList::new(vec![
            GpuProcess::new(100, Some(256 * MIB), ProcessType::Graphics),
            GpuProcess::new(200, Some(MIB), ProcessType::Compute),
            GpuProcess::new(300, Some(512 * MIB), ProcessType::Graphics),
        ]);
        assert_eq!(list.filter_by_type(ProcessType::Graphics).len(), 2);
        assert_eq!(list.filter_by_type(ProcessType::Compute).len(), 1);
    }
}
