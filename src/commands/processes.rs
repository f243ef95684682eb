//! Processes command implementation
//!
//! Lists processes running on GPU with memory usage.

use crate::cli::args::{ProcessTypeFilter, ProcessesArgs};
use crate::cli::output::{print_output, ProcessEntry, ProcessListOutput};
use crate::commands::Session;
use crate::domain::{GpuProcess, ProcessType};
use crate::error::Result;
use crate::nvml::Device;

/// Execute the processes command
pub fn run_processes(session: &Session, args: &ProcessesArgs) -> Result<()> {
    let devices = session.devices()?;

    for device in &devices {
        let output = collect_processes(device, args)?;
        print_output(&output, session.format())?;

        if devices.len() > 1 {
            println!(); // Separator between GPUs
        }
    }

    Ok(())
}

/// Processes on `device`, filtered, sorted and truncated per `args`
pub fn collect_processes(device: &Device<'_>, args: &ProcessesArgs) -> Result<ProcessListOutput> {
    let gpu_index = device.index()?;
    let gpu_name = device.name()?;
    let process_list = device.running_processes()?;

    let mut processes: Vec<&GpuProcess> = match args.process_type {
        Some(ProcessTypeFilter::Graphics) => process_list.filter_by_type(ProcessType::Graphics),
        Some(ProcessTypeFilter::Compute) => process_list.filter_by_type(ProcessType::Compute),
        None => process_list.processes.iter().collect(),
    };

    if args.sort_pid {
        processes.sort_by_key(|p| p.pid);
    } else {
        // Descending; unattributed memory sorts last
        processes.sort_by(|a, b| b.used_memory.cmp(&a.used_memory));
    }

    if let Some(n) = args.top {
        processes.truncate(n);
    }

    let entries: Vec<ProcessEntry> = processes
        .iter()
        .map(|p| ProcessEntry {
            pid: p.pid,
            name: p.display_name(),
            memory_mb: p.memory_mb(),
            process_type: p.process_type.to_string(),
        })
        .collect();

    Ok(ProcessListOutput {
        gpu_name,
        gpu_index,
        process_count: entries.len(),
        total_memory_mb: process_list.total_used_memory as f64 / 1024.0 / 1024.0,
        processes: entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::session;
    use crate::config::Config;
    use crate::mock::{self, MockState};

    fn collect(args: ProcessesArgs) -> ProcessListOutput {
        let session = session(Config::default());
        let device = session.nvml().device_by_index(0).unwrap();
        collect_processes(&device, &args).unwrap()
    }

    #[test]
    fn test_sorted_by_memory() {
        let _guard = mock::install(MockState::default().initialized());
        let output = collect(ProcessesArgs::default());

        let pids: Vec<u32> = output.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![4242, 1200, 4343]);
        assert_eq!(output.processes[0].name, "python3");
        assert_eq!(output.processes[2].name, "Process 4343");
        assert_eq!(output.processes[2].memory_mb, None);
        assert_eq!(output.total_memory_mb, 576.0);
    }

    #[test]
    fn test_filter_sort_and_top() {
        let _guard = mock::install(MockState::default().initialized());
        let output = collect(ProcessesArgs {
            process_type: Some(ProcessTypeFilter::Compute),
            sort_pid: true,
            top: Some(1),
        });

        assert_eq!(output.process_count, 1);
        assert_eq!(output.processes[0].pid, 4242);
        assert_eq!(output.processes[0].process_type, "Compute");
    }

    #[test]
    fn test_no_processes() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());
        let device = session.nvml().device_by_index(1).unwrap();

        let output = collect_processes(&device, &ProcessesArgs::default()).unwrap();
        assert_eq!(output.process_count, 0);
        assert_eq!(output.total_memory_mb, 0.0);
    }
}
