//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Query NVIDIA GPUs through a dynamically loaded NVML
///
/// The NVML library is located and bound at runtime, so the tool runs (and
/// reports what is missing) on hosts without a matching driver.
#[derive(Parser, Debug)]
#[command(name = "nvbind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format [default: table, or the config file value]
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NVBIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the NVML shared library
    #[arg(short, long, global = true, env = "NVBIND_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Tolerate symbols missing from the library until they are called
    #[arg(long, global = true)]
    pub lenient: bool,

    /// Target GPU by index (0-based)
    #[arg(long, global = true)]
    pub gpu: Option<u32>,

    /// Target GPU by UUID
    #[arg(long, global = true, conflicts_with = "gpu")]
    pub gpu_uuid: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show driver, NVML and CUDA versions
    System,

    /// List all detected GPUs
    List,

    /// Show GPU information
    Info(InfoArgs),

    /// List processes running on the GPU
    Processes(ProcessesArgs),

    /// Show clock speeds and throttle reasons
    Clocks,

    /// Show which NVML entry points the library exports
    Symbols(SymbolsArgs),

    /// Render an NVML status code as text
    ErrorString {
        /// Status code (e.g. 3 for NVML_ERROR_NOT_SUPPORTED)
        code: u32,
    },

    /// Enable or disable persistence mode (Linux, requires root)
    Persistence {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Set the power management limit (requires root)
    PowerLimit {
        /// Limit in milliwatts
        milliwatts: u32,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the info command
#[derive(Parser, Debug, Default)]
pub struct InfoArgs {
    /// Show all information
    #[arg(short, long)]
    pub all: bool,

    /// Show memory and utilization
    #[arg(long)]
    pub memory: bool,

    /// Show power and thermal information
    #[arg(long)]
    pub power: bool,

    /// Show PCIe link information
    #[arg(long)]
    pub pcie: bool,

    /// Show ECC mode and error counts
    #[arg(long)]
    pub ecc: bool,
}

/// Arguments for the processes command
#[derive(Parser, Debug, Default)]
pub struct ProcessesArgs {
    /// Only show processes of this type
    #[arg(short = 't', long = "type", value_enum)]
    pub process_type: Option<ProcessTypeFilter>,

    /// Sort by PID instead of memory usage
    #[arg(long)]
    pub sort_pid: bool,

    /// Show only the top N processes
    #[arg(long)]
    pub top: Option<usize>,
}

/// Process type filter
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessTypeFilter {
    Graphics,
    Compute,
}

/// Arguments for the symbols command
#[derive(Parser, Debug, Default)]
pub struct SymbolsArgs {
    /// Only list symbols the library does not export
    #[arg(long)]
    pub missing: bool,
}

/// On/off switch
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
