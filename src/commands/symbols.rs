//! Symbols command implementation
//!
//! Reports which table entries the loaded library exports. Useful with
//! `--lenient` against older drivers.

use crate::cli::args::SymbolsArgs;
use crate::cli::output::{print_output, SymbolReport};
use crate::commands::Session;
use crate::error::Result;
use crate::nvml::Nvml;

/// Execute the symbols command
pub fn run_symbols(session: &Session, args: &SymbolsArgs) -> Result<()> {
    let report = collect_symbols(session.nvml(), args.missing);
    print_output(&report, session.format())?;
    Ok(())
}

pub fn collect_symbols(nvml: &Nvml, missing_only: bool) -> SymbolReport {
    let entries = nvml.symbols();
    let resolved = entries.iter().filter(|e| e.resolved).count();
    let missing = entries.len() - resolved;

    let symbols = entries
        .into_iter()
        .filter(|e| !missing_only || !e.resolved)
        .collect();

    SymbolReport {
        library: nvml.origin().to_string(),
        resolved,
        missing,
        symbols,
    }
}
