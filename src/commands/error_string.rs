//! Error-string command implementation
//!
//! Renders a status code through `nvmlErrorString`. Needs a loaded library
//! but not an initialized one.

use crate::cli::output::{print_output, ErrorStringOutput};
use crate::commands::Session;
use crate::error::Result;

/// Execute the error-string command
pub fn run_error_string(session: &Session, code: u32) -> Result<()> {
    let output = ErrorStringOutput {
        code,
        message: session.nvml().error_string(code),
    };
    print_output(&output, session.format())?;
    Ok(())
}
