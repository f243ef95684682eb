//! System command implementation
//!
//! Shows driver, NVML and CUDA versions.

use crate::cli::output::print_output;
use crate::commands::Session;
use crate::error::Result;

/// Execute the system command
pub fn run_system(session: &Session) -> Result<()> {
    let info = session.nvml().system_info()?;
    print_output(&info, session.format())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::output::TableDisplay;
    use crate::commands::testing::session;
    use crate::config::Config;
    use crate::mock::{self, MockState};

    #[test]
    fn test_system_table() {
        let _guard = mock::install(MockState::default().initialized());
        let session = session(Config::default());

        let table = session.nvml().system_info().unwrap().to_table();
        assert!(table.contains("Library: mock"));
        assert!(table.contains("CUDA Version: 12.2"));
        assert!(table.contains("GPUs Found: 2"));
    }
}
