//! nvbind - query NVIDIA GPUs through a dynamically loaded NVML
//!
//! A command-line front end over the nvbind library. The NVML shared
//! library is located at runtime; `symbols` and `error-string` work even
//! when the driver cannot be initialized.

use clap::Parser;
use nvbind::cli::args::{generate_completions, Cli, Commands};
use nvbind::commands::{
    run_clocks, run_error_string, run_info, run_list, run_persistence, run_power_limit,
    run_processes, run_symbols, run_system, Session,
};
use nvbind::config::{Config, ConfigBuilder};
use nvbind::error::{AppError, NvmlError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Set log level based on verbose flag
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let result = build_config(&cli).and_then(|config| run(&cli, config));

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

/// Layer config file, environment and flags
fn build_config(cli: &Cli) -> Result<Config, AppError> {
    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_library_path(cli.library.clone())
        .with_lenient(cli.lenient)
        .with_format(cli.format)
        .with_gpu_index(cli.gpu)
        .with_gpu_uuid(cli.gpu_uuid.clone())
        .build();
    log::debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn run(cli: &Cli, config: Config) -> Result<(), AppError> {
    // Commands that never touch the library
    if let Commands::Completions { shell } = &cli.command {
        generate_completions(*shell);
        return Ok(());
    }

    let session = match &cli.command {
        Commands::ErrorString { .. } | Commands::Symbols(_) => Session::load(config)?,
        _ => Session::open(config)?,
    };

    let result = match &cli.command {
        Commands::System => run_system(&session),
        Commands::List => run_list(&session),
        Commands::Info(args) => run_info(&session, args),
        Commands::Processes(args) => run_processes(&session, args),
        Commands::Clocks => run_clocks(&session),
        Commands::Symbols(args) => run_symbols(&session, args),
        Commands::ErrorString { code } => run_error_string(&session, *code),
        Commands::Persistence { state } => run_persistence(&session, *state),
        Commands::PowerLimit { milliwatts } => run_power_limit(&session, *milliwatts),
        Commands::Completions { .. } => Ok(()),
    };

    // The command's error wins over a shutdown failure
    let closed = session.close();
    result.and(closed)
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Nvml(NvmlError::LibraryLoad { .. }) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      On Linux, install the nvidia-utils package,");
            eprintln!("      or point --library at libnvidia-ml.so.1.");
        }
        AppError::Nvml(NvmlError::SymbolNotFound { .. }) => {
            eprintln!();
            eprintln!("Hint: The driver may be older than this tool expects.");
            eprintln!("      Retry with --lenient, or run 'nvbind symbols --lenient --missing'.");
        }
        AppError::Nvml(NvmlError::Call(call)) if call.is_no_permission() => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        AppError::NoGpusFound => {
            eprintln!();
            eprintln!("Hint: Make sure you have an NVIDIA GPU installed.");
            eprintln!("      Check 'nvidia-smi' for GPU detection.");
        }
        _ => {}
    }
}
