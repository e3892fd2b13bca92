//! templet CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use templet::cli::{Cli, CommandDispatcher, Commands};
use templet::config::load_settings;
use templet::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("templet=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("templet=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("templet starting with args: {:?}", cli);

    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else if cli.verbose {
        OutputMode::Verbose
    } else {
        OutputMode::Normal
    };

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    let is_interactive = match &cli.command {
        Commands::Create(args) => !args.non_interactive,
        Commands::Cache(_) => false,
    };
    let mut ui = create_ui(is_interactive, output_mode);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            return ExitCode::from(1);
        }
    };

    let dispatcher = CommandDispatcher::new(settings);
    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
