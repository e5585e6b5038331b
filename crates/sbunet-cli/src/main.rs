mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::Cli;
use crate::config::PartialDecomposeConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use sbunet::engine::progress::ProgressReporter;
use tracing::{debug, error, info, warn};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook
        .install()
        .map_err(|e| CliError::Other(anyhow::anyhow!("{e}")))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 SBUNET CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    info!("Merging configuration from file and CLI arguments...");
    let app_config = PartialDecomposeConfig::load(&cli)?.merge_with_cli(&cli)?;

    let progress_handler = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    match commands::decompose::run(&app_config, &reporter) {
        Ok(Some(decomposition)) => {
            info!(
                rounds = decomposition.reduction.rounds,
                vertices = decomposition.net.atom_count(),
                edges = decomposition.net.bond_count(),
                "✅ Decomposition completed successfully."
            );
            Ok(())
        }
        Ok(None) => {
            warn!("Decomposition finished with errors; see the log above.");
            Ok(())
        }
        Err(e) => {
            error!("❌ Could not read input: {}", e);
            Err(e)
        }
    }
}
