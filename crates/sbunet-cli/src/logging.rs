use crate::error::{CliError, Result};
use std::cmp;
use std::fs::File;
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
    registry::LookupSpan,
};

/// Environment variable holding filter directives that replace the
/// verbosity flags entirely.
const LOG_ENV: &str = "SBUNET_LOG";

/// Targets that follow `-v`; everything else stays at warnings.
const OWN_TARGETS: [&str; 2] = ["sbunet", "sbunet_cli"];

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn default_directives(level: LevelFilter) -> String {
    let base = cmp::min(LevelFilter::WARN, level);
    let mut directives = base.to_string().to_ascii_lowercase();
    for target in OWN_TARGETS {
        directives.push_str(&format!(",{}={}", target, level.to_string().to_ascii_lowercase()));
    }
    directives
}

fn log_filter(verbosity: u8, quiet: bool) -> EnvFilter {
    if !quiet {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return filter;
        }
    }
    EnvFilter::new(default_directives(level_filter(verbosity, quiet)))
}

fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let file = log_file
        .map(File::create)
        .transpose()
        .map_err(CliError::Io)?;

    tracing_subscriber::registry()
        .with(log_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file.map(file_layer))
        .try_init()
        .map_err(|e| CliError::Other(e.into()))
}
