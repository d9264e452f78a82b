use std::error::Error as _;
use std::io::IsTerminal;
use std::process::ExitCode;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod error;
mod progress;

use crate::error::AppError;

/// Log to stderr at a level chosen by the number of `-v` flags, unless `FETCH_DEPS_LOG` says
/// otherwise.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("FETCH_DEPS_LOG")
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn report_error(error: AppError) -> ExitCode {
    let style = if std::io::stderr().is_terminal() {
        args::ERROR
    } else {
        args::NOP
    };
    eprintln!("{style}error:{style:#} {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    error.into()
}

fn main() -> ExitCode {
    let args = match args::parse() {
        Ok(args) => args,
        Err(error) => return report_error(error),
    };
    init_logging(args.verbose);
    tracing::debug!("{args:#?}");
    match commands::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report_error(error),
    }
}
