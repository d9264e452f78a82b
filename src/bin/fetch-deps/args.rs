use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
// thanks to https://stackoverflow.com/a/79614957
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

pub const NOP: Style = Style::new();
pub const HEADER: Style = Green.on_default().effects(Effects::BOLD);
pub const USAGE: Style = Green.on_default().effects(Effects::BOLD);
pub const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
pub const PLACEHOLDER: Style = Cyan.on_default();
pub const ERROR: Style = Red.on_default().effects(Effects::BOLD);
pub const NOTE: Style = Cyan.on_default().effects(Effects::BOLD);
pub const GOOD: Style = Green.on_default().effects(Effects::BOLD);
pub const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
pub const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

#[derive(Debug, Parser)]
#[command(name = "fetch-deps")]
#[command(about = "Fetch external source trees and copy them into your project")]
#[command(long_about = None)]
#[command(version)]
#[command(styles = APP_STYLING)]
#[command(term_width = 80)]
struct Args {
    /// Path to the dependency file, relative to the project root. If omitted, check the
    /// `FETCH_DEPS_FILE` environment variable and then use `deps.json`.
    #[arg(
        long,
        short = 'f',
        value_name = "PATH",
        global = true,
        env = "FETCH_DEPS_FILE"
    )]
    file: Option<PathBuf>,

    /// Project root that dependency folders and destinations are relative to. Defaults to the
    /// current directory.
    #[arg(long, short = 'C', value_name = "PATH", global = true)]
    root: Option<PathBuf>,

    /// Log more detail to stderr. Repeat for more. Overridden by `FETCH_DEPS_LOG`.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// List the declared dependencies
    List {
        /// Output format
        #[arg(long, value_enum, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },
    /// Install all or the named dependencies
    Install {
        /// Names or repository URLs of the dependencies to install
        names: Vec<String>,

        /// Remove any existing clone and destinations and clone afresh
        #[arg(long)]
        force: bool,

        /// Number of dependencies to process at once. Defaults to one at a time.
        #[arg(long, short = 'j', value_name = "NUM-JOBS")]
        jobs: Option<u32>,
    },
    /// Uninstall all or the named dependencies
    Uninstall {
        /// Names or repository URLs of the dependencies to uninstall
        names: Vec<String>,

        /// Number of dependencies to process at once. Defaults to one at a time.
        #[arg(long, short = 'j', value_name = "NUM-JOBS")]
        jobs: Option<u32>,
    },
    /// Declare a new dependency
    Add {
        /// Repository URL, e.g. https://github.com/owner/name.git
        repo: String,

        /// Dependency name. Defaults to the repository name.
        name: Option<String>,

        /// Branch or tag to clone
        #[arg(long, short = 'b')]
        branch: Option<String>,
    },
    /// Remove a dependency from the dependency file
    Remove {
        /// Name or repository URL of the dependency
        identifier: String,

        /// Also delete the dependency's clone and destinations
        #[arg(long)]
        purge: bool,
    },
    /// Add an output destination to a dependency
    Output {
        /// Name or repository URL of the dependency
        identifier: String,

        /// Destination path, relative to the project root
        destination: String,

        /// Path inside the dependency to copy. Defaults to the whole tree.
        source: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Output in JSON format
    Json,
    /// Output in TOML format
    Toml,
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub registry_file: PathBuf,
    pub root: PathBuf,
    pub verbose: u8,
    pub command: ValidatedCommand,
}

#[derive(Debug)]
pub enum ValidatedCommand {
    List {
        format: Option<OutputFormat>,
    },
    Install {
        names: Vec<String>,
        force: bool,
        jobs: usize,
    },
    Uninstall {
        names: Vec<String>,
        jobs: usize,
    },
    Add {
        repo: String,
        name: Option<String>,
        branch: Option<String>,
    },
    Remove {
        identifier: String,
        purge: bool,
    },
    Output {
        identifier: String,
        destination: String,
        source: Option<String>,
    },
}

impl ValidatedArgs {
    fn detect_root(arg: Option<PathBuf>) -> Result<PathBuf, AppError> {
        match arg {
            Some(dir) if !dir.is_dir() => Err(AppError::arg_validation(format!(
                "project root does not exist: {}",
                dir.display()
            ))),
            Some(dir) => Ok(dir.canonicalize()?),
            None => Ok(std::env::current_dir()?),
        }
    }

    fn detect_registry_file(arg: Option<PathBuf>, root: &std::path::Path) -> PathBuf {
        let file = arg.unwrap_or_else(|| PathBuf::from(fetch_deps::DEFAULT_REGISTRY_FILE));
        root.join(file)
    }

    /// Size the global thread pool, returning the number of jobs to run at once.
    fn configure_jobs(jobs: Option<u32>) -> Result<usize, AppError> {
        match jobs {
            None | Some(1) => Ok(1),
            Some(0) => Err(AppError::arg_validation(
                "number of jobs must be at least 1".to_string(),
            )),
            Some(jobs) => {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs as usize)
                    .build_global()
                    .map_err(|e| {
                        AppError::arg_validation(format!("Failed to set thread count: {e}"))
                    })?;
                Ok(jobs as usize)
            }
        }
    }
}

impl TryFrom<Command> for ValidatedCommand {
    type Error = AppError;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        Ok(match command {
            Command::List { format } => ValidatedCommand::List { format },
            Command::Install { names, force, jobs } => ValidatedCommand::Install {
                names,
                force,
                jobs: ValidatedArgs::configure_jobs(jobs)?,
            },
            Command::Uninstall { names, jobs } => ValidatedCommand::Uninstall {
                names,
                jobs: ValidatedArgs::configure_jobs(jobs)?,
            },
            Command::Add { repo, name, branch } => ValidatedCommand::Add { repo, name, branch },
            Command::Remove { identifier, purge } => ValidatedCommand::Remove { identifier, purge },
            Command::Output {
                identifier,
                destination,
                source,
            } => {
                if destination.is_empty() {
                    return Err(AppError::arg_validation(
                        "destination must not be empty".to_string(),
                    ));
                }
                ValidatedCommand::Output {
                    identifier,
                    destination,
                    source,
                }
            }
        })
    }
}

pub fn parse() -> Result<ValidatedArgs, AppError> {
    let args = Args::parse();
    let root = ValidatedArgs::detect_root(args.root)?;
    Ok(ValidatedArgs {
        registry_file: ValidatedArgs::detect_registry_file(args.file, &root),
        root,
        verbose: args.verbose,
        command: ValidatedCommand::try_from(args.command)?,
    })
}
