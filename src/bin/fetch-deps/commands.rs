use std::io::IsTerminal;
use std::path::Path;

use anstyle::Style;
use fetch_deps::{Dependency, InstallOptions, Installer, Registry, flatten_destinations};

use crate::args::{GOOD, LITERAL, NOP, NOTE, OutputFormat, ValidatedArgs, ValidatedCommand};
use crate::error::AppError;
use crate::progress::{self, Outcome};

/// Styles are only applied when stdout is a terminal.
fn paint(style: Style) -> Style {
    if std::io::stdout().is_terminal() {
        style
    } else {
        NOP
    }
}

pub fn run(args: ValidatedArgs) -> Result<(), AppError> {
    let ValidatedArgs {
        registry_file,
        root,
        command,
        ..
    } = args;
    match command {
        ValidatedCommand::List { format } => list(&registry_file, format),
        ValidatedCommand::Install { names, force, jobs } => {
            install(&registry_file, &root, &names, force, jobs)
        }
        ValidatedCommand::Uninstall { names, jobs } => {
            uninstall(&registry_file, &root, &names, jobs)
        }
        ValidatedCommand::Add { repo, name, branch } => {
            add(&registry_file, &repo, name.as_deref(), branch.as_deref())
        }
        ValidatedCommand::Remove { identifier, purge } => {
            remove(&registry_file, &root, &identifier, purge)
        }
        ValidatedCommand::Output {
            identifier,
            destination,
            source,
        } => output(&registry_file, &identifier, &destination, source.as_deref()),
    }
}

#[derive(serde::Serialize)]
struct Listing<'a> {
    dependency: &'a [Dependency],
}

fn list(registry_file: &Path, format: Option<OutputFormat>) -> Result<(), AppError> {
    let registry = Registry::load(registry_file)?;
    let dependencies = registry.dependencies();
    match format {
        Some(OutputFormat::Json) => {
            let text = serde_json::to_string_pretty(dependencies).map_err(AppError::format)?;
            println!("{text}");
        }
        Some(OutputFormat::Toml) => {
            let text = toml::to_string(&Listing {
                dependency: dependencies,
            })
            .map_err(AppError::format)?;
            print!("{text}");
        }
        None if dependencies.is_empty() => {
            let note = paint(NOTE);
            println!("{note}No dependencies found.{note:#}");
        }
        None => {
            let (good, literal) = (paint(GOOD), paint(LITERAL));
            for dependency in dependencies {
                print!("{good}{}{good:#}: {}", dependency.name, dependency.repo);
                if let Some(branch) = &dependency.branch {
                    print!(" (branch: {literal}{branch}{literal:#})");
                }
                if dependency.is_local_alias() {
                    print!(" [local]");
                }
                println!();
                for destination in flatten_destinations(dependency.out.as_ref()) {
                    println!("    -> {destination}");
                }
            }
        }
    }
    Ok(())
}

/// Print the steps performed for each dependency and return the first failure, if any.
fn report<E>(outcomes: Vec<Outcome<'_>>, on_error: E) -> Result<(), AppError>
where
    E: Fn(String, fetch_deps::Error) -> AppError,
{
    let good = paint(GOOD);
    let mut failure = None;
    for Outcome {
        dependency,
        log,
        result,
    } in outcomes
    {
        log.iter().for_each(|line| println!("{line}"));
        match result {
            Ok(()) => {
                println!("{good}✔{good:#} {}", dependency.name);
            }
            Err(err) if failure.is_none() => {
                failure = Some(on_error(dependency.name.clone(), err));
            }
            Err(err) => {
                // Only the first failure is returned
                tracing::error!("{}: {err}", dependency.name);
            }
        }
    }
    failure.map_or(Ok(()), Err)
}

fn install(
    registry_file: &Path,
    root: &Path,
    names: &[String],
    force: bool,
    jobs: usize,
) -> Result<(), AppError> {
    let registry = Registry::load(registry_file)?;
    let selected = registry.select(names)?;
    let installer = Installer::new(root);
    let options = InstallOptions { force };
    let results = progress::run_each(&selected, jobs, "Installing", |dependency, log| {
        installer.install_logged(dependency, options, log)
    });
    report(results, AppError::install)
}

fn uninstall(
    registry_file: &Path,
    root: &Path,
    names: &[String],
    jobs: usize,
) -> Result<(), AppError> {
    let registry = Registry::load(registry_file)?;
    let selected = registry.select(names)?;
    let installer = Installer::new(root);
    let results = progress::run_each(&selected, jobs, "Uninstalling", |dependency, log| {
        installer.uninstall_logged(dependency, log)
    });
    report(results, AppError::uninstall)
}

fn add(
    registry_file: &Path,
    repo: &str,
    name: Option<&str>,
    branch: Option<&str>,
) -> Result<(), AppError> {
    let mut registry = Registry::load(registry_file)?;
    let added = registry.add(repo, name, branch)?.to_string();
    registry.save()?;
    let good = paint(GOOD);
    println!("{good}Added{good:#} {added}");
    Ok(())
}

fn remove(registry_file: &Path, root: &Path, identifier: &str, purge: bool) -> Result<(), AppError> {
    let mut registry = Registry::load(registry_file)?;
    let removed = registry.remove(identifier)?;
    registry.save()?;
    let good = paint(GOOD);
    let installer = Installer::new(root);
    for dependency in &removed {
        if purge {
            let mut log = Vec::new();
            let result = installer.uninstall_logged(dependency, &mut log);
            log.iter().for_each(|line| println!("{line}"));
            result.map_err(|err| AppError::uninstall(dependency.name.clone(), err))?;
        }
        println!("{good}Removed{good:#} {dependency}");
    }
    Ok(())
}

fn output(
    registry_file: &Path,
    identifier: &str,
    destination: &str,
    source: Option<&str>,
) -> Result<(), AppError> {
    let mut registry = Registry::load(registry_file)?;
    let name = registry
        .add_output(identifier, destination, source)?
        .name
        .clone();
    registry.save()?;
    let (good, literal) = (paint(GOOD), paint(LITERAL));
    println!(
        "{good}Output{good:#} {literal}{}{literal:#} of {name} to {literal}{destination}{literal:#}",
        source.unwrap_or("/")
    );
    Ok(())
}
