//! Structural checks applied to dependency records before they are used or written.
//!
//! Raw JSON values are checked field by field so that each malformed record is reported with a
//! distinct reason. Typed records are checked again before the registry is saved.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::dependency::{Dependency, DependencyKind};
use crate::error::ValidationError;
use crate::mapping::{Destinations, OutputMapping};

static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/[^/\s*?]+/[^/\s*?]+$")
        .expect("repository URL pattern is valid")
});

pub fn validate_name(name: Option<&Value>) -> Result<&str, ValidationError> {
    match name {
        None | Some(Value::Null) => Err(ValidationError::NameMissing),
        Some(Value::String(name)) => check_name(name).map(|_| name.as_str()),
        Some(_) => Err(ValidationError::NameNotString),
    }
}

pub fn validate_repo(repo: Option<&Value>) -> Result<&str, ValidationError> {
    match repo {
        None | Some(Value::Null) => Err(ValidationError::RepoMissing),
        Some(Value::String(repo)) => validate_repo_url(repo).map(|_| repo.as_str()),
        Some(_) => Err(ValidationError::RepoNotString),
    }
}

pub fn validate_branch(branch: Option<&Value>) -> Result<(), ValidationError> {
    match branch {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(branch)) => check_branch(branch),
        Some(_) => Err(ValidationError::BranchNotString),
    }
}

/// Check that `out` is one of the three mapping shapes. A keyed mapping only holds strings or
/// lists of strings.
pub fn validate_out(out: Option<&Value>) -> Result<(), ValidationError> {
    match out {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(destination)) => check_destination(destination),
        Some(Value::Array(items)) => check_list(items),
        Some(Value::Object(table)) => table.iter().try_for_each(|(key, value)| match value {
            Value::String(destination) => check_destination(destination),
            Value::Array(items) => check_list(items).map_err(|err| match err {
                ValidationError::OutListNotStrings => {
                    ValidationError::OutKeyedEntryInvalid { key: key.clone() }
                }
                err => err,
            }),
            _ => Err(ValidationError::OutKeyedEntryInvalid { key: key.clone() }),
        }),
        Some(_) => Err(ValidationError::OutInvalidShape),
    }
}

/// Validate a full dependency definition as read from the registry file.
pub fn validate_record(record: &Value) -> Result<(), ValidationError> {
    let record = record.as_object().ok_or(ValidationError::RecordNotObject)?;
    validate_name(record.get("name"))?;
    validate_repo(record.get("repo"))?;
    validate_branch(record.get("branch"))?;
    validate_out(record.get("out"))
}

/// Validate a typed dependency before it is written.
pub fn validate_dependency(dependency: &Dependency) -> Result<(), ValidationError> {
    validate_paths(dependency)?;
    validate_repo_url(&dependency.repo)?;
    if let Some(branch) = &dependency.branch {
        check_branch(branch)?;
    }
    Ok(())
}

/// Check that the dependency's folder and every destination stay inside the project root, so
/// that installing and uninstalling never touch anything else.
pub fn validate_paths(dependency: &Dependency) -> Result<(), ValidationError> {
    check_name(&dependency.name)?;
    match &dependency.out {
        Some(out) => validate_mapping(out),
        None => Ok(()),
    }
}

pub fn validate_mapping(mapping: &OutputMapping) -> Result<(), ValidationError> {
    match mapping {
        OutputMapping::Single(destination) => check_destination(destination),
        OutputMapping::List(destinations) => {
            destinations.iter().try_for_each(|d| check_destination(d))
        }
        OutputMapping::Keyed(table) => {
            table
                .values()
                .try_for_each(|destinations| match destinations {
                    Destinations::Single(destination) => check_destination(destination),
                    Destinations::List(destinations) => {
                        destinations.iter().try_for_each(|d| check_destination(d))
                    }
                })
        }
    }
}

/// Check a repository URL: `https://github.com/<owner>/<name>` with an optional `.git` suffix.
pub fn validate_repo_url(repo: &str) -> Result<(), ValidationError> {
    let name = repo.strip_suffix(".git").unwrap_or(repo);
    if REPO_URL.is_match(repo) && !name.ends_with('/') {
        Ok(())
    } else {
        Err(ValidationError::RepoInvalid(repo.to_string()))
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    // A workspace folder is a single component under `.dep`
    let inside = match DependencyKind::of(name) {
        DependencyKind::WorkspaceManaged => !name.contains(['/', '\\']),
        DependencyKind::LocalAlias => is_below_root(name),
    };
    if inside {
        Ok(())
    } else {
        Err(ValidationError::NameOutsideProject(name.to_string()))
    }
}

fn check_branch(branch: &str) -> Result<(), ValidationError> {
    if branch.is_empty() {
        Err(ValidationError::BranchEmpty)
    } else {
        Ok(())
    }
}

fn check_destination(destination: &str) -> Result<(), ValidationError> {
    if destination.is_empty() {
        Err(ValidationError::OutEmptyDestination)
    } else if !is_below_root(destination) {
        Err(ValidationError::OutDestinationOutsideProject(
            destination.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Whether `path`, taken relative to the project root, names something strictly below it.
/// Leading separators and `.` components are ignored; any `..` component is refused.
fn is_below_root(path: &str) -> bool {
    let mut depth = 0;
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return false,
            _ => depth += 1,
        }
    }
    depth > 0
}

fn check_list(items: &[Value]) -> Result<(), ValidationError> {
    items.iter().try_for_each(|item| match item {
        Value::String(destination) => check_destination(destination),
        _ => Err(ValidationError::OutListNotStrings),
    })
}


#[cfg(test)]
mod test_repo_url {
    use super::*;

    #[test]
    fn accepts_owner_and_name() {
        for url in [
            "https://github.com/acme/widgets.git",
            "https://github.com/acme/widgets",
            "https://github.com/acme-corp/widgets.rs",
        ] {
            assert!(validate_repo_url(url).is_ok(), "{url}");
        }
    }

    #[test]
    fn rejects_other_forms() {
        for url in [
            "http://github.com/acme/widgets.git",
            "https://github.com/acme",
            "https://github.com/acme/widgets/extra.git",
            "https://github.com/*/widgets.git",
            "https://github.com/acme/.git",
            "https://github.com/acme/widgets/",
            "git@github.com:acme/widgets.git",
            "https://gitlab.example.org/team/tool.git",
            "https://github.com.evil.org/acme/widgets.git",
            "",
        ] {
            assert!(validate_repo_url(url).is_err(), "{url}");
        }
    }
}
