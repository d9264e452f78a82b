//! The registry file: an ordered JSON array of dependency records.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Error;
use crate::dependency::{Dependency, repo_name};
use crate::error::ValidationError;
use crate::mapping::add_destination;
use crate::validate::{validate_dependency, validate_record, validate_repo_url};

/// Name of the registry file used when none is configured.
pub const DEFAULT_REGISTRY_FILE: &str = "deps.json";

/// The declared dependencies, in declaration order, together with the file they were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    path: PathBuf,
    dependencies: Vec<Dependency>,
}

impl Registry {
    /// Load the registry at `path`, writing an empty registry there first if no file exists.
    /// Every stored record must be well-formed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("creating empty dependency file at {}", path.display());
            std::fs::write(path, "[]").map_err(|err| Error::RegistryWrite {
                path: path.to_path_buf(),
                err,
            })?;
        }
        let dependencies = read(path).map_err(|err| Error::registry_read(path, err))?;
        tracing::debug!(
            "loaded {} dependencies from {}",
            dependencies.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            dependencies,
        })
    }

    /// Validate every record and write the registry back to its file.
    pub fn save(&self) -> Result<(), Error> {
        write(&self.path, &self.dependencies)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// The first dependency whose name or repository URL is `identifier`.
    pub fn find(&self, identifier: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.matches(identifier))
    }

    /// The dependencies named by `identifiers` (by name or repository URL), in declaration
    /// order. With no identifiers, every dependency is selected.
    pub fn select<S: AsRef<str>>(&self, identifiers: &[S]) -> Result<Vec<&Dependency>, Error> {
        if self.dependencies.is_empty() {
            return Err(Error::NoDependencies);
        }
        if identifiers.is_empty() {
            return Ok(self.dependencies.iter().collect());
        }
        let selected = self
            .dependencies
            .iter()
            .filter(|d| identifiers.iter().any(|i| d.matches(i.as_ref())))
            .collect::<Vec<_>>();
        if selected.is_empty() {
            let wanted = identifiers
                .iter()
                .map(|i| i.as_ref())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::not_found(wanted));
        }
        Ok(selected)
    }

    /// Declare a new dependency on `repo`, named `name` or after the repository. Nothing is
    /// changed if the record is invalid or the name is already used.
    pub fn add(
        &mut self,
        repo: &str,
        name: Option<&str>,
        branch: Option<&str>,
    ) -> Result<&Dependency, Error> {
        validate_repo_url(repo)?;
        let name = match name {
            Some(name) => name,
            None => repo_name(repo).ok_or(ValidationError::NameMissing)?,
        };
        let mut dependency = Dependency::new(name, repo);
        dependency.branch = branch.map(str::to_string);
        validate_dependency(&dependency)?;
        if self.dependencies.iter().any(|d| d.name == dependency.name) {
            return Err(Error::Duplicate {
                name: dependency.name,
            });
        }
        tracing::info!("adding dependency {dependency}");
        self.dependencies.push(dependency);
        Ok(&self.dependencies[self.dependencies.len() - 1])
    }

    /// Remove every dependency whose name or repository URL is `identifier`, returning them.
    pub fn remove(&mut self, identifier: &str) -> Result<Vec<Dependency>, Error> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.dependencies)
            .into_iter()
            .partition(|d| d.matches(identifier));
        self.dependencies = kept;
        if removed.is_empty() {
            return Err(Error::not_found(identifier));
        }
        tracing::info!("removed {} dependency record(s) for {identifier}", removed.len());
        Ok(removed)
    }

    /// Add `destination` to the output mapping of the dependency named by `identifier`, copying
    /// `sub_path` of its tree there (the whole tree when `None`).
    pub fn add_output(
        &mut self,
        identifier: &str,
        destination: &str,
        sub_path: Option<&str>,
    ) -> Result<&Dependency, Error> {
        let index = self
            .dependencies
            .iter()
            .position(|d| d.matches(identifier))
            .ok_or_else(|| Error::not_found(identifier))?;
        let current = &self.dependencies[index];
        let mut updated = current.clone();
        updated.out = Some(add_destination(current.out.as_ref(), destination, sub_path));
        validate_dependency(&updated)?;
        tracing::info!(
            "{} now outputs to {}",
            updated.name,
            crate::mapping::flatten_destinations(updated.out.as_ref()).join(", ")
        );
        self.dependencies[index] = updated;
        Ok(&self.dependencies[index])
    }
}

impl IntoIterator for Registry {
    type Item = Dependency;
    type IntoIter = std::vec::IntoIter<Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.into_iter()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.iter()
    }
}

fn read(path: &Path) -> Result<Vec<Dependency>, Error> {
    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a file", path.display()),
        )
        .into());
    }
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let records = value.as_array().ok_or(ValidationError::RegistryNotArray)?;
    records
        .iter()
        .map(|record| -> Result<Dependency, Error> {
            validate_record(record)?;
            Ok(serde_json::from_value(record.clone())?)
        })
        .collect()
}

/// Check every record and the uniqueness of names, then replace the file at `path` in one step.
fn write(path: &Path, dependencies: &[Dependency]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for dependency in dependencies {
        validate_dependency(dependency)?;
        if !seen.insert(dependency.name.as_str()) {
            return Err(Error::Duplicate {
                name: dependency.name.clone(),
            });
        }
    }
    let mut content = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
    dependencies.serialize(&mut serializer)?;

    let write_err = |err| Error::RegistryWrite {
        path: path.to_path_buf(),
        err,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(&content).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    // The temporary file is private to its owner; keep the permissions of the file it replaces
    if let Ok(existing) = std::fs::metadata(path) {
        temp_file
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    temp_file.persist(path).map_err(|e| write_err(e.error))?;
    tracing::debug!("wrote {} dependencies to {}", dependencies.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod test_registry {
    use super::*;
    use crate::mapping::OutputMapping;

    const WIDGETS: &str = "https://github.com/acme/widgets.git";

    fn empty_registry(dir: &tempfile::TempDir) -> Registry {
        Registry::load(dir.path().join(DEFAULT_REGISTRY_FILE)).unwrap()
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = empty_registry(&dir);
        assert!(registry.is_empty());
        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn load_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = Registry::load(dir.path());
        assert!(matches!(result, Err(Error::RegistryRead { .. })));
    }

    #[test]
    fn load_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_REGISTRY_FILE);
        std::fs::write(&path, r#"{"name": "widgets"}"#).unwrap();
        match Registry::load(&path) {
            Err(Error::RegistryRead { err, .. }) => assert!(matches!(
                *err,
                Error::Validation(ValidationError::RegistryNotArray)
            )),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_rejects_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_REGISTRY_FILE);
        std::fs::write(&path, r#"[{"name": "widgets", "repo": "not a url"}]"#).unwrap();
        match Registry::load(&path) {
            Err(Error::RegistryRead { err, .. }) => assert!(matches!(
                *err,
                Error::Validation(ValidationError::RepoInvalid(_))
            )),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn add_derives_name_from_repo() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();
        registry.save().unwrap();
        let reloaded = Registry::load(registry.path()).unwrap();
        assert_eq!(reloaded.dependencies(), [Dependency::new("widgets", WIDGETS)]);
    }

    #[test]
    fn add_rejects_duplicate_name_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();
        let result = registry.add("https://github.com/other/widgets", None, None);
        assert!(matches!(result, Err(Error::Duplicate { name }) if name == "widgets"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn add_rejects_invalid_url_and_empty_branch() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        assert!(matches!(
            registry.add("https://github.com/acme", None, None),
            Err(Error::Validation(ValidationError::RepoInvalid(_)))
        ));
        assert!(matches!(
            registry.add(WIDGETS, None, Some("")),
            Err(Error::Validation(ValidationError::BranchEmpty))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn save_rejects_duplicates_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_REGISTRY_FILE);
        let dependencies = vec![
            Dependency::new("widgets", WIDGETS),
            Dependency::new("widgets", "https://github.com/other/widgets.git"),
        ];
        std::fs::write(&path, "[]").unwrap();
        let result = write(&path, &dependencies);
        assert!(matches!(result, Err(Error::Duplicate { name }) if name == "widgets"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn save_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();
        registry.save().unwrap();
        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert!(content.contains("\n        \"name\": \"widgets\""));
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        std::fs::set_permissions(registry.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        registry.add(WIDGETS, None, None).unwrap();
        registry.save().unwrap();

        let mode = std::fs::metadata(registry.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn save_load_round_trip_keeps_mapping_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, Some("main")).unwrap();
        registry.add("https://github.com/acme/gadgets", None, None).unwrap();
        registry.add_output("widgets", "vendor/widgets", None).unwrap();
        registry.add_output("widgets", "lib/core", Some("src/core")).unwrap();
        registry.add_output("gadgets", "a", None).unwrap();
        registry.add_output("gadgets", "b", None).unwrap();
        registry.save().unwrap();

        let loaded = Registry::load(registry.path()).unwrap();
        assert_eq!(loaded.dependencies(), registry.dependencies());
        loaded.save().unwrap();
        let reloaded = Registry::load(registry.path()).unwrap();
        assert_eq!(reloaded, loaded);
    }

    #[test]
    fn output_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();

        let dep = registry.add_output("widgets", "/vendor/widgets", None).unwrap();
        assert_eq!(dep.out, Some(OutputMapping::Single("/vendor/widgets".into())));

        let dep = registry.add_output(WIDGETS, "/lib/widgets", None).unwrap();
        assert_eq!(
            dep.out,
            Some(OutputMapping::List(vec![
                "/vendor/widgets".into(),
                "/lib/widgets".into()
            ]))
        );
    }

    #[test]
    fn output_from_list_to_keyed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_REGISTRY_FILE);
        std::fs::write(
            &path,
            format!(r#"[{{"name": "widgets", "repo": "{WIDGETS}", "out": ["/vendor/widgets"]}}]"#),
        )
        .unwrap();
        let mut registry = Registry::load(&path).unwrap();
        registry.add_output("widgets", "/lib/core", Some("src/core")).unwrap();
        registry.save().unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            saved[0]["out"],
            serde_json::json!({"src/core": "/lib/core", "/": ["/vendor/widgets"]})
        );
    }

    #[test]
    fn output_rejects_empty_destination_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();
        let result = registry.add_output("widgets", "", None);
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::OutEmptyDestination))
        ));
        assert_eq!(registry.find("widgets").unwrap().out, None);
    }

    #[test]
    fn output_on_unknown_dependency_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        let result = registry.add_output("widgets", "vendor", None);
        assert!(matches!(result, Err(Error::NotFound { identifier }) if identifier == "widgets"));
    }

    #[test]
    fn remove_by_name_or_repo() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        registry.add(WIDGETS, None, None).unwrap();
        registry.add(WIDGETS, Some("widgets-fork"), None).unwrap();
        registry.add("https://github.com/acme/gadgets", None, None).unwrap();
        let removed = registry.remove(WIDGETS).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.remove("widgets"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn select_by_identifier_in_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = empty_registry(&dir);
        assert!(matches!(
            registry.select::<&str>(&[]),
            Err(Error::NoDependencies)
        ));
        registry.add(WIDGETS, None, None).unwrap();
        registry.add("https://github.com/acme/gadgets", None, None).unwrap();
        let all = registry.select::<&str>(&[]).unwrap();
        assert_eq!(all.len(), 2);
        let picked = registry.select(&["gadgets", WIDGETS]).unwrap();
        let names = picked.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["widgets", "gadgets"]);
        assert!(matches!(
            registry.select(&["nothing"]),
            Err(Error::NotFound { .. })
        ));
    }
}
