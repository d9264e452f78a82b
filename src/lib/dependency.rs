//! Dependency records and where their fetched trees live on disk.

use std::path::PathBuf;

use crate::mapping::OutputMapping;

/// Directory under the project root holding one clone per workspace-managed dependency.
pub const WORKSPACE_DIR: &str = ".dep";

/// A declared external source: one entry of the registry file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Dependency {
    pub name: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<OutputMapping>,
}

/// How a dependency's local folder is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Cloned into its own folder under [`WORKSPACE_DIR`].
    WorkspaceManaged,
    /// The name is itself a project-relative path to an existing tree. No clone or pull is done.
    LocalAlias,
}

impl DependencyKind {
    /// A name starting with `.` or a path separator is a path to an existing project folder.
    pub fn of(name: &str) -> Self {
        if name.starts_with(['.', '/', '\\']) {
            Self::LocalAlias
        } else {
            Self::WorkspaceManaged
        }
    }
}

impl Dependency {
    pub fn new<S: Into<String>>(name: S, repo: S) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            branch: None,
            out: None,
        }
    }

    pub fn kind(&self) -> DependencyKind {
        DependencyKind::of(&self.name)
    }

    pub fn is_local_alias(&self) -> bool {
        self.kind() == DependencyKind::LocalAlias
    }

    /// The folder holding this dependency's tree, relative to the project root.
    pub fn local_folder(&self) -> PathBuf {
        match self.kind() {
            DependencyKind::LocalAlias => PathBuf::from(self.name.trim_start_matches(['/', '\\'])),
            DependencyKind::WorkspaceManaged => PathBuf::from(WORKSPACE_DIR).join(&self.name),
        }
    }

    /// Whether `identifier` names this dependency, either by name or by repository URL.
    pub fn matches(&self, identifier: &str) -> bool {
        self.name == identifier || self.repo == identifier
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.repo)?;
        if let Some(branch) = &self.branch {
            write!(f, " (branch: {branch})")?;
        }
        if self.is_local_alias() {
            write!(f, " [local]")?;
        }
        Ok(())
    }
}

/// The default dependency name for a repository URL: its last path segment without `.git`.
pub fn repo_name(repo: &str) -> Option<&str> {
    let last = repo.rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then_some(name)
}
