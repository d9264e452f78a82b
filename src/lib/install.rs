//! Install and uninstall dependencies: fetch their trees and copy the mapped paths.
//!
//! Installing a dependency clones it into its local folder, or pulls if the folder already
//! exists, then copies each mapped source path into its destinations. Uninstalling removes the
//! local folder and every destination named by the mapping. Both operations work from
//! [`Installer::managed_paths`], so whatever an install creates is what an uninstall removes.
//! Neither runs for a dependency whose folder or destinations would leave the project root.

use std::path::{Path, PathBuf};

use crate::Error;
use crate::dependency::{Dependency, DependencyKind};
use crate::git::{Git, VersionControl};
use crate::mapping::{flatten_destinations, resolve_source_path, source_path};
use crate::store::{FileStore, LocalFileStore};
use crate::validate::validate_paths;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Remove any existing local folder and destinations and clone afresh instead of pulling.
    pub force: bool,
}

/// Installs dependencies relative to a project root.
#[derive(Debug, Clone)]
pub struct Installer<V = Git, F = LocalFileStore> {
    root: PathBuf,
    vcs: V,
    files: F,
}

impl Installer {
    /// An installer using `git` and the local filesystem.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_collaborators(root, Git, LocalFileStore)
    }
}

impl<V: VersionControl, F: FileStore> Installer<V, F> {
    pub fn with_collaborators<P: Into<PathBuf>>(root: P, vcs: V, files: F) -> Self {
        Self {
            root: root.into(),
            vcs,
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The absolute location of the dependency's tree.
    pub fn local_folder(&self, dependency: &Dependency) -> PathBuf {
        self.root.join(dependency.local_folder())
    }

    /// Destinations are relative to the project root, even when written with a leading `/`.
    pub fn destination(&self, destination: &str) -> PathBuf {
        self.root.join(destination.trim_start_matches(['/', '\\']))
    }

    /// Every location an install of `dependency` creates: its local folder (unless it is a local
    /// alias, which install never creates) followed by each mapped destination.
    pub fn managed_paths(&self, dependency: &Dependency) -> Vec<PathBuf> {
        let folder = match dependency.kind() {
            DependencyKind::WorkspaceManaged => Some(self.local_folder(dependency)),
            DependencyKind::LocalAlias => None,
        };
        folder
            .into_iter()
            .chain(
                flatten_destinations(dependency.out.as_ref())
                    .iter()
                    .map(|d| self.destination(d)),
            )
            .collect()
    }

    /// Fetch `dependency` and copy its mapped files. Returns a report of each step in order.
    /// The first failure stops the install; copies already made are left in place.
    pub fn install(
        &self,
        dependency: &Dependency,
        options: InstallOptions,
    ) -> Result<Vec<String>, Error> {
        let mut log = Vec::new();
        self.install_logged(dependency, options, &mut log)?;
        Ok(log)
    }

    /// As [`Installer::install`], appending each step to `log` as it happens, so the steps
    /// completed before a failure can still be reported.
    pub fn install_logged(
        &self,
        dependency: &Dependency,
        options: InstallOptions,
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        validate_paths(dependency)?;
        tracing::info!("installing {}", dependency.name);
        self.fetch(dependency, options, log)?;
        if let Some(out) = &dependency.out {
            for (sub_path, destinations) in out.copy_plan() {
                self.copy_out(dependency, sub_path, destinations, log)?;
            }
        }
        tracing::info!("installed {}", dependency.name);
        Ok(())
    }

    /// Remove the dependency's local folder and every destination in its mapping. Paths which do
    /// not exist are skipped.
    pub fn uninstall(&self, dependency: &Dependency) -> Result<Vec<String>, Error> {
        let mut log = Vec::new();
        self.uninstall_logged(dependency, &mut log)?;
        Ok(log)
    }

    pub fn uninstall_logged(
        &self,
        dependency: &Dependency,
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        validate_paths(dependency)?;
        tracing::info!("uninstalling {}", dependency.name);
        for path in self.managed_paths(dependency) {
            if !self.files.exists(&path) {
                tracing::debug!("skipping missing {}", path.display());
                continue;
            }
            log.push(format!("Removing {}", path.display()));
            self.files.remove_recursive(&path)?;
        }
        Ok(())
    }

    fn fetch(
        &self,
        dependency: &Dependency,
        options: InstallOptions,
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        let folder = self.local_folder(dependency);
        if dependency.is_local_alias() {
            tracing::warn!(
                "{} is a local folder, skipping clone and pull",
                dependency.name
            );
            if !self.files.exists(&folder) {
                return Err(Error::SourceMissing {
                    name: dependency.name.clone(),
                    path: folder,
                });
            }
            log.push(format!("Using local folder {}", folder.display()));
            return Ok(());
        }
        if self.files.exists(&folder) {
            if !options.force {
                log.push(format!("Updating {}", folder.display()));
                push_output(log, self.vcs.pull(&folder, dependency.branch.as_deref())?);
                return Ok(());
            }
            self.uninstall_logged(dependency, log)?;
        }
        log.push(format!("Cloning {} into {}", dependency.repo, folder.display()));
        push_output(
            log,
            self.vcs
                .clone_repo(&dependency.repo, &folder, dependency.branch.as_deref())?,
        );
        Ok(())
    }

    fn copy_out(
        &self,
        dependency: &Dependency,
        sub_path: &str,
        destinations: &[String],
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        let folder = self.local_folder(dependency);
        let src = source_path(&folder, sub_path);
        if !self.files.exists(&src) {
            return Err(Error::SourceMissing {
                name: dependency.name.clone(),
                path: src,
            });
        }
        let shown = resolve_source_path(
            &dependency.local_folder().to_string_lossy(),
            Some(sub_path),
        );
        for destination in destinations {
            let dst = self.destination(destination);
            if !self.files.exists(&dst) {
                let to_create = if self.files.is_file(&src) {
                    dst.parent()
                } else {
                    Some(dst.as_path())
                };
                if let Some(dir) = to_create {
                    self.files.make_dirs(dir)?;
                }
            }
            log.push(format!("Copying {shown} to {destination}"));
            tracing::debug!("copying {} to {}", src.display(), dst.display());
            self.files
                .copy_recursive(&src, &dst)
                .map_err(|err| Error::Copy {
                    name: dependency.name.clone(),
                    destination: dst.clone(),
                    err,
                })?;
        }
        Ok(())
    }
}

fn push_output(log: &mut Vec<String>, output: String) {
    if !output.is_empty() {
        log.push(output);
    }
}
