//! Filesystem operations used to place and remove dependency files.

use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Version-control metadata which is never copied out of a fetched tree.
const SKIPPED: &str = ".git";

pub trait FileStore: Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Copy `src` to `dst`, overwriting existing files. A directory's entries are merged into
    /// `dst`, which is created if needed.
    fn copy_recursive(&self, src: &Path, dst: &Path) -> io::Result<()>;

    fn remove_recursive(&self, path: &Path) -> io::Result<()>;

    fn make_dirs(&self, path: &Path) -> io::Result<()>;
}

/// [`FileStore`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy_recursive(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if !src.is_dir() {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(src, dst)?;
            return Ok(());
        }
        std::fs::create_dir_all(dst)?;
        let entries = WalkDir::new(src)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != SKIPPED);
        for entry in entries {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| io::Error::other(e.to_string()))?;
            let target = dst.join(relative);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                std::fs::create_dir_all(&target)?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    fn remove_recursive(&self, path: &Path) -> io::Result<()> {
        let metadata = path.symlink_metadata()?;
        if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    fn make_dirs(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = std::fs::read_link(src)?;
    if dst.symlink_metadata().is_ok() {
        std::fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}
