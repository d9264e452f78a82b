//! Clone and update dependency trees with the `git` executable.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::Error;

/// The version-control operations the installer needs. Each returns the tool's combined output.
pub trait VersionControl: Sync {
    /// Clone `url` into `into`, checking out `branch` if given.
    fn clone_repo(&self, url: &str, into: &Path, branch: Option<&str>) -> Result<String, Error>;

    /// Update the working tree at `repo`, first switching to `branch` if given. The branch need
    /// not have been fetched before.
    fn pull(&self, repo: &Path, branch: Option<&str>) -> Result<String, Error>;

    /// Switch the working tree at `repo` to `reference`.
    fn switch(&self, repo: &Path, reference: &str) -> Result<String, Error>;
}

/// Runs `git` as a subprocess. Requires `git` to be installed and available on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git;

impl Git {
    fn clone_repo_subprocess(url: &str, into: &Path, branch: Option<&str>) -> Command {
        let mut git = Command::new("git");
        git.args(["clone", "--depth", "1", "--no-tags"]);
        if let Some(branch) = branch {
            git.args(["--branch", branch]);
        }
        git.arg(url).arg(into);
        git
    }

    // Fetch into the remote-tracking ref so that `switch` can create the local branch
    fn fetch_branch_subprocess(repo: &Path, branch: &str) -> Command {
        let mut git = Self::in_repo(repo);
        git.args(["fetch", "--depth", "1", "--no-tags", "origin"])
            .arg(format!("+refs/heads/{branch}:refs/remotes/origin/{branch}"));
        git
    }

    fn in_repo(repo: &Path) -> Command {
        let mut git = Command::new("git");
        git.arg("-C").arg(repo);
        git
    }

    fn run(mut command: Command) -> Result<String, Error> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        let shown = describe(&command);
        tracing::debug!("running {shown}");
        let output = command.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() {
            Ok(format!("{stdout}{stderr}").trim().to_string())
        } else {
            let output_text = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(Error::Subprocess {
                command: shown,
                status: output.status,
                output: output_text.trim().to_string(),
            })
        }
    }
}

impl VersionControl for Git {
    fn clone_repo(&self, url: &str, into: &Path, branch: Option<&str>) -> Result<String, Error> {
        if let Some(parent) = into.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::run(Self::clone_repo_subprocess(url, into, branch))
    }

    fn pull(&self, repo: &Path, branch: Option<&str>) -> Result<String, Error> {
        let mut log = Vec::new();
        let mut git = Self::in_repo(repo);
        git.arg("pull");
        if let Some(branch) = branch {
            // A shallow clone only tracks the branch it was cloned with
            log.push(Self::run(Self::fetch_branch_subprocess(repo, branch))?);
            log.push(self.switch(repo, branch)?);
            git.args(["origin", branch]);
        }
        log.push(Self::run(git)?);
        Ok(log
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn switch(&self, repo: &Path, reference: &str) -> Result<String, Error> {
        let mut git = Self::in_repo(repo);
        git.args(["switch", reference]);
        Self::run(git)
    }
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test_git_commands {
    use super::*;

    #[test]
    fn clone_command_with_branch() {
        let command = Git::clone_repo_subprocess(
            "https://github.com/acme/widgets.git",
            Path::new(".dep/widgets"),
            Some("stable"),
        );
        assert_eq!(
            describe(&command),
            "git clone --depth 1 --no-tags --branch stable https://github.com/acme/widgets.git .dep/widgets"
        );
    }

    #[test]
    fn clone_command_without_branch() {
        let command = Git::clone_repo_subprocess(
            "https://github.com/acme/widgets.git",
            Path::new("my deps/widgets"),
            None,
        );
        let args = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(args.last().map(String::as_str), Some("my deps/widgets"));
        assert!(!args.iter().any(|a| a == "--branch"));
    }

    #[test]
    fn branch_is_fetched_into_remote_tracking_ref() {
        let command = Git::fetch_branch_subprocess(Path::new(".dep/widgets"), "stable");
        assert_eq!(
            describe(&command),
            "git -C .dep/widgets fetch --depth 1 --no-tags origin +refs/heads/stable:refs/remotes/origin/stable"
        );
    }

    #[test]
    fn failed_command_reports_status_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = Git.switch(dir.path(), "no-such-branch");
        match result {
            Err(Error::Subprocess {
                command, status, ..
            }) => {
                assert!(command.starts_with("git -C"));
                assert!(!status.success());
            }
            // git not installed
            Err(Error::Io(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
