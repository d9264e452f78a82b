use std::path::Path;
use std::process::Command;

use fetch_deps::{
    Dependency, Destinations, Error, InstallOptions, Installer, OutputMapping, add_destination,
    git::{Git, VersionControl},
};
use tempfile::tempdir;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

/// Create an upstream repository with a couple of commits on `main` and a `stable` branch,
/// returning its `file://` URL.
fn make_upstream(dir: &Path) -> String {
    std::fs::create_dir_all(dir.join("src/core")).unwrap();
    git(dir, &["init", "--quiet", "--initial-branch=main"]);
    std::fs::write(dir.join("README.md"), "widgets\n").unwrap();
    std::fs::write(dir.join("src/core/lib.c"), "int widget(void);\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", "initial"]);
    git(dir, &["branch", "stable"]);
    format!("file://{}", dir.display())
}

fn widgets(url: &str) -> Dependency {
    let mut dependency = Dependency::new("widgets", url);
    let out = add_destination(None, "vendor/widgets", None);
    dependency.out = Some(add_destination(Some(&out), "lib/core", Some("src/core")));
    dependency
}

#[test]
fn test_clone_and_switch_branch() {
    let upstream = tempdir().unwrap();
    let url = make_upstream(upstream.path());
    let workspace = tempdir().unwrap();
    let into = workspace.path().join(".dep/widgets");

    Git.clone_repo(&url, &into, Some("stable")).unwrap();
    assert!(into.join("README.md").is_file());
    assert!(into.join(".git").is_dir());
    Git.switch(&into, "stable").unwrap();
}

fn current_branch(repo: &Path) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .unwrap();
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn test_pull_switches_to_branch_not_cloned() {
    let upstream = tempdir().unwrap();
    let url = make_upstream(upstream.path());
    let workspace = tempdir().unwrap();
    let into = workspace.path().join(".dep/widgets");
    Git.clone_repo(&url, &into, None).unwrap();
    assert_eq!(current_branch(&into), "main");

    git(upstream.path(), &["switch", "--quiet", "stable"]);
    std::fs::write(upstream.path().join("STABLE.md"), "stable\n").unwrap();
    git(upstream.path(), &["add", "."]);
    git(upstream.path(), &["commit", "--quiet", "-m", "stable only"]);
    git(upstream.path(), &["switch", "--quiet", "main"]);

    Git.pull(&into, Some("stable")).unwrap();
    assert_eq!(current_branch(&into), "stable");
    assert!(into.join("STABLE.md").is_file());

    // Later updates find the branch already present
    Git.pull(&into, Some("stable")).unwrap();
    assert_eq!(current_branch(&into), "stable");
}

#[test]
fn test_clone_unknown_branch_fails() {
    let upstream = tempdir().unwrap();
    let url = make_upstream(upstream.path());
    let workspace = tempdir().unwrap();

    let result = Git.clone_repo(&url, &workspace.path().join("widgets"), Some("no-such-branch"));
    match result {
        Err(Error::Subprocess { command, .. }) => {
            assert!(command.starts_with("git clone --depth 1 --no-tags --branch no-such-branch"));
        }
        other => panic!("expected a subprocess error, got {other:?}"),
    }
}

#[test]
fn test_install_update_and_uninstall() {
    let upstream = tempdir().unwrap();
    let url = make_upstream(upstream.path());
    let workspace = tempdir().unwrap();
    let root = workspace.path();
    let installer = Installer::new(root);
    let dependency = widgets(&url);

    let log = installer
        .install(&dependency, InstallOptions::default())
        .unwrap();
    assert!(log[0].starts_with("Cloning file://"));
    assert!(log.contains(&"Copying .dep/widgets/src/core to lib/core".to_string()));
    assert!(root.join(".dep/widgets/.git").is_dir());
    assert!(root.join("vendor/widgets/src/core/lib.c").is_file());
    assert!(!root.join("vendor/widgets/.git").exists());
    assert!(root.join("lib/core/lib.c").is_file());

    // A new upstream commit arrives with the next install
    std::fs::write(upstream.path().join("CHANGES.md"), "v2\n").unwrap();
    git(upstream.path(), &["add", "."]);
    git(upstream.path(), &["commit", "--quiet", "-m", "second"]);
    let log = installer
        .install(&dependency, InstallOptions::default())
        .unwrap();
    assert!(log[0].starts_with("Updating "));
    assert!(root.join("vendor/widgets/CHANGES.md").is_file());

    installer
        .install(&dependency, InstallOptions { force: true })
        .unwrap();
    assert!(root.join("vendor/widgets/CHANGES.md").is_file());

    installer.uninstall(&dependency).unwrap();
    assert!(!root.join(".dep/widgets").exists());
    assert!(!root.join("vendor/widgets").exists());
    assert!(!root.join("lib/core").exists());
}

#[test]
fn test_install_missing_sub_path_fails() {
    let upstream = tempdir().unwrap();
    let url = make_upstream(upstream.path());
    let workspace = tempdir().unwrap();
    let mut dependency = Dependency::new("widgets", url.as_str());
    dependency.out = Some(OutputMapping::Keyed(
        [(
            "docs".to_string(),
            Destinations::Single("vendor/docs".to_string()),
        )]
        .into(),
    ));

    let result = Installer::new(workspace.path()).install(&dependency, InstallOptions::default());
    assert!(matches!(result, Err(Error::SourceMissing { .. })));
    assert!(workspace.path().join(".dep/widgets/README.md").is_file());
    assert!(!workspace.path().join("vendor/docs").exists());
}
