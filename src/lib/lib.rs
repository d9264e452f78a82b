//! Vendor external source trees into your project without a package manager.
//!
//! Dependencies are declared in a JSON registry file (`deps.json` by default). Each one names a
//! git repository and, optionally, a branch and an output mapping saying which parts of the
//! fetched tree are copied where:
//!
//! ```json
//! [
//!     {
//!         "name": "widgets",
//!         "repo": "https://github.com/acme/widgets.git",
//!         "branch": "stable",
//!         "out": { "src/core": "lib/core", "/": ["vendor/widgets"] }
//!     }
//! ]
//! ```
//!
//! Installing a dependency clones it (shallowly) into `.dep/<name>`, or pulls if it was already
//! cloned, then copies each mapped sub-path into its destinations. Uninstalling removes the clone
//! and every destination.
//!
//! # Core Features
//!
//! - Grow an output mapping one destination at a time without losing any earlier destination.
//! - Clone or update dependencies with `git` (which must be installed and available on `PATH`).
//! - Local aliases: a dependency whose name starts with `.` is an existing project folder and is
//!   never cloned or pulled.
//!
//! # Usage
//!
//! Build up an output mapping:
//!
//! ```rust
//! use fetch_deps::{OutputMapping, add_destination, flatten_destinations};
//!
//! let out = add_destination(None, "vendor/widgets", None);
//! assert_eq!(out, OutputMapping::Single("vendor/widgets".into()));
//!
//! let out = add_destination(Some(&out), "lib/core", Some("src/core"));
//! assert_eq!(
//!     flatten_destinations(Some(&out)),
//!     vec!["vendor/widgets".to_string(), "lib/core".to_string()]
//! );
//! ```
//!
//! Declare and install a dependency:
//!
//! ```rust,no_run
//! use fetch_deps::{InstallOptions, Installer, Registry};
//!
//! # fn main() -> Result<(), fetch_deps::Error> {
//! let mut registry = Registry::load("deps.json")?;
//! registry.add("https://github.com/acme/widgets.git", None, None)?;
//! registry.add_output("widgets", "vendor/widgets", None)?;
//! registry.save()?;
//!
//! let installer = Installer::new(std::env::current_dir()?);
//! for dependency in &registry {
//!     for line in installer.install(dependency, InstallOptions::default())? {
//!         println!("{line}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod dependency;
mod error;
pub mod git;
pub mod install;
pub mod mapping;
pub mod registry;
pub mod store;
pub mod validate;

#[doc(inline)]
pub use crate::dependency::{Dependency, DependencyKind, WORKSPACE_DIR, repo_name};
#[doc(inline)]
pub use crate::error::{Error, ValidationError};
#[doc(inline)]
pub use crate::install::{InstallOptions, Installer};
#[doc(inline)]
pub use crate::mapping::{
    Destinations, OutputMapping, add_destination, flatten_destinations, resolve_source_path,
};
#[doc(inline)]
pub use crate::registry::{DEFAULT_REGISTRY_FILE, Registry};
