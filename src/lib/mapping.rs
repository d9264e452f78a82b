//! Output mappings: where the files of a fetched dependency are copied to.
//!
//! A mapping takes one of three shapes:
//!
//! - a single destination: `"out": "vendor/widgets"`
//! - a list of destinations: `"out": ["vendor/widgets", "lib/widgets"]`
//! - a table keyed by a sub-path of the fetched tree, each value being a single destination or a
//!   list of destinations: `"out": { "src/core": "lib/core", "/": ["vendor/widgets"] }`
//!
//! The key `/` stands for the whole fetched tree. Tables never nest, and their entries keep the
//! order they were written in.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// The key of a keyed mapping which selects the whole fetched tree.
pub const ROOT_KEY: &str = "/";

/// The sub-path used when a mapping does not select part of the fetched tree.
pub const WILDCARD: &str = "*";

/// The destinations recorded for one source sub-path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Destinations {
    Single(String),
    List(Vec<String>),
}

impl Destinations {
    /// Append a destination, promoting a single destination to a list.
    pub fn push(self, destination: &str) -> Self {
        match self {
            Self::Single(current) => Self::List(vec![current, destination.to_string()]),
            Self::List(mut current) => {
                current.push(destination.to_string());
                Self::List(current)
            }
        }
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(destination) => std::slice::from_ref(destination),
            Self::List(destinations) => destinations,
        }
    }
}

impl From<Destinations> for OutputMapping {
    fn from(destinations: Destinations) -> Self {
        match destinations {
            Destinations::Single(destination) => Self::Single(destination),
            Destinations::List(destinations) => Self::List(destinations),
        }
    }
}

/// The `out` property of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum OutputMapping {
    Single(String),
    List(Vec<String>),
    Keyed(IndexMap<String, Destinations>),
}

fn is_root(sub_path: &str) -> bool {
    sub_path.is_empty() || sub_path == ROOT_KEY
}

/// Record `destination` as a new output for `sub_path` (the whole tree when `None` or `/`).
///
/// Existing destinations are always kept: a single destination grows into a list, and a
/// single destination or list is moved under the `/` key when a sub-path is first given.
pub fn add_destination(
    current: Option<&OutputMapping>,
    destination: &str,
    sub_path: Option<&str>,
) -> OutputMapping {
    use OutputMapping::*;
    let sub_path = sub_path.filter(|s| !is_root(s));
    let single = || Destinations::Single(destination.to_string());
    match (current, sub_path) {
        (None, None) => Single(destination.to_string()),
        (None, Some(key)) => Keyed(IndexMap::from([(key.to_string(), single())])),
        (Some(Single(previous)), None) => List(vec![previous.clone(), destination.to_string()]),
        (Some(List(previous)), None) => {
            let mut destinations = previous.clone();
            destinations.push(destination.to_string());
            List(destinations)
        }
        (Some(Single(previous)), Some(key)) => Keyed(IndexMap::from([
            (key.to_string(), single()),
            (ROOT_KEY.to_string(), Destinations::Single(previous.clone())),
        ])),
        (Some(List(previous)), Some(key)) => Keyed(IndexMap::from([
            (key.to_string(), single()),
            (ROOT_KEY.to_string(), Destinations::List(previous.clone())),
        ])),
        (Some(Keyed(table)), key) => {
            let key = key.unwrap_or(ROOT_KEY);
            let mut table = table.clone();
            match table.get_mut(key) {
                Some(existing) => *existing = existing.clone().push(destination),
                None => {
                    table.insert(key.to_string(), single());
                }
            }
            Keyed(table)
        }
    }
}

impl OutputMapping {
    /// Every destination named anywhere in the mapping, in mapping order.
    pub fn destinations(&self) -> Vec<String> {
        match self {
            Self::Single(destination) => vec![destination.clone()],
            Self::List(destinations) => destinations.clone(),
            Self::Keyed(table) => table
                .values()
                .flat_map(|d| d.as_slice().iter().cloned())
                .collect(),
        }
    }

    /// Pair each source sub-path with the destinations it is copied to. Unkeyed mappings copy
    /// the whole fetched tree.
    pub fn copy_plan(&self) -> Vec<(&str, &[String])> {
        match self {
            Self::Single(destination) => vec![(WILDCARD, std::slice::from_ref(destination))],
            Self::List(destinations) => vec![(WILDCARD, destinations.as_slice())],
            Self::Keyed(table) => table
                .iter()
                .map(|(key, d)| (key.as_str(), d.as_slice()))
                .collect(),
        }
    }
}

/// Flatten an optional mapping into the full list of destination paths it names.
pub fn flatten_destinations(mapping: Option<&OutputMapping>) -> Vec<String> {
    mapping.map(OutputMapping::destinations).unwrap_or_default()
}

/// Join a dependency folder and a sub-path into a single source path with spaces escaped, as
/// reported to the user and suitable for a shell.
pub fn resolve_source_path(folder: &str, sub_path: Option<&str>) -> String {
    let sub_path = sub_path.unwrap_or(WILDCARD);
    let sub_path = sub_path.strip_prefix('/').unwrap_or(sub_path);
    let folder = folder.strip_suffix('/').unwrap_or(folder);
    format!("{folder}/{sub_path}").replace(' ', "\\ ")
}

/// The filesystem path selected by `sub_path` inside `folder`. The wildcard and the root key
/// select `folder` itself; a trailing `/*` selects the directory it follows.
pub fn source_path(folder: &Path, sub_path: &str) -> PathBuf {
    let trimmed = sub_path.trim_start_matches('/');
    let trimmed = trimmed
        .strip_suffix(WILDCARD)
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    if trimmed.is_empty() {
        folder.to_path_buf()
    } else {
        folder.join(trimmed)
    }
}
