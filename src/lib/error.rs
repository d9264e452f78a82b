/// Reasons a dependency record or output mapping is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("dependency definition must be an object")]
    RecordNotObject,
    #[error("dependency file content must be an array")]
    RegistryNotArray,
    #[error("dependency is missing a name")]
    NameMissing,
    #[error("dependency name is not a string")]
    NameNotString,
    #[error("dependency name is empty")]
    NameEmpty,
    #[error("dependency name '{0}' must name a folder inside the project")]
    NameOutsideProject(String),
    #[error("dependency is missing a repo")]
    RepoMissing,
    #[error("dependency repo is not a string")]
    RepoNotString,
    #[error("dependency repo '{0}' is not a valid repository URL")]
    RepoInvalid(String),
    #[error("dependency branch is not a string")]
    BranchNotString,
    #[error("dependency branch is empty")]
    BranchEmpty,
    #[error("dependency 'out' must be a string, an array of strings, or an object")]
    OutInvalidShape,
    #[error("dependency 'out' must be an array of strings")]
    OutListNotStrings,
    #[error("dependency 'out' contains an empty destination")]
    OutEmptyDestination,
    #[error("output destination '{0}' must be a path inside the project root")]
    OutDestinationOutsideProject(String),
    #[error("dependency 'out' entry '{key}' must be a string or an array of strings")]
    OutKeyedEntryInvalid { key: String },
}

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("dependency '{identifier}' not found")]
    NotFound { identifier: String },
    #[error("no dependencies declared")]
    NoDependencies,
    #[error("a dependency with the name '{name}' already exists")]
    Duplicate { name: String },
    #[error("failed to copy files from '{name}': source path {} does not exist", path.display())]
    SourceMissing {
        name: String,
        path: std::path::PathBuf,
    },
    #[error("failed to copy files from '{name}' to {}", destination.display())]
    Copy {
        name: String,
        destination: std::path::PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Command '{command}' exited with status {status}\n{output}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        output: String,
    },
    #[error("failed to read or parse dependency file at {}", path.display())]
    RegistryRead {
        path: std::path::PathBuf,
        #[source]
        err: Box<Error>,
    },
    #[error("failed to write dependency file at {}", path.display())]
    RegistryWrite {
        path: std::path::PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found<S: Into<String>>(identifier: S) -> Self {
        Self::NotFound {
            identifier: identifier.into(),
        }
    }

    pub(crate) fn registry_read<P: Into<std::path::PathBuf>>(path: P, err: Error) -> Self {
        Self::RegistryRead {
            path: path.into(),
            err: Box::new(err),
        }
    }
}
