use std::process::ExitCode;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Argument validation errors
    ArgValidation,
    /// General IO errors
    IO,
    /// Errors reading, changing or writing the dependency file
    Registry,
    /// A dependency failed to install
    Install,
    /// A dependency failed to uninstall
    Uninstall,
    /// The dependency list could not be formatted
    Format,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Registry(fetch_deps::Error),
    #[error("failed to install '{name}'")]
    Install {
        name: String,
        #[source]
        err: fetch_deps::Error,
    },
    #[error("failed to uninstall '{name}'")]
    Uninstall {
        name: String,
        #[source]
        err: fetch_deps::Error,
    },
    #[error("failed to format dependency list: {0}")]
    Format(String),
}

/// The main application-level error type. Each variant adds what the application was doing when
/// the underlying error happened, and the kind selects the exit code.
///
/// This type uses the newtype pattern to wrap a boxed inner error, reducing stack size.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    /// Create a new AppError with the given inner error and kind
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    /// Get the error kind for pattern matching
    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    /// Create an argument validation error
    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    /// Create an install error for the named dependency
    pub fn install(name: String, err: fetch_deps::Error) -> Self {
        Self::new(AppErrorInner::Install { name, err }, AppErrorKind::Install)
    }

    /// Create an uninstall error for the named dependency
    pub fn uninstall(name: String, err: fetch_deps::Error) -> Self {
        Self::new(AppErrorInner::Uninstall { name, err }, AppErrorKind::Uninstall)
    }

    /// Create a list formatting error
    pub fn format<E: std::fmt::Display>(err: E) -> Self {
        Self::new(AppErrorInner::Format(err.to_string()), AppErrorKind::Format)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(AppErrorInner::IO(err), AppErrorKind::IO)
    }
}

impl From<fetch_deps::Error> for AppError {
    fn from(err: fetch_deps::Error) -> Self {
        Self::new(AppErrorInner::Registry(err), AppErrorKind::Registry)
    }
}

impl From<AppError> for ExitCode {
    fn from(error: AppError) -> Self {
        ExitCode::from(match error.error_kind() {
            AppErrorKind::ArgValidation => 2,
            _ => 1,
        })
    }
}
