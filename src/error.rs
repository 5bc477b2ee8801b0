//! Error taxonomy for the install and launch flows.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the bootstrapper.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Exit code used when the user interrupts a prompt or a child process.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Everything that can stop the bootstrap.
///
/// Only fatal conditions are represented here. Non-fatal conditions (a missing
/// template, an optional library that could not be installed) are reported as
/// warnings by the component that hits them and never become an error value.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A required tool is missing or too old.
    #[error("{tool} {problem}")]
    Environment {
        /// Display name of the tool, e.g. `Python`.
        tool: String,
        /// What is wrong, including the minimum version when relevant.
        problem: String,
        /// Suggested fix shown under the error.
        hint: Option<String>,
    },

    /// The isolated environment could not be created or activated.
    #[error("isolated environment at {}: {reason}", path.display())]
    Provisioning { path: PathBuf, reason: String },

    /// The package manager returned a failure.
    #[error("dependency installation failed ({reason}); check {}", manifest.display())]
    Installation { manifest: PathBuf, reason: String },

    /// The tool settings or the configuration file could not be used.
    #[error("configuration error in {}: {reason}", path.display())]
    Configuration { path: PathBuf, reason: String },

    /// A library required for core functionality is not installed.
    #[error("required library `{module}` is not available ({purpose})")]
    MissingDependency { module: String, purpose: String },

    /// The user interrupted a prompt or a running child.
    #[error("interrupted")]
    Interrupted,

    /// A program could not be started.
    #[error("failed to execute {program}: {reason}")]
    Exec { program: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }

    /// Remediation text printed below the error, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            BootstrapError::Environment { hint, .. } => hint.as_deref(),
            BootstrapError::MissingDependency { .. } => {
                Some("Run surf-install to reinstall the dependencies")
            }
            _ => None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            context: context.into(),
            source,
        }
    }
}
