//! Error taxonomy shared by providers, the build pipeline and the commands.

use std::fmt;
use std::time::Duration;

use crate::config::ConfigError;
use crate::process::SpawnError;
use thiserror::Error;

/// Errors raised while building or managing images.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OpsError {
    /// Raised when configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when neither CLI arguments nor configuration name a program.
    #[error("please mention program to run")]
    MissingProgram,
    /// Raised when a `--mounts` entry is not a `volume:path` pair or the
    /// volume cannot be located.
    #[error("invalid mount '{spec}': {reason}")]
    InvalidMount {
        /// Mount specification as supplied by the operator.
        spec: String,
        /// Why the specification was rejected.
        reason: String,
    },
    /// Raised when the platform identifier matches no known provider.
    #[error("unknown platform '{0}'; expected one of onprem, aws, gcp, do, vultr, azure, vsphere")]
    UnknownPlatform(String),
    /// Wrapper for failures reported by a provider call.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider tooling.
        message: String,
    },
    /// Raised when a bounded poll runs out of attempts.
    #[error("{operation} timed out after {elapsed} ({attempts} attempts)")]
    Timeout {
        /// Operation being waited on.
        operation: String,
        /// Number of polls performed.
        attempts: u32,
        /// Wall-clock time spent waiting.
        elapsed: Elapsed,
    },
    /// Raised when a provider task reaches a failure state.
    #[error("{operation} failed with status '{status}'")]
    TaskFailed {
        /// Operation being waited on.
        operation: String,
        /// Terminal status reported by the provider.
        status: String,
    },
    /// Raised when a named resource does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind (for example `image`).
        kind: String,
        /// Name used for the lookup.
        name: String,
    },
    /// Raised when a backend structurally cannot perform an operation.
    #[error("operation not supported: {0}")]
    Unsupported(String),
    /// Raised when a capability exists in the command surface but has no
    /// implementation for the selected backend yet.
    #[error("{0} not yet implemented")]
    NotImplemented(String),
    /// Raised when the image builder fails.
    #[error("image build failed: {0}")]
    Build(String),
    /// Raised when object storage operations fail.
    #[error("object storage error: {0}")]
    Storage(String),
    /// Raised when a package cannot be located or parsed.
    #[error("package error: {0}")]
    Package(String),
    /// Raised when no local hypervisor executable is installed.
    #[error("no hypervisor found on PATH")]
    NoHypervisor,
    /// Raised when a hypervisor fails to start the VM.
    #[error("hypervisor error: {0}")]
    Hypervisor(String),
    /// Raised when local file system access fails.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Operating system error message.
        message: String,
    },
}

impl OpsError {
    /// Builds a [`OpsError::NotFound`] for an image name.
    #[must_use]
    pub fn image_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: String::from("image"),
            name: name.to_owned(),
        }
    }

    /// Returns `true` for the errors raised before any provider is contacted.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingProgram
                | Self::InvalidMount { .. }
                | Self::UnknownPlatform(_)
        )
    }
}

impl From<ConfigError> for OpsError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<SpawnError> for OpsError {
    fn from(value: SpawnError) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

/// Wall-clock duration rendered as minutes and seconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Elapsed(pub Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        write!(f, "{}m{:02}s", secs.div_euclid(60), secs.rem_euclid(60))
    }
}
