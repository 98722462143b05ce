//! Tool settings loaded via `ortho-config`.

use std::env;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::ConfigError;

const IMAGES_DIR: &str = "images";
const VOLUMES_DIR: &str = "volumes";
const PACKAGES_DIR: &str = "packages";

/// Settings that locate external tools and local state directories. Values
/// merge defaults, configuration files and `OPS_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "OPS")]
pub struct OpsSettings {
    /// AWS command-line client used for EC2 and S3 calls.
    #[ortho_config(default = "aws".to_owned())]
    pub aws_bin: String,
    /// Image builder invoked to produce raw disk images.
    #[ortho_config(default = "mkimage".to_owned())]
    pub builder_bin: String,
    /// Root of the local state tree. Defaults to `$HOME/.ops`.
    pub home_dir: Option<String>,
    /// Region used when neither the config nor `--zone` names one.
    pub default_zone: Option<String>,
}

/// Metadata for a settings field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    key: &'static str,
}

impl OpsSettings {
    /// Loads settings without attempting to parse CLI arguments. Values still
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Settings`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("unikops")])
            .map_err(|err| ConfigError::Settings(err.to_string()))
    }

    /// Settings rooted at `home`, with default tool names. Used by tests and
    /// embedders that manage their own state directory.
    #[must_use]
    pub fn with_home(home: impl Into<String>) -> Self {
        Self {
            aws_bin: String::from("aws"),
            builder_bin: String::from("mkimage"),
            home_dir: Some(home.into()),
            default_zone: None,
        }
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to unikops settings",
                metadata.description, metadata.env_var, metadata.key
            )));
        }
        Ok(())
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a tool name is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.aws_bin,
            &FieldMetadata {
                description: "AWS command-line client",
                env_var: "OPS_AWS_BIN",
                key: "aws_bin",
            },
        )?;
        Self::require_field(
            &self.builder_bin,
            &FieldMetadata {
                description: "image builder",
                env_var: "OPS_BUILDER_BIN",
                key: "builder_bin",
            },
        )
    }

    /// Resolves the local state root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when neither `home_dir` nor
    /// `$HOME` is available.
    pub fn home(&self) -> Result<Utf8PathBuf, ConfigError> {
        if let Some(dir) = self.home_dir.as_deref().filter(|dir| !dir.trim().is_empty()) {
            return Ok(Utf8PathBuf::from(dir.trim()));
        }
        let home = env::var("HOME").map_err(|_| {
            ConfigError::MissingField(String::from(
                "missing state directory: set OPS_HOME_DIR or HOME",
            ))
        })?;
        Ok(Utf8PathBuf::from(home).join(".ops"))
    }

    /// Directory holding built disk images.
    ///
    /// # Errors
    ///
    /// Propagates [`OpsSettings::home`] failures.
    pub fn images_dir(&self) -> Result<Utf8PathBuf, ConfigError> {
        Ok(self.home()?.join(IMAGES_DIR))
    }

    /// Directory holding local volumes referenced by `--mounts`.
    ///
    /// # Errors
    ///
    /// Propagates [`OpsSettings::home`] failures.
    pub fn volumes_dir(&self) -> Result<Utf8PathBuf, ConfigError> {
        Ok(self.home()?.join(VOLUMES_DIR))
    }

    /// Directory holding extracted packages.
    ///
    /// # Errors
    ///
    /// Propagates [`OpsSettings::home`] failures.
    pub fn packages_dir(&self) -> Result<Utf8PathBuf, ConfigError> {
        Ok(self.home()?.join(PACKAGES_DIR))
    }
}
