//! Per-invocation image configuration and the tool settings that surround it.
//!
//! A [`Config`] describes one image: the program to boot, the run options
//! passed to the builder, and the cloud target. It is read from an ops style
//! JSON file (PascalCase keys), overlaid with command-line values, and, for
//! packages, merged on top of the package manifest with [`merge`].

mod settings;

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use settings::OpsSettings;

/// Platform identifier that needs no object storage bucket.
pub const LOCAL_PLATFORM: &str = "onprem";

/// Tag key/value attached to provider resources.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag from a key and value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Volume attached to the image at build time.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Mount {
    /// Local path of the volume image.
    pub volume: Utf8PathBuf,
    /// Mount point inside the unikernel.
    pub path: String,
}

/// Cloud target settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CloudConfig {
    /// Platform identifier (`onprem`, `aws`, `gcp`, ...).
    pub platform: String,
    /// Object storage bucket used to stage uploads.
    pub bucket_name: String,
    /// Zone or region for provider calls.
    pub zone: String,
    /// Logical image name, also used as the staging object key.
    pub image_name: String,
    /// Extra tags applied to created resources.
    pub tags: Vec<Tag>,
}

/// Options forwarded to the image builder.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RunConfig {
    /// Program baked into the image.
    pub program: String,
    /// Arguments passed to the program at boot.
    pub args: Vec<String>,
    /// Kernel libraries included in the image.
    pub klibs: Vec<String>,
    /// Volumes attached to the image.
    pub mounts: Vec<Mount>,
    /// Path of the local disk image produced by the builder.
    #[serde(rename = "Imagename")]
    pub image_path: Utf8PathBuf,
}

/// Complete description of one image build and its cloud target.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    /// Cloud target settings.
    pub cloud_config: CloudConfig,
    /// Builder options.
    pub run_config: RunConfig,
    /// Scratch directory used by the builder.
    pub build_dir: Utf8PathBuf,
    /// Build against nightly kernel releases when `Some(true)`.
    pub nightly_build: Option<bool>,
    /// Environment variables exported to the program.
    pub env: BTreeMap<String, String>,
}

impl Config {
    /// Reads a configuration file. An empty path yields the default config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if path.as_str().trim().is_empty() {
            return Ok(Self::default());
        }
        let contents = read_file(path)?;
        Self::from_json(path, &contents)
    }

    fn from_json(path: &Utf8Path, contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Checks the invariants that must hold before a provider is resolved
    /// for image creation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the platform is empty or a
    /// non-local platform has no bucket.
    pub fn validate_target(&self) -> Result<(), ConfigError> {
        if self.cloud_config.platform.trim().is_empty() {
            return Err(ConfigError::MissingField(String::from(
                "please select one of the cloud platforms in config (CloudConfig.Platform): \
                 onprem, aws, gcp, do, vsphere, vultr, azure",
            )));
        }
        if self.cloud_config.bucket_name.trim().is_empty()
            && self.cloud_config.platform != LOCAL_PLATFORM
        {
            return Err(ConfigError::MissingField(String::from(
                "please specify a cloud bucket in config (CloudConfig.BucketName)",
            )));
        }
        Ok(())
    }

    /// Returns `true` when the nightly flag is explicitly enabled.
    #[must_use]
    pub fn is_nightly(&self) -> bool {
        self.nightly_build.unwrap_or(false)
    }
}

/// Overlays `overlay` on top of `base`, field by field.
///
/// A field set in `overlay` (non-empty string, path, list or map, or `Some`
/// option) wins; otherwise the `base` value is kept. Nested sections are
/// merged with the same rule, so setting one cloud field does not discard the
/// others.
#[must_use]
pub fn merge(base: &Config, overlay: &Config) -> Config {
    Config {
        cloud_config: CloudConfig {
            platform: pick_str(&base.cloud_config.platform, &overlay.cloud_config.platform),
            bucket_name: pick_str(
                &base.cloud_config.bucket_name,
                &overlay.cloud_config.bucket_name,
            ),
            zone: pick_str(&base.cloud_config.zone, &overlay.cloud_config.zone),
            image_name: pick_str(
                &base.cloud_config.image_name,
                &overlay.cloud_config.image_name,
            ),
            tags: pick_vec(&base.cloud_config.tags, &overlay.cloud_config.tags),
        },
        run_config: RunConfig {
            program: pick_str(&base.run_config.program, &overlay.run_config.program),
            args: pick_vec(&base.run_config.args, &overlay.run_config.args),
            klibs: pick_vec(&base.run_config.klibs, &overlay.run_config.klibs),
            mounts: pick_vec(&base.run_config.mounts, &overlay.run_config.mounts),
            image_path: pick_path(&base.run_config.image_path, &overlay.run_config.image_path),
        },
        build_dir: pick_path(&base.build_dir, &overlay.build_dir),
        nightly_build: overlay.nightly_build.or(base.nightly_build),
        env: if overlay.env.is_empty() {
            base.env.clone()
        } else {
            overlay.env.clone()
        },
    }
}

fn pick_str(base: &str, overlay: &str) -> String {
    let chosen = if overlay.is_empty() { base } else { overlay };
    chosen.to_owned()
}

fn pick_path(base: &Utf8Path, overlay: &Utf8Path) -> Utf8PathBuf {
    if overlay.as_str().is_empty() {
        base.to_path_buf()
    } else {
        overlay.to_path_buf()
    }
}

fn pick_vec<T: Clone>(base: &[T], overlay: &[T]) -> Vec<T> {
    let chosen = if overlay.is_empty() { base } else { overlay };
    chosen.to_vec()
}

fn read_file(path: &Utf8Path) -> Result<String, ConfigError> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| ConfigError::Read {
        path: path.to_path_buf(),
        message: String::from("configuration file path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| read_error(path, &err))?;
    dir.read_to_string(file_name)
        .map_err(|err| read_error(path, &err))
}

fn read_error(path: &Utf8Path, err: &io::Error) -> ConfigError {
    ConfigError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Raised when a configuration file cannot be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// File that could not be read.
        path: Utf8PathBuf,
        /// Operating system error message.
        message: String,
    },
    /// Raised when a configuration file is not valid JSON.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File that could not be parsed.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("settings parsing failed: {0}")]
    Settings(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Settings(value.to_string())
    }
}

#[cfg(test)]
mod tests;
