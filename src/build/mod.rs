//! Image build pipeline: configuration policy applied before a build and the
//! builder interface that turns a program into a raw disk image.
//!
//! Low-level image construction lives in an external `mkimage`-style tool.
//! This module decides *what* to hand it: which program, which kernel
//! libraries, the image name, and where the artifact lands.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::OpsError;
use crate::local_fs;
use crate::process::{CommandRunner, success_stdout};

/// Platform whose images need the cloud-init kernel library.
pub const CLOUD_INIT_PLATFORM: &str = "azure";
/// Environment key that enables the telemetry kernel libraries.
pub const RADAR_ENV_KEY: &str = "RADAR_KEY";

const CLOUD_INIT_KLIB: &str = "cloud_init";
const TELEMETRY_KLIBS: [&str; 2] = ["tls", "radar"];
const IMAGE_EXTENSION: &str = "img";

/// Produces local raw disk images.
pub trait ImageBuilder: Send + Sync {
    /// Builds an image for `config.run_config.program` at
    /// `config.run_config.image_path`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Build`] when the builder fails.
    fn build_image(&self, config: &Config) -> Result<(), OpsError>;

    /// Builds an image from an extracted package directory.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Build`] when the builder fails.
    fn build_image_from_package(
        &self,
        package_dir: &Utf8Path,
        config: &Config,
    ) -> Result<(), OpsError>;
}

/// Builder that shells out to an external image tool, passing the
/// configuration as JSON.
#[derive(Clone, Debug)]
pub struct CommandImageBuilder<R: CommandRunner> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> CommandImageBuilder<R> {
    /// Creates a builder invoking `program` through `runner`.
    #[must_use]
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn invoke(&self, config: &Config, package_dir: Option<&Utf8Path>) -> Result<(), OpsError> {
        let artifact = &config.run_config.image_path;
        if artifact.as_str().trim().is_empty() {
            return Err(OpsError::Build(String::from(
                "no artifact path configured (RunConfig.Imagename)",
            )));
        }
        if let Some(parent) = artifact.parent().filter(|dir| !dir.as_str().is_empty()) {
            local_fs::ensure_dir(parent)?;
        }
        let payload =
            serde_json::to_string(config).map_err(|err| OpsError::Build(err.to_string()))?;

        let mut args = vec![
            OsString::from("build"),
            OsString::from("--output"),
            OsString::from(artifact.as_str()),
            OsString::from("--config-json"),
            OsString::from(payload),
        ];
        if let Some(dir) = package_dir {
            args.push(OsString::from("--package"));
            args.push(OsString::from(dir.as_str()));
        }

        info!(artifact = %artifact, "building image");
        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|err| OpsError::Build(err.to_string()))?;
        success_stdout(&self.program, output)
            .map(|_| ())
            .map_err(OpsError::Build)
    }
}

impl<R: CommandRunner> ImageBuilder for CommandImageBuilder<R> {
    fn build_image(&self, config: &Config) -> Result<(), OpsError> {
        self.invoke(config, None)
    }

    fn build_image_from_package(
        &self,
        package_dir: &Utf8Path,
        config: &Config,
    ) -> Result<(), OpsError> {
        self.invoke(config, Some(package_dir))
    }
}

/// Returns a copy of `config` with the kernel libraries its platform and
/// environment imply. Existing entries keep their order; duplicates are
/// dropped.
#[must_use]
pub fn apply_klib_policy(config: &Config) -> Config {
    let mut required: Vec<&str> = Vec::new();
    if config.cloud_config.platform == CLOUD_INIT_PLATFORM {
        required.push(CLOUD_INIT_KLIB);
    }
    if config.env.contains_key(RADAR_ENV_KEY) {
        required.extend(TELEMETRY_KLIBS);
    }

    let mut updated = config.clone();
    let mut klibs: Vec<String> = Vec::with_capacity(config.run_config.klibs.len() + required.len());
    for klib in config
        .run_config
        .klibs
        .iter()
        .map(String::as_str)
        .chain(required)
    {
        if !klibs.iter().any(|seen| seen == klib) {
            klibs.push(klib.to_owned());
        }
    }
    if klibs != config.run_config.klibs {
        debug!(?klibs, "kernel libraries adjusted by platform policy");
    }
    updated.run_config.klibs = klibs;
    updated
}

/// Picks the program to boot: the first command-line argument, else the
/// first configured argument.
///
/// # Errors
///
/// Returns [`OpsError::MissingProgram`] when both lists are empty.
pub fn resolve_program(cli_args: &[String], config: &Config) -> Result<String, OpsError> {
    cli_args
        .first()
        .or_else(|| config.run_config.args.first())
        .filter(|program| !program.trim().is_empty())
        .cloned()
        .ok_or(OpsError::MissingProgram)
}

/// Base name of a program path, used as the fallback image name.
#[must_use]
pub fn program_image_name(program: &str) -> &str {
    Utf8Path::new(program).file_name().unwrap_or(program)
}

/// Rejects image names that could resolve outside the images directory.
///
/// # Errors
///
/// Returns [`OpsError::Config`] for empty names and names containing a path
/// separator or `..`.
pub fn validate_image_name(name: &str) -> Result<(), OpsError> {
    if name.trim().is_empty() {
        return Err(OpsError::Config(String::from("image name is empty")));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(OpsError::Config(format!(
            "image name '{name}' must not contain '/', '\\' or '..'"
        )));
    }
    Ok(())
}

/// Returns a copy of `config` with its image name and artifact path set.
///
/// The name is `explicit` when given, else the configured cloud image name,
/// else `fallback`. The artifact is `<images_dir>/<name>.img`.
///
/// # Errors
///
/// Returns [`OpsError::Config`] when the chosen name fails
/// [`validate_image_name`].
pub fn assign_image(
    config: &Config,
    explicit: Option<&str>,
    fallback: &str,
    images_dir: &Utf8Path,
) -> Result<Config, OpsError> {
    let configured = config.cloud_config.image_name.trim();
    let name = explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| Some(configured).filter(|value| !value.is_empty()))
        .unwrap_or(fallback)
        .to_owned();
    validate_image_name(&name)?;

    let mut named = config.clone();
    named.run_config.image_path = artifact_path(images_dir, &name);
    named.cloud_config.image_name = name;
    Ok(named)
}

/// Local artifact path for the image `name`.
#[must_use]
pub fn artifact_path(images_dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    images_dir.join(format!("{name}.{IMAGE_EXTENSION}"))
}
