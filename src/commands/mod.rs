//! Orchestration behind the `unikops image` subcommands.
//!
//! Each command loads the invocation config, applies command-line overrides,
//! resolves a provider and drives it. Configuration problems are reported
//! before any provider, builder or storage call is made.

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::info;

use crate::build::{apply_klib_policy, assign_image, program_image_name, resolve_program};
use crate::config::{Config, LOCAL_PLATFORM, OpsSettings, merge};
use crate::context::Context;
use crate::error::OpsError;
use crate::mounts::attach_mounts;
use crate::package::{LocalPackageStore, PackageSource, load_manifest, package_image_name};
use crate::provider::{Platform, Provider, ProviderDeps, resolve_provider};

/// Collaborators shared by every command.
#[derive(Clone)]
pub struct CommandEnv {
    /// Provider construction dependencies.
    pub deps: ProviderDeps,
    /// Source of extracted packages for `--package` builds.
    pub packages: Arc<dyn PackageSource>,
    /// Directory holding volumes referenced by `--mounts`.
    pub volumes_dir: Utf8PathBuf,
}

impl std::fmt::Debug for CommandEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEnv")
            .field("deps", &self.deps)
            .field("volumes_dir", &self.volumes_dir)
            .finish_non_exhaustive()
    }
}

impl CommandEnv {
    /// Wires production collaborators from tool settings.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Config`] when the settings are invalid or the state
    /// directories cannot be determined.
    pub fn from_settings(settings: &OpsSettings) -> Result<Self, OpsError> {
        Ok(Self {
            deps: ProviderDeps::from_settings(settings)?,
            packages: Arc::new(LocalPackageStore::new(settings.packages_dir()?)),
            volumes_dir: settings.volumes_dir()?,
        })
    }
}

/// Options shared by every image subcommand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetOptions {
    /// Invocation config file (`-c`).
    pub config_path: Option<Utf8PathBuf>,
    /// Platform override (`-t`).
    pub platform: Option<String>,
    /// Zone override (`-z`).
    pub zone: Option<String>,
}

/// Arguments of `image create`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateRequest {
    /// Config, platform and zone selection.
    pub target: TargetOptions,
    /// Package to build from instead of a program (`-p`).
    pub package: Option<String>,
    /// Program and arguments (`-a`).
    pub args: Vec<String>,
    /// `volume:path` entries (`--mounts`).
    pub mounts: Vec<String>,
    /// Use nightly kernel builds (`-n`).
    pub nightly: bool,
    /// Explicit image name (`-i`).
    pub image_name: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Loads the config named by `target` and applies its overrides.
///
/// The platform is the `-t` value, else the configured platform, else
/// `onprem`.
///
/// # Errors
///
/// Returns [`OpsError::Config`] when the config file cannot be read or parsed.
pub fn load_config(target: &TargetOptions) -> Result<Config, OpsError> {
    let mut config = target
        .config_path
        .as_deref()
        .map_or_else(|| Ok(Config::default()), Config::load)?;
    if let Some(platform) = non_empty(target.platform.as_deref()) {
        platform.clone_into(&mut config.cloud_config.platform);
    }
    if config.cloud_config.platform.trim().is_empty() {
        config.cloud_config.platform = String::from(LOCAL_PLATFORM);
    }
    if let Some(zone) = non_empty(target.zone.as_deref()) {
        zone.clone_into(&mut config.cloud_config.zone);
    }
    Ok(config)
}

fn provider_for(
    env: &CommandEnv,
    config: &Config,
    target: &TargetOptions,
) -> Result<Box<dyn Provider>, OpsError> {
    resolve_provider(
        &config.cloud_config.platform,
        &config.cloud_config,
        non_empty(target.zone.as_deref()),
        &env.deps,
    )
}

/// Builds an image and realises it on the selected platform.
///
/// # Errors
///
/// Returns configuration errors before any external call, then whatever the
/// builder or provider reports.
pub async fn create(
    env: &CommandEnv,
    request: &CreateRequest,
    out: &mut (dyn Write + Send),
) -> Result<(), OpsError> {
    let mut loaded = load_config(&request.target)?;
    if request.nightly {
        loaded.nightly_build = Some(true);
    }
    loaded.validate_target()?;
    let mounted = attach_mounts(&loaded, &request.mounts, &env.volumes_dir)?;
    let provider = provider_for(env, &mounted, &request.target)?;
    let images_dir = env.deps.images_dir.as_path();
    let explicit_name = non_empty(request.image_name.as_deref());

    let (ctx, artifact) = if let Some(package) = non_empty(request.package.as_deref()) {
        let mut cli_config = mounted;
        cli_config.run_config.args.extend(request.args.iter().cloned());
        let package_dir = env.packages.download_and_extract(package)?;
        let manifest = load_manifest(&package_dir)?;
        // Policy klibs are added after the merge so they never count as
        // command-line choices.
        let merged = apply_klib_policy(&merge(&manifest, &cli_config));
        let named = assign_image(
            &merged,
            explicit_name,
            package_image_name(package),
            images_dir,
        )?;
        let ctx = Context::new(named);
        let artifact = provider
            .build_image_with_package(&ctx, &package_dir)
            .await?;
        (ctx, artifact)
    } else {
        let program = resolve_program(&request.args, &mounted)?;
        let mut program_config = mounted;
        program_config.run_config.program.clone_from(&program);
        if !request.args.is_empty() {
            // The program's argv comes from the command line as a whole.
            program_config.run_config.args.clone_from(&request.args);
        }
        let named = assign_image(
            &apply_klib_policy(&program_config),
            explicit_name,
            program_image_name(&program),
            images_dir,
        )?;
        let ctx = Context::new(named);
        let artifact = provider.build_image(&ctx).await?;
        (ctx, artifact)
    };

    provider.create_image(&ctx, &artifact).await?;
    writeln!(
        out,
        "{} image '{}' created...",
        provider.platform(),
        ctx.config().cloud_config.image_name
    )
    .map_err(|err| output_error(&err))
}

fn output_error(err: &std::io::Error) -> OpsError {
    OpsError::Io {
        path: String::from("<output>"),
        message: err.to_string(),
    }
}

/// Lists images owned by this tool on the selected platform.
///
/// # Errors
///
/// Propagates configuration and provider errors.
pub async fn list(
    env: &CommandEnv,
    target: &TargetOptions,
    out: &mut (dyn Write + Send),
) -> Result<(), OpsError> {
    let config = load_config(target)?;
    let provider = provider_for(env, &config, target)?;
    let ctx = Context::new(config);
    provider.list_images(&ctx, out).await
}

/// Deletes the image `name` on the selected platform.
///
/// # Errors
///
/// Returns [`OpsError::NotFound`] when no owned image has that name.
pub async fn delete(env: &CommandEnv, target: &TargetOptions, name: &str) -> Result<(), OpsError> {
    let config = load_config(target)?;
    let provider = provider_for(env, &config, target)?;
    let ctx = Context::new(config);
    provider.delete_image(&ctx, name).await?;
    info!(image = name, "image deleted");
    Ok(())
}

/// Resizes the image `name` to `size`.
///
/// # Errors
///
/// Returns [`OpsError::Unsupported`] on platforms whose images cannot be
/// resized.
pub async fn resize(
    env: &CommandEnv,
    target: &TargetOptions,
    name: &str,
    size: &str,
) -> Result<(), OpsError> {
    let config = load_config(target)?;
    let provider = provider_for(env, &config, target)?;
    let ctx = Context::new(config);
    provider.resize_image(&ctx, name, size).await
}

/// Copies the image `name` from the `source` platform to the selected one.
///
/// Only `onprem` can act as a source.
///
/// # Errors
///
/// Returns [`OpsError::NotImplemented`] for any other source before a
/// provider is resolved.
pub async fn sync(
    env: &CommandEnv,
    target: &TargetOptions,
    name: &str,
    source: &str,
) -> Result<(), OpsError> {
    let source_platform = source.trim();
    if source_platform != Platform::OnPrem.as_str() {
        return Err(OpsError::NotImplemented(format!("{source_platform} sync")));
    }
    let config = load_config(target)?;
    config.validate_target()?;
    let origin = resolve_provider(source_platform, &config.cloud_config, None, &env.deps)?;
    let destination = provider_for(env, &config, target)?;
    let ctx = Context::new(config);
    origin.sync_image(&ctx, destination.as_ref(), name).await
}
