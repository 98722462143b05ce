//! Provider abstraction shared by every image backend.
//!
//! Commands talk to a `dyn Provider` and never special-case a platform once
//! [`resolve_provider`] has picked the implementation. Every provider offers
//! the same capability set; operations a backend cannot perform report
//! [`OpsError::Unsupported`] or [`OpsError::NotImplemented`] instead of being
//! absent.

mod onprem;

use std::fmt;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::aws::AwsProvider;
use crate::build::{CommandImageBuilder, ImageBuilder};
use crate::config::{CloudConfig, OpsSettings};
use crate::context::Context;
use crate::error::OpsError;
use crate::poll::{Pause, PollPolicy, TokioPause};
use crate::process::{CommandRunner, ProcessCommandRunner};
use crate::storage::{ObjectStorage, S3Storage};

pub use onprem::OnPremProvider;

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, OpsError>> + Send + 'a>>;

/// Read-only projection of an image reported by a provider listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloudImage {
    /// Display name.
    pub name: String,
    /// Provider-assigned identifier.
    pub id: String,
    /// Provider-reported state.
    pub status: String,
    /// Creation timestamp as reported by the provider.
    pub created: String,
}

/// Capability set every image backend implements.
pub trait Provider: Send + Sync {
    /// Platform this provider serves.
    fn platform(&self) -> Platform;

    /// Builds the configured program and returns the artifact ready for
    /// [`Provider::create_image`].
    fn build_image<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Utf8PathBuf>;

    /// Builds an image from an extracted package directory.
    fn build_image_with_package<'a>(
        &'a self,
        ctx: &'a Context,
        package_dir: &'a Utf8Path,
    ) -> ProviderFuture<'a, Utf8PathBuf>;

    /// Adapts the built image to the provider's upload format.
    fn customize_image<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Utf8PathBuf>;

    /// Realises `artifact` as a provider-native bootable image.
    fn create_image<'a>(&'a self, ctx: &'a Context, artifact: &'a Utf8Path)
    -> ProviderFuture<'a, ()>;

    /// Lists images owned by this tool.
    fn get_images<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Vec<CloudImage>>;

    /// Writes the [`Provider::get_images`] listing to `out`.
    fn list_images<'a>(
        &'a self,
        ctx: &'a Context,
        out: &'a mut (dyn Write + Send),
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let images = self.get_images(ctx).await?;
            render_images(&images, out)
        })
    }

    /// Deletes the image `name` and whatever backs it.
    fn delete_image<'a>(&'a self, ctx: &'a Context, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Changes the size of the image `name`.
    fn resize_image<'a>(
        &'a self,
        ctx: &'a Context,
        name: &'a str,
        size: &'a str,
    ) -> ProviderFuture<'a, ()>;

    /// Copies the image `name` from this provider to `target`.
    fn sync_image<'a>(
        &'a self,
        ctx: &'a Context,
        target: &'a dyn Provider,
        name: &'a str,
    ) -> ProviderFuture<'a, ()>;
}

/// Renders images as a plain, column-aligned table.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when `out` cannot be written.
pub fn render_images(images: &[CloudImage], out: &mut (dyn Write + Send)) -> Result<(), OpsError> {
    const HEADERS: [&str; 4] = ["NAME", "ID", "STATUS", "CREATED"];
    let rows: Vec<[&str; 4]> = images
        .iter()
        .map(|image| {
            [
                image.name.as_str(),
                image.id.as_str(),
                image.status.as_str(),
                image.created.as_str(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let write_err = |err: std::io::Error| OpsError::Io {
        path: String::from("<output>"),
        message: err.to_string(),
    };
    for row in std::iter::once(&HEADERS).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{}", line.trim_end()).map_err(write_err)?;
    }
    Ok(())
}

/// Platforms known to the command surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    /// Local image store.
    OnPrem,
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Gcp,
    /// DigitalOcean.
    DigitalOcean,
    /// Vultr.
    Vultr,
    /// Microsoft Azure.
    Azure,
    /// VMware vSphere.
    VSphere,
}

impl Platform {
    /// Every platform in resolution order.
    pub const ALL: [Self; 7] = [
        Self::OnPrem,
        Self::Aws,
        Self::Gcp,
        Self::DigitalOcean,
        Self::Vultr,
        Self::Azure,
        Self::VSphere,
    ];

    /// Identifier used in configuration files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnPrem => "onprem",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::DigitalOcean => "do",
            Self::Vultr => "vultr",
            Self::Azure => "azure",
            Self::VSphere => "vsphere",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = OpsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str() == wanted)
            .ok_or_else(|| OpsError::UnknownPlatform(value.to_owned()))
    }
}

/// Collaborators handed to providers at construction.
#[derive(Clone)]
pub struct ProviderDeps {
    /// Directory holding local artifacts.
    pub images_dir: Utf8PathBuf,
    /// AWS command-line client.
    pub aws_bin: String,
    /// Zone used when neither the config nor an override names one.
    pub default_zone: Option<String>,
    /// Runner used for provider command-line calls.
    pub runner: Arc<dyn CommandRunner>,
    /// Image builder.
    pub builder: Arc<dyn ImageBuilder>,
    /// Staging storage for cloud imports.
    pub storage: Arc<dyn ObjectStorage>,
    /// Suspension used between poll attempts.
    pub pause: Arc<dyn Pause>,
    /// Retry budget for snapshot imports.
    pub import_policy: PollPolicy,
}

impl fmt::Debug for ProviderDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDeps")
            .field("images_dir", &self.images_dir)
            .field("aws_bin", &self.aws_bin)
            .field("default_zone", &self.default_zone)
            .field("import_policy", &self.import_policy)
            .finish_non_exhaustive()
    }
}

impl ProviderDeps {
    /// Wires real process, builder and storage adapters from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Config`] when settings are invalid or the state
    /// directory cannot be determined.
    pub fn from_settings(settings: &OpsSettings) -> Result<Self, OpsError> {
        settings.validate()?;
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessCommandRunner);
        Ok(Self {
            images_dir: settings.images_dir()?,
            aws_bin: settings.aws_bin.clone(),
            default_zone: settings.default_zone.clone(),
            builder: Arc::new(CommandImageBuilder::new(
                Arc::clone(&runner),
                settings.builder_bin.clone(),
            )),
            storage: Arc::new(S3Storage::new(Arc::clone(&runner), settings.aws_bin.clone())),
            runner,
            pause: Arc::new(TokioPause),
            import_policy: PollPolicy::SNAPSHOT_IMPORT,
        })
    }
}

/// Constructs the provider for `platform`, applying `zone_override` to a
/// copy of `cloud_config` first.
///
/// # Errors
///
/// Returns [`OpsError::UnknownPlatform`] for unrecognised identifiers and
/// [`OpsError::NotImplemented`] for recognised platforms without a backend.
pub fn resolve_provider(
    platform: &str,
    cloud_config: &CloudConfig,
    zone_override: Option<&str>,
    deps: &ProviderDeps,
) -> Result<Box<dyn Provider>, OpsError> {
    let selected: Platform = platform.parse()?;
    let mut cloud = cloud_config.clone();
    if let Some(zone) = zone_override.map(str::trim).filter(|zone| !zone.is_empty()) {
        zone.clone_into(&mut cloud.zone);
    }
    if let Some(zone) = deps
        .default_zone
        .as_ref()
        .filter(|_| cloud.zone.trim().is_empty())
    {
        cloud.zone.clone_from(zone);
    }
    debug!(platform = %selected, zone = %cloud.zone, "resolved provider");

    match selected {
        Platform::OnPrem => Ok(Box::new(OnPremProvider::new(
            deps.images_dir.clone(),
            Arc::clone(&deps.builder),
        ))),
        Platform::Aws => Ok(Box::new(
            AwsProvider::new(
                Arc::clone(&deps.runner),
                deps.aws_bin.clone(),
                cloud,
                Arc::clone(&deps.builder),
                Arc::clone(&deps.storage),
            )
            .with_pause(Arc::clone(&deps.pause))
            .with_import_policy(deps.import_policy),
        )),
        Platform::Gcp
        | Platform::DigitalOcean
        | Platform::Vultr
        | Platform::Azure
        | Platform::VSphere => Err(OpsError::NotImplemented(format!("{selected} provider"))),
    }
}
