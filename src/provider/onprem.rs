//! Local image store provider.
//!
//! Images live as raw `.img` files under the images directory. Creating an
//! image only places the built artifact there; no storage or compute service
//! is contacted.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::OpenOptions;
use tracing::{Instrument, info};

use super::{CloudImage, Platform, Provider, ProviderFuture};
use crate::build::{ImageBuilder, artifact_path, validate_image_name};
use crate::context::Context;
use crate::error::OpsError;
use crate::local_fs::{self, io_error};

const LOCAL_STATUS: &str = "local";
const IMAGE_SUFFIX: &str = ".img";
const SIZE_UNITS: [(char, u64); 3] = [('k', 1 << 10), ('m', 1 << 20), ('g', 1 << 30)];

/// Provider backed by the local images directory.
#[derive(Clone)]
pub struct OnPremProvider {
    images_dir: Utf8PathBuf,
    builder: Arc<dyn ImageBuilder>,
}

impl std::fmt::Debug for OnPremProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnPremProvider")
            .field("images_dir", &self.images_dir)
            .finish_non_exhaustive()
    }
}

impl OnPremProvider {
    /// Creates a provider storing images under `images_dir`.
    #[must_use]
    pub fn new(images_dir: impl Into<Utf8PathBuf>, builder: Arc<dyn ImageBuilder>) -> Self {
        Self {
            images_dir: images_dir.into(),
            builder,
        }
    }

    fn existing_image(&self, name: &str) -> Result<Utf8PathBuf, OpsError> {
        validate_image_name(name)?;
        let path = artifact_path(&self.images_dir, name);
        if local_fs::file_exists(&path) {
            Ok(path)
        } else {
            Err(OpsError::image_not_found(name))
        }
    }

    fn scan(&self) -> Result<Vec<CloudImage>, OpsError> {
        let Ok(dir) = local_fs::open_dir(&self.images_dir) else {
            return Ok(Vec::new());
        };
        let entries = dir
            .entries()
            .map_err(|err| io_error(&self.images_dir, &err))?;

        let mut images = Vec::new();
        for entry in entries {
            let item = entry.map_err(|err| io_error(&self.images_dir, &err))?;
            let file_name = item
                .file_name()
                .map_err(|err| io_error(&self.images_dir, &err))?;
            let Some(stem) = file_name.strip_suffix(IMAGE_SUFFIX) else {
                continue;
            };
            let metadata = item
                .metadata()
                .map_err(|err| io_error(&self.images_dir, &err))?;
            if !metadata.is_file() {
                continue;
            }
            let created = metadata
                .modified()
                .ok()
                .and_then(|time| time.into_std().duration_since(UNIX_EPOCH).ok())
                .map_or_else(|| String::from("n/a"), |since| since.as_secs().to_string());
            images.push(CloudImage {
                name: stem.to_owned(),
                id: self.images_dir.join(&file_name).to_string(),
                status: String::from(LOCAL_STATUS),
                created,
            });
        }
        images.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(images)
    }

    fn remove(&self, name: &str) -> Result<(), OpsError> {
        let path = self.existing_image(name)?;
        let (parent, file) = local_fs::split_file(&path)?;
        local_fs::open_dir(&parent)?
            .remove_file(file)
            .map_err(|err| io_error(&path, &err))?;
        info!(image = name, "deleted local image");
        Ok(())
    }

    fn grow(&self, name: &str, size: &str) -> Result<(), OpsError> {
        let path = self.existing_image(name)?;
        let requested = parse_size(size)?;
        let (parent, file) = local_fs::split_file(&path)?;
        let dir = local_fs::open_dir(&parent)?;
        let current = dir
            .metadata(&file)
            .map_err(|err| io_error(&path, &err))?
            .len();
        if requested < current {
            return Err(OpsError::Unsupported(format!(
                "shrinking image '{name}' from {current} to {requested} bytes"
            )));
        }
        let handle = dir
            .open_with(&file, OpenOptions::new().write(true))
            .map_err(|err| io_error(&path, &err))?;
        handle
            .set_len(requested)
            .map_err(|err| io_error(&path, &err))?;
        info!(image = name, bytes = requested, "resized local image");
        Ok(())
    }
}

/// Parses a size such as `512M`, `2G`, `64k` or a plain byte count.
///
/// # Errors
///
/// Returns [`OpsError::Config`] for malformed or overflowing sizes.
pub fn parse_size(spec: &str) -> Result<u64, OpsError> {
    let invalid = || OpsError::Config(format!("invalid size '{spec}'; use bytes or K/M/G suffix"));
    let trimmed = spec.trim();
    let without_b = trimmed
        .strip_suffix(['b', 'B'])
        .filter(|rest| rest.ends_with(|ch: char| ch.is_ascii_alphabetic()))
        .unwrap_or(trimmed);
    let (digits, multiplier) = SIZE_UNITS
        .iter()
        .find_map(|&(unit, factor)| {
            without_b
                .strip_suffix([unit, unit.to_ascii_uppercase()])
                .map(|rest| (rest, factor))
        })
        .unwrap_or((without_b, 1));
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

impl Provider for OnPremProvider {
    fn platform(&self) -> Platform {
        Platform::OnPrem
    }

    fn build_image<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Utf8PathBuf> {
        Box::pin(async move {
            self.builder.build_image(ctx.config())?;
            self.customize_image(ctx).await
        })
    }

    fn build_image_with_package<'a>(
        &'a self,
        ctx: &'a Context,
        package_dir: &'a Utf8Path,
    ) -> ProviderFuture<'a, Utf8PathBuf> {
        Box::pin(async move {
            self.builder
                .build_image_from_package(package_dir, ctx.config())?;
            self.customize_image(ctx).await
        })
    }

    fn customize_image<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Utf8PathBuf> {
        Box::pin(async move { Ok(ctx.config().run_config.image_path.clone()) })
    }

    fn create_image<'a>(
        &'a self,
        ctx: &'a Context,
        artifact: &'a Utf8Path,
    ) -> ProviderFuture<'a, ()> {
        let span = ctx.span().clone();
        Box::pin(
            async move {
                if !local_fs::file_exists(artifact) {
                    return Err(OpsError::Io {
                        path: artifact.to_string(),
                        message: String::from("built image is missing"),
                    });
                }
                let name = &ctx.config().cloud_config.image_name;
                validate_image_name(name)?;
                let stored = artifact_path(&self.images_dir, name);
                if stored.as_path() != artifact {
                    local_fs::copy_file(artifact, &stored)?;
                }
                info!(path = %stored, "image stored locally");
                Ok(())
            }
            .instrument(span),
        )
    }

    fn get_images<'a>(&'a self, _ctx: &'a Context) -> ProviderFuture<'a, Vec<CloudImage>> {
        Box::pin(async move { self.scan() })
    }

    fn delete_image<'a>(&'a self, ctx: &'a Context, name: &'a str) -> ProviderFuture<'a, ()> {
        let span = ctx.span().clone();
        Box::pin(async move { self.remove(name) }.instrument(span))
    }

    fn resize_image<'a>(
        &'a self,
        ctx: &'a Context,
        name: &'a str,
        size: &'a str,
    ) -> ProviderFuture<'a, ()> {
        let span = ctx.span().clone();
        Box::pin(async move { self.grow(name, size) }.instrument(span))
    }

    fn sync_image<'a>(
        &'a self,
        ctx: &'a Context,
        target: &'a dyn Provider,
        name: &'a str,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let artifact = self.existing_image(name)?;
            let mut config = ctx.config().clone();
            name.clone_into(&mut config.cloud_config.image_name);
            config.run_config.image_path.clone_from(&artifact);
            let sync_ctx = Context::new(config);
            info!(image = name, target = %target.platform(), "syncing local image");
            target.create_image(&sync_ctx, &artifact).await
        })
    }
}
