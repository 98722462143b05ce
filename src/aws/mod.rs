//! Amazon Web Services provider.
//!
//! EC2 calls go through the `aws` command-line client with JSON output, so
//! credentials and profiles resolve exactly as they do for the operator's
//! shell. Images are staged in S3, imported as EBS snapshots and registered
//! as AMIs tagged `CreatedBy=ops`.

mod create;
mod ec2;
mod inventory;
mod types;
mod wait;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::Instrument;

use crate::build::ImageBuilder;
use crate::config::CloudConfig;
use crate::context::Context;
use crate::error::OpsError;
use crate::poll::{Pause, PollPolicy, TokioPause};
use crate::process::CommandRunner;
use crate::provider::{CloudImage, Platform, Provider, ProviderFuture};
use crate::storage::ObjectStorage;

pub use types::{NAME_TAG_KEY, OWNERSHIP_TAG_KEY, OWNERSHIP_TAG_VALUE};

use ec2::Ec2Cli;

/// Provider that realises images as AMIs.
pub struct AwsProvider<R: CommandRunner> {
    ec2: Ec2Cli<R>,
    cloud: CloudConfig,
    builder: Arc<dyn ImageBuilder>,
    storage: Arc<dyn ObjectStorage>,
    pause: Arc<dyn Pause>,
    import_policy: PollPolicy,
}

impl<R: CommandRunner> std::fmt::Debug for AwsProvider<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProvider")
            .field("cloud", &self.cloud)
            .field("import_policy", &self.import_policy)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> AwsProvider<R> {
    /// Creates a provider calling `aws_bin` through `runner` in the zone of
    /// `cloud`.
    #[must_use]
    pub fn new(
        runner: R,
        aws_bin: impl Into<String>,
        cloud: CloudConfig,
        builder: Arc<dyn ImageBuilder>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            ec2: Ec2Cli::new(runner, aws_bin.into(), cloud.zone.clone()),
            cloud,
            builder,
            storage,
            pause: Arc::new(TokioPause),
            import_policy: PollPolicy::SNAPSHOT_IMPORT,
        }
    }

    /// Replaces the suspension used between import polls.
    #[must_use]
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// Replaces the snapshot import retry budget.
    #[must_use]
    pub const fn with_import_policy(mut self, policy: PollPolicy) -> Self {
        self.import_policy = policy;
        self
    }

    /// Cloud settings this provider was resolved with.
    #[must_use]
    pub const fn cloud_config(&self) -> &CloudConfig {
        &self.cloud
    }
}

impl<R: CommandRunner + 'static> Provider for AwsProvider<R> {
    fn platform(&self) -> Platform {
        Platform::Aws
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
        Box::pin(self.create_from_artifact(ctx, artifact).instrument(span))
    }

    fn get_images<'a>(&'a self, ctx: &'a Context) -> ProviderFuture<'a, Vec<CloudImage>> {
        let span = ctx.span().clone();
        Box::pin(async move { self.owned_images() }.instrument(span))
    }

    fn delete_image<'a>(&'a self, ctx: &'a Context, name: &'a str) -> ProviderFuture<'a, ()> {
        let span = ctx.span().clone();
        Box::pin(async move { self.delete_owned(name) }.instrument(span))
    }

    fn resize_image<'a>(
        &'a self,
        _ctx: &'a Context,
        name: &'a str,
        _size: &'a str,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            Err(OpsError::Unsupported(format!(
                "resizing registered image '{name}' on aws"
            )))
        })
    }

    fn sync_image<'a>(
        &'a self,
        _ctx: &'a Context,
        _target: &'a dyn Provider,
        _name: &'a str,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move { Err(OpsError::NotImplemented(String::from("aws sync"))) })
    }
}
