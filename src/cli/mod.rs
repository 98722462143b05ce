//! Command-line interface definitions for the `unikops` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `unikops` binary.
#[derive(Debug, Parser)]
#[command(
    name = "unikops",
    about = "Build unikernel images and manage them on local and cloud providers",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create, list, delete, resize and sync images.
    #[command(subcommand)]
    Image(ImageCommand),
}

/// Flags accepted by every `image` subcommand.
#[derive(Debug, Args, Clone, Default)]
pub(crate) struct TargetArgs {
    /// Invocation config file (JSON).
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub(crate) config: Option<String>,
    /// Target platform: onprem, aws, gcp, do, vultr, azure or vsphere.
    ///
    /// Overrides `CloudConfig.Platform`; defaults to `onprem` when neither is
    /// set.
    #[arg(short = 't', long = "target-cloud", value_name = "PLATFORM")]
    pub(crate) target_cloud: Option<String>,
    /// Zone or region for provider calls.
    #[arg(short = 'z', long = "zone", value_name = "ZONE")]
    pub(crate) zone: Option<String>,
}

/// `unikops image` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum ImageCommand {
    /// Build an image and realise it on the target platform.
    #[command(name = "create")]
    Create(CreateCommand),
    /// List images created by this tool.
    #[command(name = "list")]
    List(TargetOnly),
    /// Delete an image and its backing snapshot.
    #[command(name = "delete")]
    Delete(DeleteCommand),
    /// Grow an image to a new size.
    #[command(name = "resize")]
    Resize(ResizeCommand),
    /// Copy a local image to the target platform.
    #[command(name = "sync")]
    Sync(SyncCommand),
}

/// Arguments for `unikops image create`.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Config, platform and zone selection.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Build from a package instead of a program.
    #[arg(short = 'p', long = "package", value_name = "NAME")]
    pub(crate) package: Option<String>,
    /// Program and its arguments; repeat for each argument.
    #[arg(short = 'a', long = "args", value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) args: Vec<String>,
    /// Attach a volume as `<volume_id:mount_path>`; may be repeated.
    #[arg(long = "mounts", value_name = "VOLUME:PATH")]
    pub(crate) mounts: Vec<String>,
    /// Build against the nightly kernel.
    #[arg(short = 'n', long = "nightly")]
    pub(crate) nightly: bool,
    /// Image name; defaults to the configured name, then the program or
    /// package name.
    #[arg(short = 'i', long = "imagename", value_name = "NAME")]
    pub(crate) image_name: Option<String>,
}

/// Subcommands that only select a target.
#[derive(Debug, Args)]
pub(crate) struct TargetOnly {
    /// Config, platform and zone selection.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
}

/// Arguments for `unikops image delete`.
#[derive(Debug, Args)]
pub(crate) struct DeleteCommand {
    /// Config, platform and zone selection.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Image name as shown in the listing's ID column.
    #[arg(value_name = "IMAGE")]
    pub(crate) name: String,
}

/// Arguments for `unikops image resize`.
#[derive(Debug, Args)]
pub(crate) struct ResizeCommand {
    /// Config, platform and zone selection.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Image to resize.
    #[arg(value_name = "IMAGE")]
    pub(crate) name: String,
    /// New size, such as `512M` or `2G`.
    #[arg(value_name = "SIZE")]
    pub(crate) size: String,
}

/// Arguments for `unikops image sync`.
#[derive(Debug, Args)]
pub(crate) struct SyncCommand {
    /// Config, platform and zone selection.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Image to copy.
    #[arg(value_name = "IMAGE")]
    pub(crate) name: String,
    /// Platform holding the image.
    #[arg(short = 's', long = "source-cloud", value_name = "PLATFORM", default_value = "onprem")]
    pub(crate) source: String,
}
