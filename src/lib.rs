//! Core library for the unikops image tool.
//!
//! The crate builds unikernel disk images through an external builder and
//! realises them on a provider: the local image store or Amazon Web Services
//! (S3 staging, EBS snapshot import, AMI registration). Commands talk to a
//! [`Provider`] trait object chosen by [`resolve_provider`], so every
//! platform exposes the same create, list, delete, resize and sync surface.

pub mod aws;
pub mod build;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod hypervisor;
pub mod local_fs;
pub mod mounts;
pub mod package;
pub mod poll;
pub mod process;
pub mod provider;
pub mod storage;
pub mod test_support;

pub use aws::{AwsProvider, OWNERSHIP_TAG_KEY, OWNERSHIP_TAG_VALUE};
pub use build::{CommandImageBuilder, ImageBuilder};
pub use commands::{CommandEnv, CreateRequest, TargetOptions};
pub use config::{CloudConfig, Config, ConfigError, OpsSettings, RunConfig, Tag, merge};
pub use context::Context;
pub use error::OpsError;
pub use hypervisor::{Hypervisor, select_hypervisor};
pub use package::{LocalPackageStore, PackageSource};
pub use poll::{Pause, PollPolicy, PollStatus, poll_until};
pub use process::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use provider::{CloudImage, OnPremProvider, Platform, Provider, ProviderDeps, resolve_provider};
pub use storage::{ObjectStorage, S3Storage};
