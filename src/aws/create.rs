//! Image creation workflow: stage, import, wait, clean up, tag, register.
//!
//! Remote resources created by an earlier step are not rolled back when a
//! later step fails. When the staged object cannot be removed after a
//! successful import, the imported snapshot id is logged and carried in the
//! error so an operator can find it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8Path;
use tracing::{info, warn};

use super::AwsProvider;
use super::types::{
    BlockDeviceMapping, EbsBlockDevice, NAME_TAG_KEY, OWNERSHIP_TAG_KEY, OWNERSHIP_TAG_VALUE,
    RegisterImageInput,
};
use super::wait::wait_for_snapshot;
use crate::config::{Config, Tag};
use crate::context::Context;
use crate::error::OpsError;
use crate::process::CommandRunner;

const ROOT_DEVICE: &str = "/dev/sda1";
const ARCHITECTURE: &str = "x86_64";
const VIRTUALIZATION: &str = "hvm";
const ROOT_VOLUME_TYPE: &str = "gp2";

static LAST_SUFFIX: AtomicU64 = AtomicU64::new(0);

/// Nanoseconds since the Unix epoch, strictly increasing within a process.
pub(super) fn unique_suffix() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| u64::try_from(since.as_nanos()).unwrap_or(u64::MAX));
    let previous = LAST_SUFFIX
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    now.max(previous.saturating_add(1))
}

/// Registered image name: the configured image name plus a unique suffix.
pub(super) fn registered_name(image_name: &str) -> String {
    format!("{image_name}{}", unique_suffix())
}

/// Configured tags plus the display name and ownership marker. Configured
/// tags with either reserved key are replaced.
pub(super) fn image_tags(config: &Config) -> Vec<Tag> {
    let mut tags: Vec<Tag> = config
        .cloud_config
        .tags
        .iter()
        .filter(|tag| tag.key != NAME_TAG_KEY && tag.key != OWNERSHIP_TAG_KEY)
        .cloned()
        .collect();
    tags.push(Tag::new(NAME_TAG_KEY, config.cloud_config.image_name.clone()));
    tags.push(Tag::new(OWNERSHIP_TAG_KEY, OWNERSHIP_TAG_VALUE));
    tags
}

pub(super) fn register_input(image_name: &str, snapshot_id: &str) -> RegisterImageInput {
    RegisterImageInput {
        name: registered_name(image_name),
        description: format!("nanos image {image_name}"),
        architecture: String::from(ARCHITECTURE),
        root_device_name: String::from(ROOT_DEVICE),
        virtualization_type: String::from(VIRTUALIZATION),
        ena_support: false,
        block_device_mappings: vec![BlockDeviceMapping {
            device_name: String::from(ROOT_DEVICE),
            ebs: EbsBlockDevice {
                delete_on_termination: false,
                snapshot_id: snapshot_id.to_owned(),
                volume_type: String::from(ROOT_VOLUME_TYPE),
            },
        }],
    }
}

impl<R: CommandRunner> AwsProvider<R> {
    pub(super) async fn create_from_artifact(
        &self,
        ctx: &Context,
        artifact: &Utf8Path,
    ) -> Result<(), OpsError> {
        let config = ctx.config();
        let bucket = config.cloud_config.bucket_name.as_str();
        let key = config.cloud_config.image_name.as_str();

        info!(bucket, key, "Uploading image file to s3");
        self.storage.copy_to_bucket(config, artifact)?;

        info!("Importing snapshot from s3 image file");
        let task_id = self
            .ec2
            .import_snapshot(bucket, key, &format!("nanos image {key}"))?;

        let snapshot_id =
            wait_for_snapshot(&self.ec2, &task_id, self.import_policy, self.pause.as_ref()).await?;

        info!("Deleting s3 image file");
        if let Err(err) = self.storage.delete_from_bucket(config, key) {
            warn!(
                snapshot = %snapshot_id,
                "staged object could not be removed; imported snapshot is left untagged"
            );
            return Err(OpsError::Storage(format!(
                "{err} (imported snapshot {snapshot_id} left in place)"
            )));
        }

        let tags = image_tags(config);
        info!(snapshot = %snapshot_id, "Tagging snapshot");
        self.ec2.create_tags(&snapshot_id, &tags)?;

        info!("Registering image");
        let image_id = self.ec2.register_image(&register_input(key, &snapshot_id))?;

        info!(image = %image_id, "Tagging image");
        self.ec2.create_tags(&image_id, &tags)?;
        Ok(())
    }
}
