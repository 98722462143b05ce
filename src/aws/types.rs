//! JSON shapes exchanged with the `aws ec2` command-line client.

use serde::{Deserialize, Serialize};

use crate::config::Tag;

/// Key of the tag marking resources created by this tool.
pub const OWNERSHIP_TAG_KEY: &str = "CreatedBy";
/// Value of the ownership tag.
pub const OWNERSHIP_TAG_VALUE: &str = "ops";
/// Key of the tag carrying the display name.
pub const NAME_TAG_KEY: &str = "Name";

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct UserBucket {
    pub(super) s3_bucket: String,
    pub(super) s3_key: String,
}

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SnapshotDiskContainer {
    pub(super) description: String,
    pub(super) format: String,
    pub(super) user_bucket: UserBucket,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct ImportSnapshotOutput {
    pub(super) import_task_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SnapshotTaskDetail {
    #[serde(default)]
    pub(super) status: String,
    #[serde(default)]
    pub(super) snapshot_id: Option<String>,
    #[serde(default)]
    pub(super) status_message: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct ImportSnapshotTask {
    #[serde(default)]
    pub(super) snapshot_task_detail: SnapshotTaskDetail,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeImportSnapshotTasksOutput {
    #[serde(default)]
    pub(super) import_snapshot_tasks: Vec<ImportSnapshotTask>,
}

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct EbsBlockDevice {
    pub(super) delete_on_termination: bool,
    pub(super) snapshot_id: String,
    pub(super) volume_type: String,
}

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct BlockDeviceMapping {
    pub(super) device_name: String,
    pub(super) ebs: EbsBlockDevice,
}

/// Input of `aws ec2 register-image`, passed as `--cli-input-json`.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RegisterImageInput {
    pub(super) name: String,
    pub(super) description: String,
    pub(super) architecture: String,
    pub(super) root_device_name: String,
    pub(super) virtualization_type: String,
    pub(super) ena_support: bool,
    pub(super) block_device_mappings: Vec<BlockDeviceMapping>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RegisterImageOutput {
    pub(super) image_id: String,
}

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Filter {
    pub(super) name: String,
    pub(super) values: Vec<String>,
}

impl Filter {
    pub(super) fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            values: vec![value.to_owned()],
        }
    }

    pub(super) fn ownership() -> Self {
        Self::new(&format!("tag:{OWNERSHIP_TAG_KEY}"), OWNERSHIP_TAG_VALUE)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct EbsDescription {
    #[serde(default)]
    pub(super) snapshot_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct BlockDeviceDescription {
    #[serde(default)]
    pub(super) device_name: Option<String>,
    #[serde(default)]
    pub(super) ebs: Option<EbsDescription>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct Ec2Image {
    pub(super) image_id: String,
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) state: Option<String>,
    #[serde(default)]
    pub(super) creation_date: Option<String>,
    #[serde(default)]
    pub(super) root_device_name: Option<String>,
    #[serde(default)]
    pub(super) tags: Vec<Tag>,
    #[serde(default)]
    pub(super) block_device_mappings: Vec<BlockDeviceDescription>,
}

impl Ec2Image {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
    }

    pub(super) fn is_owned(&self) -> bool {
        self.tag(OWNERSHIP_TAG_KEY) == Some(OWNERSHIP_TAG_VALUE)
    }

    pub(super) fn display_name(&self) -> &str {
        self.tag(NAME_TAG_KEY).unwrap_or("n/a")
    }

    /// Snapshot backing the root device, falling back to the first EBS
    /// mapping that names one.
    pub(super) fn root_snapshot_id(&self) -> Option<&str> {
        self.block_device_mappings
            .iter()
            .filter(|mapping| {
                mapping.device_name.is_some() && mapping.device_name == self.root_device_name
            })
            .find_map(BlockDeviceDescription::snapshot_id)
            .or_else(|| {
                self.block_device_mappings
                    .iter()
                    .find_map(BlockDeviceDescription::snapshot_id)
            })
    }
}

impl BlockDeviceDescription {
    fn snapshot_id(&self) -> Option<&str> {
        self.ebs.as_ref().and_then(|ebs| ebs.snapshot_id.as_deref())
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeImagesOutput {
    #[serde(default)]
    pub(super) images: Vec<Ec2Image>,
}
