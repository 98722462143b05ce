//! Thin EC2 client that shells out to `aws ec2 ... --output json`.

use std::ffi::OsString;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    DescribeImagesOutput, DescribeImportSnapshotTasksOutput, Ec2Image, Filter,
    ImportSnapshotOutput, ImportSnapshotTask, RegisterImageInput, RegisterImageOutput,
    SnapshotDiskContainer, UserBucket,
};
use crate::config::Tag;
use crate::error::OpsError;
use crate::process::{CommandRunner, success_stdout};

/// Raw disk format accepted by snapshot imports.
const RAW_FORMAT: &str = "raw";

#[derive(Clone, Debug)]
pub(super) struct Ec2Cli<R: CommandRunner> {
    runner: R,
    aws_bin: String,
    region: String,
}

fn to_json<T: Serialize>(value: &T, operation: &str) -> Result<String, OpsError> {
    serde_json::to_string(value).map_err(|err| OpsError::Provider {
        message: format!("failed to encode {operation} input: {err}"),
    })
}

impl<R: CommandRunner> Ec2Cli<R> {
    pub(super) fn new(runner: R, aws_bin: String, region: String) -> Self {
        Self {
            runner,
            aws_bin,
            region,
        }
    }

    fn args(&self, operation: &str, extra: Vec<OsString>) -> Vec<OsString> {
        let mut args = vec![OsString::from("ec2"), OsString::from(operation)];
        args.extend(extra);
        if !self.region.trim().is_empty() {
            args.push(OsString::from("--region"));
            args.push(OsString::from(self.region.trim()));
        }
        args.push(OsString::from("--output"));
        args.push(OsString::from("json"));
        args
    }

    fn call(&self, operation: &str, extra: Vec<OsString>) -> Result<String, OpsError> {
        let args = self.args(operation, extra);
        let output = self.runner.run(&self.aws_bin, &args)?;
        success_stdout(&self.aws_bin, output).map_err(|message| OpsError::Provider {
            message: format!("{operation}: {message}"),
        })
    }

    fn call_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        extra: Vec<OsString>,
    ) -> Result<T, OpsError> {
        let stdout = self.call(operation, extra)?;
        serde_json::from_str(&stdout).map_err(|err| OpsError::Provider {
            message: format!("failed to parse {operation} output: {err}"),
        })
    }

    pub(super) fn import_snapshot(
        &self,
        bucket: &str,
        key: &str,
        description: &str,
    ) -> Result<String, OpsError> {
        let container = SnapshotDiskContainer {
            description: description.to_owned(),
            format: String::from(RAW_FORMAT),
            user_bucket: UserBucket {
                s3_bucket: bucket.to_owned(),
                s3_key: key.to_owned(),
            },
        };
        let output: ImportSnapshotOutput = self.call_json(
            "import-snapshot",
            vec![
                OsString::from("--description"),
                OsString::from(description),
                OsString::from("--disk-container"),
                OsString::from(to_json(&container, "import-snapshot")?),
            ],
        )?;
        Ok(output.import_task_id)
    }

    pub(super) fn describe_import_snapshot_tasks(
        &self,
        task_id: &str,
    ) -> Result<Vec<ImportSnapshotTask>, OpsError> {
        let output: DescribeImportSnapshotTasksOutput = self.call_json(
            "describe-import-snapshot-tasks",
            vec![OsString::from("--import-task-ids"), OsString::from(task_id)],
        )?;
        Ok(output.import_snapshot_tasks)
    }

    pub(super) fn create_tags(&self, resource: &str, tags: &[Tag]) -> Result<(), OpsError> {
        self.call(
            "create-tags",
            vec![
                OsString::from("--resources"),
                OsString::from(resource),
                OsString::from("--tags"),
                OsString::from(to_json(&tags, "create-tags")?),
            ],
        )
        .map(|_| ())
    }

    pub(super) fn register_image(&self, input: &RegisterImageInput) -> Result<String, OpsError> {
        let output: RegisterImageOutput = self.call_json(
            "register-image",
            vec![
                OsString::from("--cli-input-json"),
                OsString::from(to_json(input, "register-image")?),
            ],
        )?;
        Ok(output.image_id)
    }

    pub(super) fn describe_images(&self, filters: &[Filter]) -> Result<Vec<Ec2Image>, OpsError> {
        let output: DescribeImagesOutput = self.call_json(
            "describe-images",
            vec![
                OsString::from("--owners"),
                OsString::from("self"),
                OsString::from("--filters"),
                OsString::from(to_json(&filters, "describe-images")?),
            ],
        )?;
        Ok(output.images)
    }

    pub(super) fn deregister_image(&self, image_id: &str) -> Result<(), OpsError> {
        self.call(
            "deregister-image",
            vec![OsString::from("--image-id"), OsString::from(image_id)],
        )
        .map(|_| ())
    }

    pub(super) fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), OpsError> {
        self.call(
            "delete-snapshot",
            vec![OsString::from("--snapshot-id"), OsString::from(snapshot_id)],
        )
        .map(|_| ())
    }
}
