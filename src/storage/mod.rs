//! Object storage used to stage disk images before a provider imports them.
//!
//! The production client drives `aws s3 cp` / `aws s3 rm` through a
//! [`CommandRunner`]. Objects are keyed by the configured image name inside
//! the configured bucket.

use std::ffi::OsString;

use camino::Utf8Path;
use tracing::debug;

use crate::config::Config;
use crate::error::OpsError;
use crate::process::{CommandRunner, success_stdout};

/// Narrow object storage interface consumed by cloud providers.
pub trait ObjectStorage: Send + Sync {
    /// Uploads `local` to the configured bucket under the image name.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Storage`] when the upload fails.
    fn copy_to_bucket(&self, config: &Config, local: &Utf8Path) -> Result<(), OpsError>;

    /// Removes the object named `key` from the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Storage`] when the removal fails.
    fn delete_from_bucket(&self, config: &Config, key: &str) -> Result<(), OpsError>;
}

/// S3 client backed by the AWS command-line tool.
#[derive(Clone, Debug)]
pub struct S3Storage<R: CommandRunner> {
    runner: R,
    aws_bin: String,
}

impl<R: CommandRunner> S3Storage<R> {
    /// Creates a client that invokes `aws_bin` through `runner`.
    #[must_use]
    pub fn new(runner: R, aws_bin: impl Into<String>) -> Self {
        Self {
            runner,
            aws_bin: aws_bin.into(),
        }
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), OpsError> {
        let output = self
            .runner
            .run(&self.aws_bin, &args)
            .map_err(|err| OpsError::Storage(err.to_string()))?;
        success_stdout(&self.aws_bin, output)
            .map(|_| ())
            .map_err(OpsError::Storage)
    }
}

/// Renders `s3://<bucket>/<key>`.
#[must_use]
pub fn object_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

fn target_uri(config: &Config, key: &str) -> Result<String, OpsError> {
    let bucket = config.cloud_config.bucket_name.trim();
    if bucket.is_empty() {
        return Err(OpsError::Storage(String::from(
            "no bucket configured (CloudConfig.BucketName)",
        )));
    }
    if key.trim().is_empty() {
        return Err(OpsError::Storage(String::from(
            "no object key configured (CloudConfig.ImageName)",
        )));
    }
    Ok(object_uri(bucket, key))
}

fn push_region(args: &mut Vec<OsString>, config: &Config) {
    let zone = config.cloud_config.zone.trim();
    if !zone.is_empty() {
        args.push(OsString::from("--region"));
        args.push(OsString::from(zone));
    }
}

impl<R: CommandRunner> ObjectStorage for S3Storage<R> {
    fn copy_to_bucket(&self, config: &Config, local: &Utf8Path) -> Result<(), OpsError> {
        let uri = target_uri(config, &config.cloud_config.image_name)?;
        debug!(%uri, source = %local, "uploading image");
        let mut args = vec![
            OsString::from("s3"),
            OsString::from("cp"),
            OsString::from(local.as_str()),
            OsString::from(uri),
        ];
        push_region(&mut args, config);
        self.run(args)
    }

    fn delete_from_bucket(&self, config: &Config, key: &str) -> Result<(), OpsError> {
        let uri = target_uri(config, key)?;
        debug!(%uri, "removing staged object");
        let mut args = vec![OsString::from("s3"), OsString::from("rm"), OsString::from(uri)];
        push_region(&mut args, config);
        self.run(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloudConfig;
    use crate::test_support::ScriptedRunner;
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> Config {
        Config {
            cloud_config: CloudConfig {
                platform: String::from("aws"),
                bucket_name: String::from("staging"),
                zone: String::from("eu-west-1"),
                image_name: String::from("hello"),
                tags: Vec::new(),
            },
            ..Config::default()
        }
    }

    #[rstest]
    fn copy_uploads_under_image_name(config: Config) {
        let runner = ScriptedRunner::new();
        runner.push_success();
        let storage = S3Storage::new(runner.clone(), "aws");

        storage
            .copy_to_bucket(&config, Utf8Path::new("/tmp/hello.img"))
            .expect("upload succeeds");

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls.first().map(|call| call.command_string()).as_deref(),
            Some("aws s3 cp /tmp/hello.img s3://staging/hello --region eu-west-1")
        );
    }

    #[rstest]
    fn delete_reports_storage_failure(config: Config) {
        let runner = ScriptedRunner::new();
        runner.push_output(Some(1), "", "NoSuchKey");
        let storage = S3Storage::new(runner, "aws");

        let err = storage
            .delete_from_bucket(&config, "hello")
            .expect_err("rm fails");

        assert!(
            matches!(err, OpsError::Storage(ref message) if message.contains("NoSuchKey")),
            "{err}"
        );
    }

    #[rstest]
    fn missing_bucket_is_rejected_without_a_call(mut config: Config) {
        config.cloud_config.bucket_name.clear();
        let runner = ScriptedRunner::new();
        let storage = S3Storage::new(runner.clone(), "aws");

        let err = storage
            .copy_to_bucket(&config, Utf8Path::new("/tmp/hello.img"))
            .expect_err("bucket required");

        assert!(matches!(err, OpsError::Storage(_)));
        assert!(runner.invocations().is_empty());
    }
}
