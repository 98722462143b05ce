//! Test support utilities shared across unit and integration tests.
//!
//! Every double here is `Send + Sync` and clones share state, so a test can
//! hand one clone to a provider and inspect the other afterwards.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::build::ImageBuilder;
use crate::config::Config;
use crate::error::OpsError;
use crate::local_fs;
use crate::package::PackageSource;
use crate::poll::Pause;
use crate::process::{CommandOutput, CommandRunner, SpawnError};
use crate::storage::ObjectStorage;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns `true` when any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|arg| arg.to_string_lossy() == needle)
    }

    /// Returns the argument following `flag`, if present.
    #[must_use]
    pub fn value_of(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .skip_while(|arg| arg.to_string_lossy() != flag)
            .nth(1)
            .map(|arg| arg.to_string_lossy().into_owned())
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Returns invocations whose arguments include `needle`.
    #[must_use]
    pub fn invocations_with(&self, needle: &str) -> Vec<CommandInvocation> {
        lock(&self.invocations)
            .iter()
            .filter(|call| call.has_arg(needle))
            .cloned()
            .collect()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status with `stdout`.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }

    /// Number of responses not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| SpawnError {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// One call recorded by [`FakeBuilder`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildRecord {
    /// Configuration handed to the builder.
    pub config: Config,
    /// Extracted package directory for package builds.
    pub package_dir: Option<Utf8PathBuf>,
}

/// Image builder that records requests and writes a placeholder artifact.
#[derive(Clone, Debug, Default)]
pub struct FakeBuilder {
    builds: Arc<Mutex<Vec<BuildRecord>>>,
    failure: Option<String>,
}

impl FakeBuilder {
    /// Creates a builder that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder whose every build fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            builds: Arc::default(),
            failure: Some(message.into()),
        }
    }

    /// Returns the recorded builds.
    #[must_use]
    pub fn builds(&self) -> Vec<BuildRecord> {
        lock(&self.builds).clone()
    }

    fn record(&self, config: &Config, package_dir: Option<&Utf8Path>) -> Result<(), OpsError> {
        lock(&self.builds).push(BuildRecord {
            config: config.clone(),
            package_dir: package_dir.map(Utf8Path::to_path_buf),
        });
        if let Some(message) = &self.failure {
            return Err(OpsError::Build(message.clone()));
        }
        let artifact = &config.run_config.image_path;
        if artifact.as_str().is_empty() {
            return Ok(());
        }
        local_fs::write_file(artifact, b"unikernel image")
    }
}

impl ImageBuilder for FakeBuilder {
    fn build_image(&self, config: &Config) -> Result<(), OpsError> {
        self.record(config, None)
    }

    fn build_image_from_package(
        &self,
        package_dir: &Utf8Path,
        config: &Config,
    ) -> Result<(), OpsError> {
        self.record(config, Some(package_dir))
    }
}

/// Call recorded by [`FakeStorage`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageCall {
    /// Upload of a local file.
    Copy {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
        /// Local source path.
        local: Utf8PathBuf,
    },
    /// Removal of an object.
    Delete {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
    },
}

/// In-memory object storage that records calls and can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct FakeStorage {
    calls: Arc<Mutex<Vec<StorageCall>>>,
    fail_copy: Arc<Mutex<Option<String>>>,
    fail_delete: Arc<Mutex<Option<String>>>,
}

impl FakeStorage {
    /// Creates storage that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent uploads fail with `message`.
    pub fn fail_copy(&self, message: impl Into<String>) {
        *lock(&self.fail_copy) = Some(message.into());
    }

    /// Makes subsequent removals fail with `message`.
    pub fn fail_delete(&self, message: impl Into<String>) {
        *lock(&self.fail_delete) = Some(message.into());
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<StorageCall> {
        lock(&self.calls).clone()
    }
}

impl ObjectStorage for FakeStorage {
    fn copy_to_bucket(&self, config: &Config, local: &Utf8Path) -> Result<(), OpsError> {
        lock(&self.calls).push(StorageCall::Copy {
            bucket: config.cloud_config.bucket_name.clone(),
            key: config.cloud_config.image_name.clone(),
            local: local.to_path_buf(),
        });
        lock(&self.fail_copy)
            .clone()
            .map_or(Ok(()), |message| Err(OpsError::Storage(message)))
    }

    fn delete_from_bucket(&self, config: &Config, key: &str) -> Result<(), OpsError> {
        lock(&self.calls).push(StorageCall::Delete {
            bucket: config.cloud_config.bucket_name.clone(),
            key: key.to_owned(),
        });
        lock(&self.fail_delete)
            .clone()
            .map_or(Ok(()), |message| Err(OpsError::Storage(message)))
    }
}

/// Package source resolving names from a fixed map.
#[derive(Clone, Debug, Default)]
pub struct FakePackages {
    packages: BTreeMap<String, Utf8PathBuf>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakePackages {
    /// Registers `name` as extracted at `dir`.
    #[must_use]
    pub fn with_package(mut self, name: impl Into<String>, dir: impl Into<Utf8PathBuf>) -> Self {
        self.packages.insert(name.into(), dir.into());
        self
    }

    /// Returns the requested package names in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

impl PackageSource for FakePackages {
    fn download_and_extract(&self, name: &str) -> Result<Utf8PathBuf, OpsError> {
        lock(&self.requests).push(name.to_owned());
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| OpsError::Package(format!("package '{name}' not found")))
    }
}

/// [`Pause`] that records requested durations and returns immediately.
#[derive(Clone, Debug, Default)]
pub struct InstantPause {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl InstantPause {
    /// Creates a pause with no recorded waits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested pause.
    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        lock(&self.pauses).clone()
    }
}

impl Pause for InstantPause {
    fn pause(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        lock(&self.pauses).push(duration);
        Box::pin(async {})
    }
}
