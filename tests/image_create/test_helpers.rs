//! Shared fixtures and helpers for image creation scenarios.

use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use unikops::aws::AwsProvider;
use unikops::config::{CloudConfig, Config};
use unikops::context::Context;
use unikops::poll::PollPolicy;
use unikops::test_support::{FakeBuilder, FakeStorage, InstantPause, ScriptedRunner};

/// Attempt budget used by every scenario.
pub const MAX_POLLS: u32 = 6;

#[derive(Clone, Debug)]
pub struct CreateContext {
    pub cloud: Option<CloudConfig>,
    pub runner: ScriptedRunner,
    pub storage: FakeStorage,
    pub pause: InstantPause,
    pub outcome: Option<Result<(), String>>,
}

#[fixture]
pub fn create_context() -> CreateContext {
    CreateContext {
        cloud: None,
        runner: ScriptedRunner::new(),
        storage: FakeStorage::new(),
        pause: InstantPause::new(),
        outcome: None,
    }
}

impl CreateContext {
    pub fn provider(&self) -> (AwsProvider<ScriptedRunner>, Context) {
        let cloud = self
            .cloud
            .clone()
            .unwrap_or_else(|| panic!("test setup requires an aws target"));
        let provider = AwsProvider::new(
            self.runner.clone(),
            "aws",
            cloud.clone(),
            Arc::new(FakeBuilder::new()),
            Arc::new(self.storage.clone()),
        )
        .with_pause(Arc::new(self.pause.clone()))
        .with_import_policy(PollPolicy::new(Duration::from_secs(15), MAX_POLLS));
        let ctx = Context::new(Config {
            cloud_config: cloud,
            ..Config::default()
        });
        (provider, ctx)
    }

    pub fn operation_count(&self, operation: &str) -> usize {
        self.runner.invocations_with(operation).len()
    }
}

pub fn task_status(status: &str, snapshot: Option<&str>) -> String {
    let snapshot_field =
        snapshot.map_or_else(String::new, |id| format!(r#","SnapshotId":"{id}""#));
    format!(
        r#"{{"ImportSnapshotTasks":[{{"SnapshotTaskDetail":{{"Status":"{status}"{snapshot_field}}}}}]}}"#
    )
}
