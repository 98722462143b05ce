//! Shared fixtures and helpers for inventory scenarios.

use std::sync::Arc;

use rstest::fixture;
use unikops::aws::AwsProvider;
use unikops::config::{CloudConfig, Config};
use unikops::context::Context;
use unikops::test_support::{FakeBuilder, FakeStorage, ScriptedRunner};

#[derive(Clone, Debug)]
pub enum InventoryOutcome {
    Deleted(Result<(), String>),
    Listed(Result<String, String>),
}

#[derive(Clone, Debug)]
pub struct InventoryContext {
    pub zone: Option<String>,
    pub runner: ScriptedRunner,
    pub outcome: Option<InventoryOutcome>,
}

#[fixture]
pub fn inventory_context() -> InventoryContext {
    InventoryContext {
        zone: None,
        runner: ScriptedRunner::new(),
        outcome: None,
    }
}

impl InventoryContext {
    pub fn provider(&self) -> (AwsProvider<ScriptedRunner>, Context) {
        let cloud = CloudConfig {
            platform: String::from("aws"),
            zone: self
                .zone
                .clone()
                .unwrap_or_else(|| panic!("test setup requires an aws account")),
            ..CloudConfig::default()
        };
        let provider = AwsProvider::new(
            self.runner.clone(),
            "aws",
            cloud.clone(),
            Arc::new(FakeBuilder::new()),
            Arc::new(FakeStorage::new()),
        );
        let ctx = Context::new(Config {
            cloud_config: cloud,
            ..Config::default()
        });
        (provider, ctx)
    }
}

/// One `describe-images` entry with the given tags and root snapshot.
pub fn image(image_id: &str, name: &str, tags: &[(&str, &str)], snapshot: &str) -> String {
    let tags_json = tags
        .iter()
        .map(|(key, value)| format!(r#"{{"Key":"{key}","Value":"{value}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        concat!(
            r#"{{"ImageId":"{image_id}","Name":"{name}","State":"available","#,
            r#""CreationDate":"2024-05-01T10:00:00.000Z","RootDeviceName":"/dev/sda1","#,
            r#""Tags":[{tags_json}],"BlockDeviceMappings":[{{"DeviceName":"/dev/sda1","#,
            r#""Ebs":{{"SnapshotId":"{snapshot}"}}}}]}}"#
        ),
        image_id = image_id,
        name = name,
        tags_json = tags_json,
        snapshot = snapshot,
    )
}

pub fn images(entries: &[String]) -> String {
    format!(r#"{{"Images":[{}]}}"#, entries.join(","))
}
