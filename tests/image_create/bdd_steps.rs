//! BDD step definitions for the image creation workflow.

use camino::Utf8Path;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use unikops::config::CloudConfig;
use unikops::provider::Provider;
use unikops::test_support::StorageCall;

use super::test_helpers::{CreateContext, MAX_POLLS, task_status};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an aws target with bucket \"{bucket}\" and image \"{image}\"")]
fn aws_target(mut create_context: CreateContext, bucket: String, image: String) -> CreateContext {
    create_context.cloud = Some(CloudConfig {
        platform: String::from("aws"),
        bucket_name: bucket,
        zone: String::from("us-east-1"),
        image_name: image,
        tags: Vec::new(),
    });
    create_context
}

#[given("the snapshot import stays active for {polls:u32} polls then completes as \"{snapshot}\"")]
fn import_completes(create_context: CreateContext, polls: u32, snapshot: String) -> CreateContext {
    let runner = &create_context.runner;
    runner.push_stdout(r#"{"ImportTaskId":"import-snap-1"}"#);
    runner.push_stdout(task_status("active", None)); // handle validation
    for _ in 0..polls {
        runner.push_stdout(task_status("active", None));
    }
    runner.push_stdout(task_status("completed", Some(snapshot.as_str())));
    runner.push_success(); // tag snapshot
    create_context
}

#[given("registration returns image \"{image_id}\"")]
fn registration_returns(create_context: CreateContext, image_id: String) -> CreateContext {
    create_context
        .runner
        .push_stdout(format!(r#"{{"ImageId":"{image_id}"}}"#));
    create_context.runner.push_success(); // tag image
    create_context
}

#[given("the snapshot import fails with status \"{status}\"")]
fn import_fails(create_context: CreateContext, status: String) -> CreateContext {
    let runner = &create_context.runner;
    runner.push_stdout(r#"{"ImportTaskId":"import-snap-1"}"#);
    runner.push_stdout(task_status("active", None));
    runner.push_stdout(task_status(&status, None));
    create_context
}

#[given("the snapshot import never settles")]
fn import_never_settles(create_context: CreateContext) -> CreateContext {
    let runner = &create_context.runner;
    runner.push_stdout(r#"{"ImportTaskId":"import-snap-1"}"#);
    for _ in 0..=MAX_POLLS {
        runner.push_stdout(task_status("active", None));
    }
    create_context
}

#[when("I create the image from \"{artifact}\"")]
fn create_image(
    mut create_context: CreateContext,
    artifact: String,
) -> Result<CreateContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let (provider, ctx) = create_context.provider();
    let result = runtime.block_on(async {
        provider
            .create_image(&ctx, Utf8Path::new(artifact.as_str()))
            .await
    });
    create_context.outcome = Some(result.map_err(|err| err.to_string()));
    Ok(create_context)
}

#[then("the image creation succeeds")]
fn creation_succeeds(create_context: &CreateContext) -> Result<(), StepError> {
    match create_context.outcome.as_ref() {
        Some(Ok(())) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected success, got {other:?}"
        ))),
    }
}

#[then("the image creation fails mentioning \"{needle}\"")]
fn creation_fails(create_context: &CreateContext, needle: String) -> Result<(), StepError> {
    match create_context.outcome.as_ref() {
        Some(Err(message)) if message.contains(needle.as_str()) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure mentioning {needle}, got {other:?}"
        ))),
    }
}

#[then("the snapshot import was polled {polls:u32} times")]
fn import_polled(create_context: &CreateContext, polls: u32) -> Result<(), StepError> {
    // One describe validates the task handle before polling starts.
    let expected = usize::try_from(polls).unwrap_or(usize::MAX);
    let describes = create_context.operation_count("describe-import-snapshot-tasks");
    let pauses = create_context.pause.pauses().len();
    if describes == expected + 1 && pauses + 1 == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {polls} polls, saw {describes} describes and {pauses} pauses"
        )))
    }
}

#[then("the staged object \"{key}\" was removed from \"{bucket}\"")]
fn staged_object_removed(
    create_context: &CreateContext,
    key: String,
    bucket: String,
) -> Result<(), StepError> {
    let expected = StorageCall::Delete { bucket, key };
    let calls = create_context.storage.calls();
    if calls.last() == Some(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected:?} as the final storage call, got {calls:?}"
        )))
    }
}

#[then("resources \"{snapshot}\" and \"{image}\" carry the ownership tag")]
fn resources_tagged(
    create_context: &CreateContext,
    snapshot: String,
    image: String,
) -> Result<(), StepError> {
    let tagged: Vec<Option<String>> = create_context
        .runner
        .invocations_with("create-tags")
        .iter()
        .filter(|call| {
            call.value_of("--tags")
                .is_some_and(|tags| tags.contains(r#"{"Key":"CreatedBy","Value":"ops"}"#))
        })
        .map(|call| call.value_of("--resources"))
        .collect();
    if tagged == vec![Some(snapshot.clone()), Some(image.clone())] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {snapshot} then {image} to be tagged, got {tagged:?}"
        )))
    }
}

#[then("no image was registered")]
fn nothing_registered(create_context: &CreateContext) -> Result<(), StepError> {
    let registered = create_context.operation_count("register-image");
    let tagged = create_context.operation_count("create-tags");
    if registered == 0 && tagged == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no registration, saw {registered} register and {tagged} tag calls"
        )))
    }
}
