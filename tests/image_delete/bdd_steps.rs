//! BDD step definitions for image inventory and deletion.

use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use unikops::provider::Provider;

use super::test_helpers::{InventoryContext, InventoryOutcome, image, images};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

const OWNED: [(&str, &str); 2] = [("Name", "hello"), ("CreatedBy", "ops")];

#[given("an aws account in \"{zone}\"")]
fn aws_account(mut inventory_context: InventoryContext, zone: String) -> InventoryContext {
    inventory_context.zone = Some(zone);
    inventory_context
}

#[given("the account holds owned image \"{name}\" as \"{image_id}\" backed by \"{snapshot}\"")]
fn owned_image(
    inventory_context: InventoryContext,
    name: String,
    image_id: String,
    snapshot: String,
) -> InventoryContext {
    let runner = &inventory_context.runner;
    runner.push_stdout(images(&[image(&image_id, &name, &OWNED, &snapshot)]));
    runner.push_success(); // deregister
    runner.push_success(); // delete snapshot
    inventory_context
}

#[given("the account holds no images")]
fn no_images(inventory_context: InventoryContext) -> InventoryContext {
    inventory_context.runner.push_stdout(images(&[]));
    inventory_context
}

#[given("the account holds owned image \"{name}\" as \"{image_id}\" and untagged image \"{stranger}\"")]
fn owned_and_untagged(
    inventory_context: InventoryContext,
    name: String,
    image_id: String,
    stranger: String,
) -> InventoryContext {
    inventory_context.runner.push_stdout(images(&[
        image(&image_id, &name, &OWNED, "snap-1"),
        image("ami-9", &stranger, &[("Name", "other")], "snap-9"),
    ]));
    inventory_context
}

#[when("I delete image \"{name}\"")]
fn delete_image(
    mut inventory_context: InventoryContext,
    name: String,
) -> Result<InventoryContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let (provider, ctx) = inventory_context.provider();
    let result = runtime.block_on(async { provider.delete_image(&ctx, &name).await });
    inventory_context.outcome = Some(InventoryOutcome::Deleted(
        result.map_err(|err| err.to_string()),
    ));
    Ok(inventory_context)
}

#[when("I list images")]
fn list_images(mut inventory_context: InventoryContext) -> Result<InventoryContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let (provider, ctx) = inventory_context.provider();
    let mut out: Vec<u8> = Vec::new();
    let result = runtime.block_on(async { provider.list_images(&ctx, &mut out).await });
    let listing = result
        .map(|()| String::from_utf8_lossy(&out).into_owned())
        .map_err(|err| err.to_string());
    inventory_context.outcome = Some(InventoryOutcome::Listed(listing));
    Ok(inventory_context)
}

#[then("the deletion succeeds")]
fn deletion_succeeds(inventory_context: &InventoryContext) -> Result<(), StepError> {
    match inventory_context.outcome.as_ref() {
        Some(InventoryOutcome::Deleted(Ok(()))) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected deletion to succeed, got {other:?}"
        ))),
    }
}

#[then("the deletion fails mentioning \"{needle}\"")]
fn deletion_fails(inventory_context: &InventoryContext, needle: String) -> Result<(), StepError> {
    match inventory_context.outcome.as_ref() {
        Some(InventoryOutcome::Deleted(Err(message))) if message.contains(needle.as_str()) => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected deletion to fail with {needle}, got {other:?}"
        ))),
    }
}

fn argument_of(
    inventory_context: &InventoryContext,
    operation: &str,
    flag: &str,
) -> Option<String> {
    inventory_context
        .runner
        .invocations_with(operation)
        .first()
        .and_then(|call| call.value_of(flag))
}

#[then("image \"{image_id}\" was deregistered")]
fn image_deregistered(
    inventory_context: &InventoryContext,
    image_id: String,
) -> Result<(), StepError> {
    let actual = argument_of(inventory_context, "deregister-image", "--image-id");
    if actual.as_deref() == Some(image_id.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {image_id} to be deregistered, got {actual:?}"
        )))
    }
}

#[then("snapshot \"{snapshot}\" was deleted")]
fn snapshot_deleted(
    inventory_context: &InventoryContext,
    snapshot: String,
) -> Result<(), StepError> {
    let actual = argument_of(inventory_context, "delete-snapshot", "--snapshot-id");
    if actual.as_deref() == Some(snapshot.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {snapshot} to be deleted, got {actual:?}"
        )))
    }
}

#[then("no destructive call was made")]
fn nothing_destroyed(inventory_context: &InventoryContext) -> Result<(), StepError> {
    let destructive = inventory_context.runner.invocations_with("deregister-image").len()
        + inventory_context.runner.invocations_with("delete-snapshot").len();
    if destructive == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no destructive calls, saw {destructive}"
        )))
    }
}

fn listing(inventory_context: &InventoryContext) -> Result<&str, StepError> {
    match inventory_context.outcome.as_ref() {
        Some(InventoryOutcome::Listed(Ok(rendered))) => Ok(rendered.as_str()),
        other => Err(StepError::Assertion(format!(
            "expected a listing, got {other:?}"
        ))),
    }
}

#[then("the listing shows \"{name}\"")]
fn listing_shows(inventory_context: &InventoryContext, name: String) -> Result<(), StepError> {
    let rendered = listing(inventory_context)?;
    if rendered.contains(name.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {name} in listing:\n{rendered}"
        )))
    }
}

#[then("the listing does not show \"{name}\"")]
fn listing_hides(inventory_context: &InventoryContext, name: String) -> Result<(), StepError> {
    let rendered = listing(inventory_context)?;
    if rendered.contains(name.as_str()) {
        Err(StepError::Assertion(format!(
            "expected {name} to be hidden:\n{rendered}"
        )))
    } else {
        Ok(())
    }
}
