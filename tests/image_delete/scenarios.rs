//! BDD scenarios for image inventory and deletion.

use rstest_bdd_macros::scenario;

use super::test_helpers::{InventoryContext, inventory_context};

#[scenario(
    path = "tests/features/image_delete.feature",
    name = "Delete an owned image and its snapshot"
)]
fn scenario_delete_owned(inventory_context: InventoryContext) {
    let _ = inventory_context;
}

#[scenario(
    path = "tests/features/image_delete.feature",
    name = "Deleting an unknown image changes nothing"
)]
fn scenario_delete_unknown(inventory_context: InventoryContext) {
    let _ = inventory_context;
}

#[scenario(
    path = "tests/features/image_delete.feature",
    name = "Listing hides images without the ownership tag"
)]
fn scenario_listing_hides_untagged(inventory_context: InventoryContext) {
    let _ = inventory_context;
}
