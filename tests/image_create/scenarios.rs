//! BDD scenarios for the image creation workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{CreateContext, create_context};

#[scenario(
    path = "tests/features/image_create.feature",
    name = "Import completes after polling and the image is registered"
)]
fn scenario_import_completes(create_context: CreateContext) {
    let _ = create_context;
}

#[scenario(
    path = "tests/features/image_create.feature",
    name = "A failed import stops the workflow"
)]
fn scenario_import_fails(create_context: CreateContext) {
    let _ = create_context;
}

#[scenario(
    path = "tests/features/image_create.feature",
    name = "An import that never settles times out"
)]
fn scenario_import_times_out(create_context: CreateContext) {
    let _ = create_context;
}
