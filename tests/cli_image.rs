//! End-to-end checks of `unikops image` failures that never reach a
//! provider.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn home() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn unikops(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("unikops");
    cmd.env("HOME", home.path())
        .env("OPS_HOME_DIR", home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[rstest]
fn aws_create_without_bucket_fails_before_building(home: TempDir) {
    unikops(&home)
        .args(["image", "create", "-t", "aws", "-a", "/bin/hello"])
        .assert()
        .failure()
        .stdout("")
        .stderr(contains("CloudConfig.BucketName"));
}

#[rstest]
fn aws_resize_is_unsupported(home: TempDir) {
    unikops(&home)
        .args(["image", "resize", "hello", "2G", "-t", "aws"])
        .assert()
        .failure()
        .stderr(contains("not supported"));
}

#[rstest]
fn sync_from_a_cloud_source_is_not_implemented(home: TempDir) {
    unikops(&home)
        .args(["image", "sync", "hello", "-s", "gcp", "-t", "aws"])
        .assert()
        .failure()
        .stderr(contains("gcp sync not yet implemented"));
}

#[rstest]
fn listing_an_empty_store_prints_headers(home: TempDir) {
    unikops(&home)
        .args(["image", "list"])
        .assert()
        .success()
        .stdout(contains("NAME"));
}

#[rstest]
fn unknown_platform_is_rejected(home: TempDir) {
    unikops(&home)
        .args(["image", "list", "-t", "mainframe"])
        .assert()
        .failure()
        .stderr(contains("mainframe"));
}
