//! Unit tests for configuration loading, validation and merging.

use super::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn package_config() -> Config {
    Config {
        cloud_config: CloudConfig {
            platform: String::from("gcp"),
            bucket_name: String::from("pkg-bucket"),
            zone: String::from("us-west1-b"),
            image_name: String::from("node_v14"),
            tags: vec![Tag::new("team", "pkg")],
        },
        run_config: RunConfig {
            program: String::from("node"),
            args: vec![String::from("hi.js")],
            klibs: vec![String::from("ntp")],
            mounts: Vec::new(),
            image_path: Utf8PathBuf::from("/pkg/node.img"),
        },
        build_dir: Utf8PathBuf::from("/pkg/build"),
        nightly_build: Some(false),
        env: BTreeMap::from([(String::from("NODE_ENV"), String::from("production"))]),
    }
}

#[rstest]
fn merge_keeps_package_fields_when_cli_is_empty(package_config: Config) {
    let merged = merge(&package_config, &Config::default());
    assert_eq!(merged, package_config);
}

#[rstest]
fn merge_prefers_explicit_cli_fields(package_config: Config) {
    let cli = Config {
        cloud_config: CloudConfig {
            platform: String::from("aws"),
            bucket_name: String::from("cli-bucket"),
            ..CloudConfig::default()
        },
        run_config: RunConfig {
            args: vec![String::from("server.js"), String::from("--port=80")],
            ..RunConfig::default()
        },
        nightly_build: Some(true),
        ..Config::default()
    };

    let merged = merge(&package_config, &cli);

    assert_eq!(merged.cloud_config.platform, "aws");
    assert_eq!(merged.cloud_config.bucket_name, "cli-bucket");
    assert_eq!(merged.cloud_config.zone, "us-west1-b");
    assert_eq!(merged.cloud_config.image_name, "node_v14");
    assert_eq!(merged.cloud_config.tags, vec![Tag::new("team", "pkg")]);
    assert_eq!(merged.run_config.program, "node");
    assert_eq!(merged.run_config.args, cli.run_config.args);
    assert_eq!(merged.run_config.klibs, vec![String::from("ntp")]);
    assert_eq!(merged.build_dir, Utf8PathBuf::from("/pkg/build"));
    assert_eq!(merged.nightly_build, Some(true));
    assert_eq!(merged.env, package_config.env);
}

#[rstest]
fn merge_replaces_maps_wholesale(package_config: Config) {
    let cli = Config {
        env: BTreeMap::from([(String::from("DEBUG"), String::from("1"))]),
        ..Config::default()
    };
    let merged = merge(&package_config, &cli);
    assert_eq!(merged.env, cli.env);
}

#[rstest]
#[case("", "bucket")]
#[case("   ", "")]
fn validate_target_requires_platform(#[case] platform: &str, #[case] bucket: &str) {
    let config = Config {
        cloud_config: CloudConfig {
            platform: platform.to_owned(),
            bucket_name: bucket.to_owned(),
            ..CloudConfig::default()
        },
        ..Config::default()
    };
    let err = config.validate_target().expect_err("platform is required");
    assert!(err.to_string().contains("CloudConfig.Platform"), "{err}");
}

#[rstest]
#[case("aws")]
#[case("gcp")]
#[case("azure")]
fn validate_target_requires_bucket_off_premises(#[case] platform: &str) {
    let config = Config {
        cloud_config: CloudConfig {
            platform: platform.to_owned(),
            ..CloudConfig::default()
        },
        ..Config::default()
    };
    let err = config.validate_target().expect_err("bucket is required");
    assert!(err.to_string().contains("CloudConfig.BucketName"), "{err}");
}

#[test]
fn validate_target_accepts_onprem_without_bucket() {
    let config = Config {
        cloud_config: CloudConfig {
            platform: String::from(LOCAL_PLATFORM),
            ..CloudConfig::default()
        },
        ..Config::default()
    };
    assert!(config.validate_target().is_ok());
}

#[test]
fn load_reads_pascal_case_json() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("config.json"))
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    std::fs::write(
        &path,
        r#"{
            "CloudConfig": {
                "Platform": "aws",
                "BucketName": "my-bucket",
                "Zone": "us-east-1",
                "Tags": [{"Key": "env", "Value": "dev"}]
            },
            "RunConfig": {"Klibs": ["ntp"], "Imagename": "/tmp/a.img"},
            "NightlyBuild": true,
            "Env": {"RADAR_KEY": "abc"}
        }"#,
    )
    .unwrap_or_else(|err| panic!("write config: {err}"));

    let config = Config::load(&path).unwrap_or_else(|err| panic!("load config: {err}"));

    assert_eq!(config.cloud_config.platform, "aws");
    assert_eq!(config.cloud_config.bucket_name, "my-bucket");
    assert_eq!(config.cloud_config.tags, vec![Tag::new("env", "dev")]);
    assert_eq!(config.run_config.klibs, vec![String::from("ntp")]);
    assert_eq!(config.run_config.image_path, Utf8PathBuf::from("/tmp/a.img"));
    assert!(config.is_nightly());
    assert!(config.env.contains_key("RADAR_KEY"));
}

#[test]
fn load_with_empty_path_returns_defaults() {
    let config = Config::load(Utf8Path::new("")).expect("empty path is allowed");
    assert_eq!(config, Config::default());
}

#[test]
fn load_reports_missing_file() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("absent.json"))
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    let err = Config::load(&path).expect_err("missing file should fail");
    assert!(matches!(err, ConfigError::Read { .. }), "{err:?}");
}

#[test]
fn load_reports_invalid_json() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("broken.json"))
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    std::fs::write(&path, "{not json").unwrap_or_else(|err| panic!("write: {err}"));
    let err = Config::load(&path).expect_err("invalid json should fail");
    assert!(matches!(err, ConfigError::Parse { .. }), "{err:?}");
}
