//! `--mounts volume:path` parsing and resolution against the volume store.

use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{Config, Mount};
use crate::error::OpsError;
use crate::local_fs;

const VOLUME_EXTENSIONS: [&str; 2] = ["raw", "img"];

/// Parsed `volume:path` pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountSpec {
    /// Volume identifier or name inside the volume store.
    pub volume: String,
    /// Absolute mount point inside the unikernel.
    pub path: String,
}

impl FromStr for MountSpec {
    type Err = OpsError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| OpsError::InvalidMount {
            spec: spec.to_owned(),
            reason: reason.to_owned(),
        };
        let (volume, path) = spec
            .split_once(':')
            .ok_or_else(|| invalid("expected <volume_id:mount_path>"))?;
        let volume_id = volume.trim();
        let mount_path = path.trim();
        if volume_id.is_empty() {
            return Err(invalid("volume id is empty"));
        }
        if volume_id.contains('/') {
            return Err(invalid("volume id must not contain '/'"));
        }
        if !mount_path.starts_with('/') {
            return Err(invalid("mount path must be absolute"));
        }
        if mount_path.contains(':') {
            return Err(invalid("mount path must not contain ':'"));
        }
        Ok(Self {
            volume: volume_id.to_owned(),
            path: mount_path.to_owned(),
        })
    }
}

/// Parses every spec, failing on the first malformed entry or a mount point
/// used twice.
///
/// # Errors
///
/// Returns [`OpsError::InvalidMount`] for the offending entry.
pub fn parse_mounts(specs: &[String]) -> Result<Vec<MountSpec>, OpsError> {
    let mut parsed: Vec<MountSpec> = Vec::with_capacity(specs.len());
    for spec in specs {
        let mount: MountSpec = spec.parse()?;
        if parsed.iter().any(|seen| seen.path == mount.path) {
            return Err(OpsError::InvalidMount {
                spec: spec.clone(),
                reason: format!("mount path {} is used more than once", mount.path),
            });
        }
        parsed.push(mount);
    }
    Ok(parsed)
}

fn locate_volume(volumes_dir: &Utf8Path, spec: &MountSpec) -> Option<Utf8PathBuf> {
    VOLUME_EXTENSIONS
        .iter()
        .map(|ext| volumes_dir.join(format!("{}.{ext}", spec.volume)))
        .chain(std::iter::once(volumes_dir.join(&spec.volume)))
        .find(|candidate| local_fs::file_exists(candidate))
}

/// Returns a copy of `config` with `specs` resolved against `volumes_dir`
/// and appended to the run configuration's mounts.
///
/// All entries are parsed before any volume is looked up, so a malformed
/// entry is reported even when an earlier volume is missing.
///
/// # Errors
///
/// Returns [`OpsError::InvalidMount`] for malformed entries and for volumes
/// absent from `volumes_dir`.
pub fn attach_mounts(
    config: &Config,
    specs: &[String],
    volumes_dir: &Utf8Path,
) -> Result<Config, OpsError> {
    let parsed = parse_mounts(specs)?;
    let mut attached = config.clone();
    for spec in parsed {
        let volume = locate_volume(volumes_dir, &spec).ok_or_else(|| OpsError::InvalidMount {
            spec: format!("{}:{}", spec.volume, spec.path),
            reason: format!("volume '{}' not found in {volumes_dir}", spec.volume),
        })?;
        attached.run_config.mounts.push(Mount {
            volume,
            path: spec.path,
        });
    }
    Ok(attached)
}
