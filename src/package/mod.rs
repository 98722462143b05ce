//! Package lookup and manifest loading.
//!
//! A package is a directory holding a prebuilt program tree and a
//! `package.manifest` file whose JSON body is a [`Config`]. Fetching and
//! unpacking archives is handled elsewhere; [`LocalPackageStore`] only
//! resolves packages already extracted under the local packages directory.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::OpsError;
use crate::local_fs;

/// Name of the manifest file inside an extracted package.
pub const MANIFEST_FILE: &str = "package.manifest";

/// Resolves package names to extracted directories.
pub trait PackageSource: Send + Sync {
    /// Returns the directory of the extracted package `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Package`] when the package is unavailable.
    fn download_and_extract(&self, name: &str) -> Result<Utf8PathBuf, OpsError>;
}

/// Package source backed by a local directory of extracted packages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalPackageStore {
    root: Utf8PathBuf,
}

impl LocalPackageStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackageSource for LocalPackageStore {
    fn download_and_extract(&self, name: &str) -> Result<Utf8PathBuf, OpsError> {
        validate_name(name)?;
        let dir = self.root.join(name);
        if !local_fs::file_exists(&dir.join(MANIFEST_FILE)) {
            return Err(OpsError::Package(format!(
                "package '{name}' is not extracted under {}",
                self.root
            )));
        }
        debug!(package = name, %dir, "resolved package");
        Ok(dir)
    }
}

fn validate_name(name: &str) -> Result<(), OpsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(OpsError::Package(String::from("package name is empty")));
    }
    if trimmed.starts_with('/') || trimmed.split('/').any(|part| part == "..") {
        return Err(OpsError::Package(format!(
            "package name '{name}' must be relative"
        )));
    }
    Ok(())
}

/// Loads the manifest of the package extracted at `dir`.
///
/// # Errors
///
/// Returns [`OpsError::Package`] when the manifest is missing or invalid.
pub fn load_manifest(dir: &Utf8Path) -> Result<Config, OpsError> {
    let manifest = dir.join(MANIFEST_FILE);
    if !local_fs::file_exists(&manifest) {
        return Err(OpsError::Package(format!("{manifest} does not exist")));
    }
    Config::load(&manifest).map_err(|err| OpsError::Package(err.to_string()))
}

/// Default image name for a package: its final path segment.
#[must_use]
pub fn package_image_name(name: &str) -> &str {
    name.trim()
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(name)
}
