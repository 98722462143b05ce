//! Capability-scoped file system helpers for image and package directories.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::error::OpsError;

/// Maps an I/O failure on `path` into [`OpsError::Io`].
#[must_use]
pub fn io_error(path: &Utf8Path, err: &io::Error) -> OpsError {
    OpsError::Io {
        path: path.to_string(),
        message: err.to_string(),
    }
}

/// Opens an existing directory.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when the directory cannot be opened.
pub fn open_dir(path: &Utf8Path) -> Result<Dir, OpsError> {
    Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| io_error(path, &err))
}

/// Creates `path` and any missing parents, then opens it.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when the directory cannot be created or opened.
pub fn ensure_dir(path: &Utf8Path) -> Result<Dir, OpsError> {
    Dir::create_ambient_dir_all(path, ambient_authority()).map_err(|err| io_error(path, &err))?;
    open_dir(path)
}

/// Splits a file path into its parent directory and file name.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when `path` has no file name component.
pub fn split_file(path: &Utf8Path) -> Result<(Utf8PathBuf, String), OpsError> {
    let file_name = path.file_name().ok_or_else(|| OpsError::Io {
        path: path.to_string(),
        message: String::from("path is missing a file name"),
    })?;
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    Ok((parent, file_name.to_owned()))
}

/// Returns `true` when `path` names an existing regular file.
#[must_use]
pub fn file_exists(path: &Utf8Path) -> bool {
    split_file(path)
        .ok()
        .and_then(|(parent, name)| open_dir(&parent).ok().map(|dir| dir.is_file(name)))
        .unwrap_or(false)
}

/// Reads a UTF-8 file.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when the file cannot be read.
pub fn read_to_string(path: &Utf8Path) -> Result<String, OpsError> {
    let (parent, name) = split_file(path)?;
    open_dir(&parent)?
        .read_to_string(name)
        .map_err(|err| io_error(path, &err))
}

/// Writes `contents` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when the directory or file cannot be written.
pub fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<(), OpsError> {
    let (parent, name) = split_file(path)?;
    ensure_dir(&parent)?
        .write(name, contents)
        .map_err(|err| io_error(path, &err))
}

/// Copies the file at `from` to `to`, creating the destination directory.
///
/// # Errors
///
/// Returns [`OpsError::Io`] when either side cannot be accessed.
pub fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<u64, OpsError> {
    let (src_parent, src_name) = split_file(from)?;
    let (dst_parent, dst_name) = split_file(to)?;
    let source = open_dir(&src_parent)?;
    let target = ensure_dir(&dst_parent)?;
    source
        .copy(src_name, &target, dst_name)
        .map_err(|err| io_error(to, &err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()))
    }

    #[test]
    fn write_then_copy_creates_directories() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = utf8_root(&tmp);
        let source = root.join("a/b/image.img");
        let target = root.join("c/copy.img");

        write_file(&source, b"disk").expect("write source");
        let copied = copy_file(&source, &target).expect("copy");

        assert_eq!(copied, 4);
        assert!(file_exists(&target));
        assert_eq!(read_to_string(&target).expect("read copy"), "disk");
    }

    #[test]
    fn split_file_defaults_parent_to_current_directory() {
        let (parent, name) = split_file(Utf8Path::new("image.img")).expect("split");
        assert_eq!(parent, Utf8PathBuf::from("."));
        assert_eq!(name, "image.img");
    }

    #[test]
    fn file_exists_is_false_for_missing_paths() {
        assert!(!file_exists(Utf8Path::new("/definitely/not/here.img")));
    }
}
