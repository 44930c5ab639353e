//! Symlink helpers for assembling and swapping published trees.

use crate::pkg::PkgError;
use std::fs;
use std::path::Path;

/// Expose a content file at `link_path`, replacing whatever is there.
///
/// Creates a symlink (Unix and Windows) pointing at `storage_path`; on other
/// platforms the file is copied instead.
///
/// # Errors
/// Returns `NPM_PUBLISH_FAILED` if an existing entry cannot be removed or the link cannot be created.
pub fn link_content(storage_path: &Path, link_path: &Path) -> Result<(), PkgError> {
    if link_path.symlink_metadata().is_ok() {
        remove_link_or_file(link_path)?;
    }
    create_file_link(storage_path, link_path)
}

/// Remove a symlink or regular file. A directory is removed recursively.
pub(crate) fn remove_link_or_file(path: &Path) -> Result<(), PkgError> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    let result = if metadata.file_type().is_symlink() {
        remove_symlink(path, &metadata)
    } else if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|e| {
        PkgError::publish_failed(format!("Failed to remove {}: {e}", path.display()))
    })
}

#[cfg(windows)]
fn remove_symlink(path: &Path, metadata: &fs::Metadata) -> std::io::Result<()> {
    use std::os::windows::fs::FileTypeExt;

    // Directory symlinks are removed as directories on Windows
    if metadata.file_type().is_symlink_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(not(windows))]
fn remove_symlink(path: &Path, _metadata: &fs::Metadata) -> std::io::Result<()> {
    fs::remove_file(path)
}

/// Create a symlink to a file.
pub(crate) fn create_file_link(src: &Path, dst: &Path) -> Result<(), PkgError> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(src, dst);

    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_file(src, dst);

    #[cfg(not(any(unix, windows)))]
    let result = fs::copy(src, dst).map(|_| ());

    result.map_err(|e| {
        PkgError::publish_failed(format!(
            "Failed to create symlink from {} to {}: {e}",
            dst.display(),
            src.display()
        ))
    })
}

/// Create a symlink to a directory.
pub(crate) fn create_dir_link(src: &Path, dst: &Path) -> Result<(), PkgError> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(src, dst);

    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_dir(src, dst);

    #[cfg(not(any(unix, windows)))]
    let result: std::io::Result<()> = Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "directory links are not supported on this platform",
    ));

    result.map_err(|e| {
        PkgError::atomic_publish_failed(format!(
            "Failed to create symlink from {} to {}: {e}",
            dst.display(),
            src.display()
        ))
    })
}

/// Recreate the symlink at `src` as `dst`, keeping its target.
pub(crate) fn copy_symlink(src: &Path, dst: &Path) -> Result<(), PkgError> {
    let target = fs::read_link(src).map_err(|e| {
        PkgError::atomic_publish_failed(format!("Failed to read link {}: {e}", src.display()))
    })?;
    if target.is_dir() {
        create_dir_link(&target, dst)
    } else {
        create_file_link(&target, dst)
    }
}
