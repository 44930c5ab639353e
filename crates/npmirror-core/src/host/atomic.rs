//! Atomic directory publishing on the local filesystem.

use super::AtomicPublisher;
use crate::pkg::PkgError;
use crate::publish::link::{copy_symlink, create_dir_link, remove_link_or_file};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Number of published trees kept under the master directory by default.
pub const DEFAULT_RETAINED_TREES: usize = 1;

/// Publishes a working tree by moving it under a timestamped master
/// directory and pointing each public directory at it with a symlink.
///
/// The public symlink is replaced by renaming a freshly created temporary
/// link over it, so readers see either the old tree or the new one. If no
/// public directory was switched, the tree is moved back to the working
/// directory before the error is returned.
#[derive(Debug, Clone)]
pub struct LocalAtomicPublisher {
    retain: usize,
}

impl Default for LocalAtomicPublisher {
    fn default() -> Self {
        Self {
            retain: DEFAULT_RETAINED_TREES,
        }
    }
}

impl LocalAtomicPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the `retain` most recent trees under the master directory (at least one).
    #[must_use]
    pub fn with_retained_trees(mut self, retain: usize) -> Self {
        self.retain = retain.max(1);
        self
    }
}

impl AtomicPublisher for LocalAtomicPublisher {
    fn publish(
        &self,
        working_dir: &Path,
        publish_dirs: &[(String, PathBuf)],
        master_dir: &Path,
    ) -> Result<PathBuf, PkgError> {
        fs::create_dir_all(master_dir).map_err(|e| {
            PkgError::atomic_publish_failed(format!(
                "Failed to create master directory {}: {e}",
                master_dir.display()
            ))
        })?;

        let tree = unique_timestamp_dir(master_dir);
        move_tree(working_dir, &tree)?;
        debug!(tree = %tree.display(), "Moved working tree into master directory");

        match swap_all(&tree, publish_dirs) {
            Ok(()) => {}
            Err((0, e)) => {
                restore_working_tree(&tree, working_dir);
                return Err(e);
            }
            Err((_, e)) => {
                return Err(PkgError::atomic_publish_failed(format!(
                    "{}; published tree kept at {}",
                    e.message(),
                    tree.display()
                )));
            }
        }

        prune_master(master_dir, &tree, self.retain)?;
        Ok(tree)
    }
}

/// Swap every public directory over to `tree`.
///
/// On failure returns how many public directories already point at `tree`.
fn swap_all(tree: &Path, publish_dirs: &[(String, PathBuf)]) -> Result<(), (usize, PkgError)> {
    for (relative, _) in publish_dirs {
        if !tree.join(relative).is_dir() {
            return Err((
                0,
                PkgError::atomic_publish_failed(format!(
                    "Published tree has no directory {relative}"
                )),
            ));
        }
    }

    for (done, (relative, public_dir)) in publish_dirs.iter().enumerate() {
        swap_link(&tree.join(relative), public_dir).map_err(|e| (done, e))?;
        info!(public = %public_dir.display(), "Published directory");
    }
    Ok(())
}

/// Put the staged tree back where the working tree was, so a failed publish
/// leaves the generated artifacts in the working directory.
fn restore_working_tree(tree: &Path, working_dir: &Path) {
    match move_tree(tree, working_dir) {
        Ok(()) => debug!(working_dir = %working_dir.display(), "Restored working tree"),
        Err(e) => warn!(
            tree = %tree.display(),
            error = %e,
            "Failed to restore working tree after publish failure"
        ),
    }
}

fn unique_timestamp_dir(master_dir: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
    let mut candidate = master_dir.join(&stamp);
    let mut n = 1;
    while candidate.symlink_metadata().is_ok() {
        candidate = master_dir.join(format!("{stamp}-{n}"));
        n += 1;
    }
    candidate
}

/// Move `src` to `dst`, falling back to copy-then-remove across filesystems.
fn move_tree(src: &Path, dst: &Path) -> Result<(), PkgError> {
    let Err(rename_err) = fs::rename(src, dst) else {
        return Ok(());
    };

    if let Err(copy_err) = copy_tree(src, dst) {
        if let Err(e) = fs::remove_dir_all(dst) {
            warn!(path = %dst.display(), error = %e, "Failed to remove partial copy");
        }
        return Err(PkgError::atomic_publish_failed(format!(
            "Failed to move or copy {}: rename={rename_err}, copy={copy_err}",
            src.display()
        )));
    }

    fs::remove_dir_all(src).map_err(|e| {
        PkgError::atomic_publish_failed(format!(
            "Failed to remove working directory {}: {e}",
            src.display()
        ))
    })
}

/// Copy a tree, recreating symlinks rather than following them.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), PkgError> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            PkgError::atomic_publish_failed(format!("Failed to walk {}: {e}", src.display()))
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| {
            PkgError::atomic_publish_failed(format!("Unexpected path in walk: {e}"))
        })?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        let copied = if file_type.is_dir() {
            fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            Ok(())
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|e| {
            PkgError::atomic_publish_failed(format!("Failed to copy {}: {e}", entry.path().display()))
        })?;
    }
    Ok(())
}

/// Point `public_dir` at `source` by renaming a new symlink over it.
fn swap_link(source: &Path, public_dir: &Path) -> Result<(), PkgError> {
    let parent = public_dir.parent().ok_or_else(|| {
        PkgError::atomic_publish_failed(format!(
            "Publish directory has no parent: {}",
            public_dir.display()
        ))
    })?;
    fs::create_dir_all(parent).map_err(|e| {
        PkgError::atomic_publish_failed(format!(
            "Failed to create {}: {e}",
            parent.display()
        ))
    })?;

    let name = public_dir
        .file_name()
        .map_or_else(|| "publish".to_string(), |n| n.to_string_lossy().into_owned());
    let temp_link = parent.join(format!(".{name}.tmp.{}", std::process::id()));
    remove_link_or_file(&temp_link)?;
    create_dir_link(source, &temp_link)?;

    // A real directory cannot be replaced by rename; only the first publish hits this
    if let Ok(meta) = fs::symlink_metadata(public_dir) {
        if meta.is_dir() || cfg!(windows) {
            remove_link_or_file(public_dir)?;
        }
    }

    fs::rename(&temp_link, public_dir).map_err(|e| {
        let _ = remove_link_or_file(&temp_link);
        PkgError::atomic_publish_failed(format!(
            "Failed to swap {} into place: {e}",
            public_dir.display()
        ))
    })
}

/// Remove older trees, keeping the `retain` newest (including `current`).
fn prune_master(master_dir: &Path, current: &Path, retain: usize) -> Result<(), PkgError> {
    let entries = fs::read_dir(master_dir).map_err(|e| {
        PkgError::atomic_publish_failed(format!("Failed to list {}: {e}", master_dir.display()))
    })?;
    let mut trees: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p != current)
        .collect();
    trees.sort();

    let excess = (trees.len() + 1).saturating_sub(retain);
    for old in trees.into_iter().take(excess) {
        debug!(tree = %old.display(), "Removing old published tree");
        fs::remove_dir_all(&old).map_err(|e| {
            PkgError::atomic_publish_failed(format!(
                "Failed to remove old tree {}: {e}",
                old.display()
            ))
        })?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn working_tree(root: &Path, repo: &str, marker: &str) -> PathBuf {
        let working = root.join("working").join(repo);
        let web = working.join(repo);
        fs::create_dir_all(&web).unwrap();
        fs::write(web.join("nectar.json"), marker).unwrap();
        working
    }

    #[test]
    fn test_publish_links_public_dir() {
        let dir = tempdir().unwrap();
        let working = working_tree(dir.path(), "myrepo", "v1");
        let public = dir.path().join("pub/web/myrepo");
        let master = dir.path().join("pub/master/myrepo");

        let tree = LocalAtomicPublisher::new()
            .publish(&working, &[("myrepo".to_string(), public.clone())], &master)
            .unwrap();

        assert!(tree.starts_with(&master));
        assert!(!working.exists());
        assert!(public.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(public.join("nectar.json")).unwrap(), "v1");
    }

    #[test]
    fn test_republish_swaps_and_prunes() {
        let dir = tempdir().unwrap();
        let public = dir.path().join("pub/web/myrepo");
        let master = dir.path().join("pub/master/myrepo");
        let publisher = LocalAtomicPublisher::new();
        let dirs = [("myrepo".to_string(), public.clone())];

        let first = publisher
            .publish(&working_tree(dir.path(), "myrepo", "v1"), &dirs, &master)
            .unwrap();
        let second = publisher
            .publish(&working_tree(dir.path(), "myrepo", "v2"), &dirs, &master)
            .unwrap();

        assert_ne!(first, second);
        assert!(!first.exists());
        assert_eq!(fs::read_to_string(public.join("nectar.json")).unwrap(), "v2");
        assert_eq!(fs::read_dir(&master).unwrap().count(), 1);
    }

    #[test]
    fn test_retained_history() {
        let dir = tempdir().unwrap();
        let public = dir.path().join("pub/web/myrepo");
        let master = dir.path().join("pub/master/myrepo");
        let publisher = LocalAtomicPublisher::new().with_retained_trees(2);
        let dirs = [("myrepo".to_string(), public.clone())];

        for marker in ["v1", "v2", "v3"] {
            publisher
                .publish(&working_tree(dir.path(), "myrepo", marker), &dirs, &master)
                .unwrap();
        }

        assert_eq!(fs::read_dir(&master).unwrap().count(), 2);
        assert_eq!(fs::read_to_string(public.join("nectar.json")).unwrap(), "v3");
    }

    #[test]
    fn test_replaces_real_public_directory() {
        let dir = tempdir().unwrap();
        let public = dir.path().join("pub/web/myrepo");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("stale.json"), "old").unwrap();
        let master = dir.path().join("pub/master/myrepo");

        LocalAtomicPublisher::new()
            .publish(
                &working_tree(dir.path(), "myrepo", "v1"),
                &[("myrepo".to_string(), public.clone())],
                &master,
            )
            .unwrap();

        assert!(!public.join("stale.json").exists());
        assert!(public.join("nectar.json").exists());
    }

    #[test]
    fn test_missing_relative_dir_leaves_public_untouched() {
        let dir = tempdir().unwrap();
        let public = dir.path().join("pub/web/myrepo");
        let master = dir.path().join("pub/master/myrepo");

        let err = LocalAtomicPublisher::new()
            .publish(
                &working_tree(dir.path(), "myrepo", "v1"),
                &[("other".to_string(), public.clone())],
                &master,
            )
            .unwrap_err();

        assert_eq!(err.code(), crate::pkg::error::codes::NPM_ATOMIC_PUBLISH_FAILED);
        assert!(public.symlink_metadata().is_err());
        assert!(dir.path().join("working/myrepo/myrepo/nectar.json").is_file());
        assert_eq!(fs::read_dir(&master).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_swap_restores_working_tree() {
        let dir = tempdir().unwrap();
        let working = working_tree(dir.path(), "myrepo", "v1");
        fs::create_dir_all(dir.path().join("pub")).unwrap();
        fs::write(dir.path().join("pub/web"), "not a directory").unwrap();
        let public = dir.path().join("pub/web/myrepo");
        let master = dir.path().join("pub/master/myrepo");

        let err = LocalAtomicPublisher::new()
            .publish(&working, &[("myrepo".to_string(), public)], &master)
            .unwrap_err();

        assert_eq!(err.code(), crate::pkg::error::codes::NPM_ATOMIC_PUBLISH_FAILED);
        assert_eq!(
            fs::read_to_string(working.join("myrepo/nectar.json")).unwrap(),
            "v1"
        );
        assert_eq!(fs::read_dir(&master).unwrap().count(), 0);
    }

    #[test]
    fn test_partial_swap_reports_kept_tree() {
        let dir = tempdir().unwrap();
        let working = working_tree(dir.path(), "myrepo", "v1");
        fs::create_dir_all(dir.path().join("pub")).unwrap();
        fs::write(dir.path().join("pub/blocked"), "not a directory").unwrap();
        let first = dir.path().join("pub/web/myrepo");
        let second = dir.path().join("pub/blocked/myrepo");
        let master = dir.path().join("pub/master/myrepo");

        let err = LocalAtomicPublisher::new()
            .publish(
                &working,
                &[
                    ("myrepo".to_string(), first.clone()),
                    ("myrepo".to_string(), second),
                ],
                &master,
            )
            .unwrap_err();

        assert!(err.message().contains("published tree kept at"));
        assert_eq!(fs::read_to_string(first.join("nectar.json")).unwrap(), "v1");
    }

    #[test]
    fn test_copy_tree_preserves_symlinks() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("archive.tgz");
        fs::write(&target, b"x").unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nectar/-")).unwrap();
        std::os::unix::fs::symlink(&target, src.join("nectar/-/archive.tgz")).unwrap();
        fs::write(src.join("nectar.json"), "{}").unwrap();

        let dst = dir.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        let copied = dst.join("nectar/-/archive.tgz");
        assert!(copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(copied).unwrap(), target);
        assert_eq!(fs::read_to_string(dst.join("nectar.json")).unwrap(), "{}");
    }
}
