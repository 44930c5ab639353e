use crate::version::SCHEMA_VERSION;
use std::path::{Path, PathBuf};

/// Get the data directory for npmirror (unit store and publish scratch space).
///
/// Uses platform-appropriate locations with versioning:
/// - Linux: `$XDG_DATA_HOME/npmirror/v{N}` or `~/.local/share/npmirror/v{N}`
/// - macOS: `~/Library/Application Support/npmirror/v{N}`
/// - Windows: `%LOCALAPPDATA%\npmirror\v{N}`
#[must_use]
pub fn data_dir() -> PathBuf {
    let base = dirs_next::data_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".npmirror-data"),
                |p| p.join(".local").join("share").join("npmirror"),
            )
        },
        |p| p.join("npmirror"),
    );

    base.join(format!("v{SCHEMA_VERSION}"))
}

/// Default root of the local unit store.
#[must_use]
pub fn default_store_dir() -> PathBuf {
    data_dir().join("units")
}

/// Default root for per-repository publish working directories.
#[must_use]
pub fn default_working_dir() -> PathBuf {
    data_dir().join("working")
}

/// Public directory a repository is served from: `<publish_dir>/web/<repo_id>`.
#[must_use]
pub fn web_publish_dir(publish_dir: &Path, repo_id: &str) -> PathBuf {
    publish_dir.join("web").join(repo_id)
}

/// History directory for a repository: `<publish_dir>/master/<repo_id>`.
#[must_use]
pub fn master_publish_dir(publish_dir: &Path, repo_id: &str) -> PathBuf {
    publish_dir.join("master").join(repo_id)
}

/// Scratch directory for one repository's publish run.
///
/// The tree that gets published lives one level deeper, in
/// `<working_root>/<repo_id>/<repo_id>`; see [`web_working_dir`].
#[must_use]
pub fn step_working_dir(working_root: &Path, repo_id: &str) -> PathBuf {
    working_root.join(repo_id)
}

/// Directory the metadata and content steps assemble the published tree in.
#[must_use]
pub fn web_working_dir(working_root: &Path, repo_id: &str) -> PathBuf {
    step_working_dir(working_root, repo_id).join(repo_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_contains_version() {
        let dir = data_dir();
        let dir_str = dir.to_string_lossy();
        assert!(dir_str.contains(&format!("v{SCHEMA_VERSION}")));
        assert!(dir_str.contains("npmirror"));
    }

    #[test]
    fn test_store_and_working_dirs_differ() {
        assert_ne!(default_store_dir(), default_working_dir());
    }

    #[test]
    fn test_publish_dirs_per_repo() {
        let root = Path::new("/var/lib/pulp/published/npm");
        assert_eq!(
            web_publish_dir(root, "myrepo"),
            PathBuf::from("/var/lib/pulp/published/npm/web/myrepo")
        );
        assert_eq!(
            master_publish_dir(root, "myrepo"),
            PathBuf::from("/var/lib/pulp/published/npm/master/myrepo")
        );
    }

    #[test]
    fn test_web_working_dir_nested_under_step_dir() {
        let root = Path::new("/tmp/work");
        let web = web_working_dir(root, "myrepo");
        assert_eq!(web, PathBuf::from("/tmp/work/myrepo/myrepo"));
        assert!(web.starts_with(step_working_dir(root, "myrepo")));
    }
}
