//! Filesystem-backed unit store.
//!
//! Layout below `<store_dir>/<repo_id>/`:
//!
//! ```text
//! units/<name>/<version>.json                    unit document
//! content/<name>/<version>/<relative_path>       content file
//! ```

use super::{Unit, UnitConduit, UnitKey};
use crate::pkg::{is_safe_relative_path, PkgError};
use npmirror_util::fs::atomic_write;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const UNITS_DIR: &str = "units";
const CONTENT_DIR: &str = "content";
const UNIT_EXT: &str = "json";

/// Unit store for one repository.
#[derive(Debug, Clone)]
pub struct LocalUnitStore {
    root: PathBuf,
    repo_id: String,
}

impl LocalUnitStore {
    /// Open the store for `repo_id` below `store_dir`. Nothing is created until a unit is saved.
    #[must_use]
    pub fn open(store_dir: &Path, repo_id: &str) -> Self {
        Self {
            root: store_dir.join(repo_id),
            repo_id: repo_id.to_string(),
        }
    }

    #[must_use]
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unit_path(&self, key: &UnitKey) -> PathBuf {
        self.root
            .join(UNITS_DIR)
            .join(&key.name)
            .join(format!("{}.{UNIT_EXT}", key.version))
    }

    fn content_dir(&self, key: &UnitKey) -> PathBuf {
        self.root.join(CONTENT_DIR).join(&key.name).join(&key.version)
    }

    /// Units matching `name` and, if given, `version`. `None` for `name` matches everything.
    pub fn find_units(&self, name: Option<&str>, version: Option<&str>) -> Result<Vec<Unit>, PkgError> {
        Ok(self
            .get_units()?
            .into_iter()
            .filter(|u| name.map_or(true, |n| u.unit_key.name == n))
            .filter(|u| version.map_or(true, |v| u.unit_key.version == v))
            .collect())
    }

    /// Remove units and their content.
    ///
    /// # Errors
    /// Returns `NPM_UNIT_NOT_FOUND` if nothing matches.
    pub fn remove_units(&mut self, name: &str, version: Option<&str>) -> Result<Vec<UnitKey>, PkgError> {
        let matches = self.find_units(Some(name), version)?;
        if matches.is_empty() {
            return Err(PkgError::unit_not_found(name, version));
        }

        let mut removed = Vec::with_capacity(matches.len());
        for unit in matches {
            let unit_path = self.unit_path(&unit.unit_key);
            fs::remove_file(&unit_path).map_err(|e| {
                PkgError::unit_store(format!(
                    "Failed to remove unit {}: {e}",
                    unit_path.display()
                ))
            })?;

            let content_dir = self.content_dir(&unit.unit_key);
            if content_dir.is_dir() {
                fs::remove_dir_all(&content_dir).map_err(|e| {
                    PkgError::unit_store(format!(
                        "Failed to remove content {}: {e}",
                        content_dir.display()
                    ))
                })?;
            }

            debug!(repo = %self.repo_id, unit = %unit.unit_key, "Removed unit");
            removed.push(unit.unit_key);
        }

        Ok(removed)
    }

    /// Copy units (content included) into another repository's store.
    ///
    /// Units already present in `dest` are overwritten.
    ///
    /// # Errors
    /// Returns `NPM_UNIT_NOT_FOUND` if `name` is given and nothing matches.
    pub fn copy_units(&self, dest: &mut LocalUnitStore, name: Option<&str>) -> Result<Vec<UnitKey>, PkgError> {
        if dest.root == self.root {
            return Err(PkgError::unit_store(format!(
                "Cannot copy units of {} onto itself",
                self.repo_id
            )));
        }

        let matches = self.find_units(name, None)?;
        if let (Some(n), true) = (name, matches.is_empty()) {
            return Err(PkgError::unit_not_found(n, None));
        }

        let mut copied = Vec::with_capacity(matches.len());
        for unit in matches {
            let relative = unit
                .storage_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    PkgError::unit_store(format!(
                        "Unit {} has no content file name",
                        unit.unit_key
                    ))
                })?;

            let new_unit = dest.init_unit(
                &unit.type_id,
                unit.unit_key.clone(),
                unit.metadata.clone(),
                &relative,
            )?;
            copy_content(&unit.storage_path, &new_unit.storage_path)?;
            dest.save_unit(&new_unit)?;

            debug!(from = %self.repo_id, to = %dest.repo_id, unit = %unit.unit_key, "Copied unit");
            copied.push(unit.unit_key);
        }

        Ok(copied)
    }

    fn read_unit(path: &Path) -> Result<Unit, PkgError> {
        let content = fs::read(path).map_err(|e| {
            PkgError::unit_store(format!("Failed to read unit {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&content).map_err(|e| {
            PkgError::unit_store(format!("Invalid unit document {}: {e}", path.display()))
        })
    }
}

impl UnitConduit for LocalUnitStore {
    fn init_unit(
        &mut self,
        type_id: &str,
        unit_key: UnitKey,
        metadata: Map<String, Value>,
        relative_path: &str,
    ) -> Result<Unit, PkgError> {
        check_component("name", &unit_key.name)?;
        check_component("version", &unit_key.version)?;
        check_component("relative path", relative_path)?;

        let storage_path = self.content_dir(&unit_key).join(relative_path);
        Ok(Unit {
            type_id: type_id.to_string(),
            unit_key,
            metadata,
            storage_path,
        })
    }

    fn save_unit(&mut self, unit: &Unit) -> Result<(), PkgError> {
        let path = self.unit_path(&unit.unit_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(unit)?;
        atomic_write(&path, &bytes).map_err(|e| {
            PkgError::unit_store(format!("Failed to write unit {}: {e}", path.display()))
        })?;
        debug!(repo = %self.repo_id, unit = %unit.unit_key, "Saved unit");
        Ok(())
    }

    fn get_units(&self) -> Result<Vec<Unit>, PkgError> {
        let units_dir = self.root.join(UNITS_DIR);
        if !units_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut units = Vec::new();
        for entry in WalkDir::new(&units_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                PkgError::unit_store(format!("Failed to scan {}: {e}", units_dir.display()))
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(UNIT_EXT)
            {
                units.push(Self::read_unit(path)?);
            }
        }

        units.sort_by(|a, b| a.unit_key.cmp(&b.unit_key));
        Ok(units)
    }
}

/// Reject values that would escape the store when joined onto a path.
///
/// Scoped names (`@scope/name`) are the only values allowed to contain a separator.
fn check_component(what: &str, value: &str) -> Result<(), PkgError> {
    if is_safe_relative_path(value) {
        Ok(())
    } else {
        Err(PkgError::unit_store(format!("Invalid unit {what}: '{value}'")))
    }
}

fn copy_content(src: &Path, dst: &Path) -> Result<(), PkgError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst).map_err(|e| {
        PkgError::unit_store(format!(
            "Failed to copy {} to {}: {e}",
            src.display(),
            dst.display()
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PACKAGE_TYPE_ID;
    use crate::pkg::error::codes;
    use serde_json::json;
    use tempfile::tempdir;

    fn add_unit(store: &mut LocalUnitStore, name: &str, version: &str) -> Unit {
        let Value::Object(metadata) = json!({"dist": {"tarball": format!("{name}-{version}.tgz")}})
        else {
            unreachable!()
        };
        let unit = store
            .init_unit(
                PACKAGE_TYPE_ID,
                UnitKey::new(name, version),
                metadata,
                &format!("{}-{version}.tgz", name.replace('/', "-")),
            )
            .unwrap();
        fs::create_dir_all(unit.storage_path.parent().unwrap()).unwrap();
        fs::write(&unit.storage_path, b"archive").unwrap();
        store.save_unit(&unit).unwrap();
        unit
    }

    #[test]
    fn test_init_unit_storage_path() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");

        let unit = store
            .init_unit(
                PACKAGE_TYPE_ID,
                UnitKey::new("nectar", "1.2.0"),
                Map::new(),
                "nectar-1.2.0.tgz",
            )
            .unwrap();

        assert_eq!(
            unit.storage_path,
            dir.path()
                .join("myrepo/content/nectar/1.2.0/nectar-1.2.0.tgz")
        );
        // Nothing persisted until save
        assert!(store.get_units().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_get_units() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");

        let saved = add_unit(&mut store, "nectar", "1.3.1");
        add_unit(&mut store, "nectar", "1.2.0");
        add_unit(&mut store, "@scope/tool", "0.1.0");

        let units = store.get_units().unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].unit_key, UnitKey::new("@scope/tool", "0.1.0"));
        assert_eq!(units[2], saved);
    }

    #[test]
    fn test_save_overwrites_same_key() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");

        add_unit(&mut store, "nectar", "1.2.0");
        add_unit(&mut store, "nectar", "1.2.0");

        assert_eq!(store.get_units().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");

        for (name, version, rel) in [
            ("../evil", "1.0.0", "a.tgz"),
            ("nectar", "..", "a.tgz"),
            ("nectar", "1.0.0", "../../a.tgz"),
            ("/abs", "1.0.0", "a.tgz"),
            ("", "1.0.0", "a.tgz"),
        ] {
            let err = store
                .init_unit(PACKAGE_TYPE_ID, UnitKey::new(name, version), Map::new(), rel)
                .unwrap_err();
            assert_eq!(err.code(), codes::NPM_UNIT_STORE_ERROR, "{name} {version} {rel}");
        }
    }

    #[test]
    fn test_remove_single_version() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");
        let unit = add_unit(&mut store, "nectar", "1.2.0");
        add_unit(&mut store, "nectar", "1.3.1");

        let removed = store.remove_units("nectar", Some("1.2.0")).unwrap();

        assert_eq!(removed, vec![UnitKey::new("nectar", "1.2.0")]);
        assert!(!unit.storage_path.exists());
        assert_eq!(store.get_units().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_all_versions() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");
        add_unit(&mut store, "nectar", "1.2.0");
        add_unit(&mut store, "nectar", "1.3.1");
        add_unit(&mut store, "left-pad", "1.0.0");

        let removed = store.remove_units("nectar", None).unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(store.find_units(None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_missing_unit() {
        let dir = tempdir().unwrap();
        let mut store = LocalUnitStore::open(dir.path(), "myrepo");

        let err = store.remove_units("nectar", Some("9.9.9")).unwrap_err();
        assert_eq!(err.code(), codes::NPM_UNIT_NOT_FOUND);
        assert!(err.message().contains("nectar-9.9.9"));
    }

    #[test]
    fn test_copy_units_between_repos() {
        let dir = tempdir().unwrap();
        let mut source = LocalUnitStore::open(dir.path(), "src");
        let mut dest = LocalUnitStore::open(dir.path(), "dst");
        add_unit(&mut source, "nectar", "1.2.0");
        add_unit(&mut source, "left-pad", "1.0.0");

        let copied = source.copy_units(&mut dest, Some("nectar")).unwrap();
        assert_eq!(copied, vec![UnitKey::new("nectar", "1.2.0")]);

        let units = dest.get_units().unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].storage_path.starts_with(dest.root()));
        assert_eq!(fs::read(&units[0].storage_path).unwrap(), b"archive");
        // Source untouched
        assert_eq!(source.get_units().unwrap().len(), 2);
    }

    #[test]
    fn test_copy_missing_name() {
        let dir = tempdir().unwrap();
        let source = LocalUnitStore::open(dir.path(), "src");
        let mut dest = LocalUnitStore::open(dir.path(), "dst");

        let err = source.copy_units(&mut dest, Some("nectar")).unwrap_err();
        assert_eq!(err.code(), codes::NPM_UNIT_NOT_FOUND);
    }

    #[test]
    fn test_get_units_empty_store() {
        let dir = tempdir().unwrap();
        let store = LocalUnitStore::open(dir.path(), "nothing");
        assert!(store.get_units().unwrap().is_empty());
    }
}
