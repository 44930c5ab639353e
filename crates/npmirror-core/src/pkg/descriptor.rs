//! Package descriptors: identity and stored metadata derived from an archive.

use super::archive::find_manifest;
use super::error::PkgError;
use super::escape::encode_metadata;
use super::safe_path::is_safe_relative_path;
use super::version::sanitize_version;
use crate::constants::PACKAGE_TYPE_ID;
use crate::host::{Unit, UnitConduit, UnitKey};
use npmirror_util::{checksum_file, ChecksumAlgorithm};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// One ingested package version.
///
/// `metadata` holds every manifest field except `name` and `version`, with
/// keys already escaped for storage (see [`super::escape`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    /// Archive file name; also the unit's relative storage path.
    pub filename: String,
    pub checksum: String,
    /// Digest algorithm name; empty for descriptors read back from a unit.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum_type: String,
    pub metadata: Map<String, Value>,
}

impl PackageDescriptor {
    /// Extract a descriptor from an archive using the default SHA-1 checksum.
    ///
    /// # Errors
    /// See [`PackageDescriptor::extract_with`].
    pub fn extract(archive_path: &Path) -> Result<Self, PkgError> {
        Self::extract_with(archive_path, ChecksumAlgorithm::default())
    }

    /// Extract a descriptor from an archive.
    ///
    /// # Errors
    /// - `NPM_INVALID_ARCHIVE` if the archive is unreadable or has no `package.json`
    /// - `NPM_MALFORMED_MANIFEST` if `package.json` is not a JSON object
    /// - `NPM_MISSING_REQUIRED_FIELD` if `name` or `version` is absent, or would
    ///   escape a directory it is joined onto
    pub fn extract_with(archive_path: &Path, algorithm: ChecksumAlgorithm) -> Result<Self, PkgError> {
        let filename = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PkgError::invalid_archive(format!(
                    "Archive path has no file name: {}",
                    archive_path.display()
                ))
            })?;

        let checksum = checksum_file(archive_path, algorithm).map_err(|e| {
            PkgError::invalid_archive(format!(
                "Failed to read archive {}: {e}",
                archive_path.display()
            ))
        })?;

        let manifest = find_manifest(archive_path)?;
        let mut metadata = match serde_json::from_slice::<Value>(&manifest.content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(PkgError::malformed_manifest(format!(
                    "The package.json file of archive at {} is not a JSON object",
                    archive_path.display()
                )))
            }
            Err(e) => {
                return Err(PkgError::malformed_manifest(format!(
                    "The package.json file of archive at {} isn't a valid JSON file: {e}",
                    archive_path.display()
                )))
            }
        };

        let name = take_required(&mut metadata, "name", archive_path)?;
        let version = sanitize_version(&take_required(&mut metadata, "version", archive_path)?);
        for (field, value) in [("name", &name), ("version", &version)] {
            if !is_safe_relative_path(value) {
                return Err(PkgError::missing_required_field(format!(
                    "The package.json file of archive at {} has an invalid '{field}': '{value}'",
                    archive_path.display()
                )));
            }
        }

        normalize_metadata(&mut metadata, &checksum, &filename);
        encode_metadata(&mut metadata);

        Ok(Self {
            name,
            version,
            filename,
            checksum,
            checksum_type: algorithm.as_str().to_string(),
            metadata,
        })
    }

    /// Rebuild a descriptor from a persisted unit.
    ///
    /// The file name comes from `dist.tarball`, falling back to the storage path.
    /// Units do not record the digest algorithm, so `checksum_type` is left empty.
    #[must_use]
    pub fn from_unit(unit: &Unit) -> Self {
        let filename = unit
            .metadata
            .get("dist")
            .and_then(|d| d.get("tarball"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| {
                unit.storage_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        let checksum = unit
            .metadata
            .get("_shasum")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            name: unit.unit_key.name.clone(),
            version: unit.unit_key.version.clone(),
            filename,
            checksum,
            checksum_type: String::new(),
            metadata: unit.metadata.clone(),
        }
    }

    /// The `(name, version)` key identifying this package in a repository.
    #[must_use]
    pub fn unit_key(&self) -> UnitKey {
        UnitKey::new(&self.name, &self.version)
    }

    /// Register this package with the host, returning the unit to be saved.
    ///
    /// The archive file name is used as the relative storage path.
    pub fn init_unit(&self, conduit: &mut dyn UnitConduit) -> Result<Unit, PkgError> {
        conduit.init_unit(
            PACKAGE_TYPE_ID,
            self.unit_key(),
            self.metadata.clone(),
            &self.filename,
        )
    }

    /// Commit a unit previously returned by [`PackageDescriptor::init_unit`].
    pub fn save_unit(&self, conduit: &mut dyn UnitConduit, unit: &Unit) -> Result<(), PkgError> {
        conduit.save_unit(unit)
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Npm Package: {}@{}", self.name, self.version)
    }
}

fn take_required(
    metadata: &mut Map<String, Value>,
    field: &str,
    archive_path: &Path,
) -> Result<String, PkgError> {
    match metadata.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(_) => Err(PkgError::missing_required_field(format!(
            "The package.json file of archive at {} has an empty or non-string '{field}'",
            archive_path.display()
        ))),
        None => Err(PkgError::missing_required_field(format!(
            "The package.json file of archive at {} does not contain the required '{field}' attribute",
            archive_path.display()
        ))),
    }
}

/// Apply the storage conventions to manifest metadata (identity fields already removed).
fn normalize_metadata(metadata: &mut Map<String, Value>, checksum: &str, filename: &str) {
    // `_id` is reserved by the unit store
    if let Some(id) = metadata.remove("_id") {
        metadata.insert("id".to_string(), id);
    }
    if !metadata.contains_key("_from") {
        metadata.insert("_from".to_string(), Value::String(".".to_string()));
    }
    metadata.insert("_shasum".to_string(), Value::String(checksum.to_string()));

    let mut dist = Map::new();
    dist.insert("shasum".to_string(), Value::String(checksum.to_string()));
    dist.insert("tarball".to_string(), Value::String(filename.to_string()));
    metadata.insert("dist".to_string(), Value::Object(dist));
}
