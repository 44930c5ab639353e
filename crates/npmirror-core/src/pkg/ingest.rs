//! Ingesting uploaded archives into a unit store.

use super::descriptor::PackageDescriptor;
use super::error::PkgError;
use crate::host::UnitConduit;
use npmirror_util::ChecksumAlgorithm;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Result of ingesting one archive in a batch.
#[derive(Debug)]
pub struct IngestOutcome {
    pub archive: PathBuf,
    pub result: Result<PackageDescriptor, PkgError>,
}

/// Extract `archive`, register it as a unit and copy it into the unit's storage path.
///
/// # Errors
/// Extraction errors are returned unchanged; store failures use `NPM_UNIT_STORE_ERROR`.
pub fn ingest_archive(
    conduit: &mut dyn UnitConduit,
    archive: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<PackageDescriptor, PkgError> {
    let descriptor = PackageDescriptor::extract_with(archive, algorithm)?;
    let unit = descriptor.init_unit(conduit)?;

    if let Some(parent) = unit.storage_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PkgError::unit_store(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    fs::copy(archive, &unit.storage_path).map_err(|e| {
        PkgError::unit_store(format!(
            "Failed to copy {} to {}: {e}",
            archive.display(),
            unit.storage_path.display()
        ))
    })?;

    descriptor.save_unit(conduit, &unit)?;
    info!(
        name = %descriptor.name,
        version = %descriptor.version,
        checksum = %descriptor.checksum,
        "Ingested package"
    );
    Ok(descriptor)
}

/// Ingest every archive independently; one failure does not stop the rest.
pub fn ingest_batch(
    conduit: &mut dyn UnitConduit,
    archives: &[PathBuf],
    algorithm: ChecksumAlgorithm,
) -> Vec<IngestOutcome> {
    archives
        .iter()
        .map(|archive| {
            let result = ingest_archive(conduit, archive, algorithm);
            if let Err(e) = &result {
                if e.is_extraction_error() {
                    warn!(archive = %archive.display(), error = %e, "Rejected archive");
                } else {
                    error!(archive = %archive.display(), error = %e, "Failed to store archive");
                }
            }
            IngestOutcome {
                archive: archive.clone(),
                result,
            }
        })
        .collect()
}
