//! `npmirror upload`: ingest archives into a repository.

use super::{checksum_algorithm, fail, print_json, ErrorInfo};
use miette::Result;
use npmirror_core::constants::IMPORTER_TYPE_ID;
use npmirror_core::pkg::ingest_batch;
use npmirror_core::{Config, LocalUnitStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Serialize)]
struct UploadedPackage {
    name: String,
    version: String,
    filename: String,
    checksum: String,
}

#[derive(Serialize)]
struct UploadError {
    archive: PathBuf,
    #[serde(flatten)]
    error: ErrorInfo,
}

#[derive(Serialize)]
struct UploadOutput {
    ok: bool,
    importer_type_id: &'static str,
    repo_id: String,
    uploaded: Vec<UploadedPackage>,
    errors: Vec<UploadError>,
}

pub fn run(config: &Config, repo_id: &str, archives: &[PathBuf], json: bool) -> Result<()> {
    let algorithm = match checksum_algorithm(config) {
        Ok(a) => a,
        Err(e) => return fail(&e, json),
    };

    let mut store = LocalUnitStore::open(&config.store_directory, repo_id);
    debug!(store = %store.root().display(), count = archives.len(), "Uploading archives");

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();
    for outcome in ingest_batch(&mut store, archives, algorithm) {
        match outcome.result {
            Ok(d) => uploaded.push(UploadedPackage {
                name: d.name,
                version: d.version,
                filename: d.filename,
                checksum: d.checksum,
            }),
            Err(e) => errors.push(UploadError {
                archive: outcome.archive,
                error: ErrorInfo::from(&e),
            }),
        }
    }

    let has_errors = !errors.is_empty();
    if json {
        print_json(&UploadOutput {
            ok: !has_errors,
            importer_type_id: IMPORTER_TYPE_ID,
            repo_id: repo_id.to_string(),
            uploaded,
            errors,
        })?;
    } else {
        for pkg in &uploaded {
            println!("+ {}@{} ({})", pkg.name, pkg.version, pkg.filename);
        }
        for err in &errors {
            eprintln!(
                "! {}: {} {}",
                err.archive.display(),
                err.error.code,
                err.error.message
            );
        }
    }

    if has_errors {
        std::process::exit(2);
    }
    Ok(())
}
