//! The three publish steps.

use super::link::link_content;
use super::{PublishStep, StepOutcome, StepRun};
use crate::constants::{
    PACKAGE_TYPE_ID, PUBLISH_STEP_CONTENT, PUBLISH_STEP_METADATA, PUBLISH_STEP_OVER_HTTP,
};
use crate::host::Unit;
use crate::pkg::{is_safe_relative_path, synthesize, PackageDescriptor, PkgError};
use npmirror_util::fs::{atomic_write, ensure_dir};
use std::path::Path;
use tracing::debug;

/// Writes one `<name>.json` registry document per package name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishMetadataStep;

/// Links every unit's content file at `<name>/-/<filename>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishContentStep;

/// Swaps the assembled tree into the served location.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishOverHttpStep;

impl PublishStep for PublishMetadataStep {
    fn step_id(&self) -> &'static str {
        PUBLISH_STEP_METADATA
    }

    fn description(&self) -> &'static str {
        "Publishing Npm Metadata."
    }

    fn process(&self, run: &StepRun<'_>) -> Result<StepOutcome, PkgError> {
        let ctx = run.context;
        let descriptors: Vec<PackageDescriptor> = package_units(run)?
            .iter()
            .map(PackageDescriptor::from_unit)
            .collect();

        let documents = synthesize(&descriptors, &ctx.publish_domain, &ctx.repo_id);
        let mut outcome = StepOutcome::default();

        for document in documents.values() {
            check_path_segment("package name", &document.name)?;
            let path = ctx.web_working_dir.join(document.file_name());
            if let Some(parent) = path.parent() {
                if create_dir(parent)? {
                    outcome.dirs_created.push(parent.to_path_buf());
                }
            }

            let bytes = serde_json::to_vec(document).map_err(|e| {
                PkgError::publish_failed(format!("Failed to serialize {}: {e}", document.name))
            })?;
            atomic_write(&path, &bytes).map_err(|e| {
                PkgError::publish_failed(format!("Failed to write {}: {e}", path.display()))
            })?;

            debug!(
                package = %document.name,
                versions = document.versions.len(),
                latest = document.latest().unwrap_or_default(),
                "Wrote registry document"
            );
            outcome.files_written.push(path);
        }

        Ok(outcome)
    }
}

impl PublishStep for PublishContentStep {
    fn step_id(&self) -> &'static str {
        PUBLISH_STEP_CONTENT
    }

    fn description(&self) -> &'static str {
        "Publishing Npm Content."
    }

    fn process(&self, run: &StepRun<'_>) -> Result<StepOutcome, PkgError> {
        let ctx = run.context;
        let mut outcome = StepOutcome::default();

        for unit in package_units(run)? {
            let filename = PackageDescriptor::from_unit(&unit).filename;
            check_path_segment("package name", &unit.unit_key.name)?;
            check_path_segment("content file name", &filename)?;
            let link_dir = ctx.web_working_dir.join(&unit.unit_key.name).join("-");
            if create_dir(&link_dir)? {
                outcome.dirs_created.push(link_dir.clone());
            }

            let link_path = link_dir.join(filename);
            link_content(&unit.storage_path, &link_path)?;
            debug!(unit = %unit.unit_key, link = %link_path.display(), "Linked content");
            outcome.symlinks_created.push(link_path);
        }

        Ok(outcome)
    }
}

impl PublishStep for PublishOverHttpStep {
    fn step_id(&self) -> &'static str {
        PUBLISH_STEP_OVER_HTTP
    }

    fn description(&self) -> &'static str {
        "Making files available via web."
    }

    fn process(&self, run: &StepRun<'_>) -> Result<StepOutcome, PkgError> {
        let ctx = run.context;
        let tree = run.publisher.publish(
            &ctx.working_dir,
            &[(ctx.repo_id.clone(), ctx.web_publish_dir.clone())],
            &ctx.master_publish_dir,
        )?;

        Ok(StepOutcome {
            published_tree: Some(tree),
            ..StepOutcome::default()
        })
    }
}

fn package_units(run: &StepRun<'_>) -> Result<Vec<Unit>, PkgError> {
    Ok(run
        .conduit
        .get_units()?
        .into_iter()
        .filter(|u| u.type_id == PACKAGE_TYPE_ID)
        .collect())
}

/// Refuse values that would place output outside the working tree.
fn check_path_segment(what: &str, value: &str) -> Result<(), PkgError> {
    if is_safe_relative_path(value) {
        Ok(())
    } else {
        Err(PkgError::publish_failed(format!("Invalid {what}: '{value}'")))
    }
}

fn create_dir(dir: &Path) -> Result<bool, PkgError> {
    ensure_dir(dir).map_err(|e| {
        PkgError::publish_failed(format!("Failed to create directory {}: {e}", dir.display()))
    })
}
