//! Repository publishing.
//!
//! A publish run assembles the served tree for one repository in a working
//! directory and then swaps it into place. The steps always run in the same
//! order:
//!
//! 1. [`steps::PublishMetadataStep`] writes `<name>.json` registry documents.
//! 2. [`steps::PublishContentStep`] links each archive at `<name>/-/<filename>`.
//! 3. [`steps::PublishOverHttpStep`] hands the tree to an [`AtomicPublisher`].
//!
//! A failing step stops the run. Whatever earlier steps produced stays in the
//! working directory, and the served tree is left as it was.

pub mod link;
pub mod steps;

use crate::config::Config;
use crate::constants::PUBLISH_STEP_PUBLISHER;
use crate::host::{AtomicPublisher, UnitConduit};
use crate::paths;
use crate::pkg::PkgError;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{info, info_span};

pub use steps::{PublishContentStep, PublishMetadataStep, PublishOverHttpStep};

/// Directories and settings for one repository's publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishContext {
    pub repo_id: String,
    pub publish_domain: String,
    /// Scratch root handed to the atomic publisher.
    pub working_dir: PathBuf,
    /// Where the served tree is assembled (`<working_dir>/<repo_id>`).
    pub web_working_dir: PathBuf,
    pub web_publish_dir: PathBuf,
    pub master_publish_dir: PathBuf,
}

impl PublishContext {
    #[must_use]
    pub fn from_config(config: &Config, repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            publish_domain: config.publish_domain.clone(),
            working_dir: paths::step_working_dir(&config.working_directory, repo_id),
            web_working_dir: paths::web_working_dir(&config.working_directory, repo_id),
            web_publish_dir: config.web_publish_dir(repo_id),
            master_publish_dir: config.master_publish_dir(repo_id),
        }
    }
}

/// Collaborators available to a step.
pub struct StepRun<'a> {
    pub context: &'a PublishContext,
    pub conduit: &'a dyn UnitConduit,
    pub publisher: &'a dyn AtomicPublisher,
}

/// What a step produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub files_written: Vec<PathBuf>,
    pub dirs_created: Vec<PathBuf>,
    pub symlinks_created: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_tree: Option<PathBuf>,
}

/// One unit of work in a publish run.
pub trait PublishStep {
    fn step_id(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn process(&self, run: &StepRun<'_>) -> Result<StepOutcome, PkgError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step_id: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of a successful publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub step_id: &'static str,
    pub repo_id: String,
    pub steps: Vec<StepReport>,
}

impl PublishReport {
    /// Report for the step with the given id, if it ran.
    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// A publish run that stopped at `step_id`.
#[derive(Debug)]
pub struct PublishFailure {
    pub step_id: &'static str,
    pub error: PkgError,
    /// Steps that finished before the failure.
    pub completed: Vec<StepReport>,
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Publish step {} failed: {}", self.step_id, self.error)
    }
}

impl std::error::Error for PublishFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Publishes an npm repository.
pub struct NpmPublisher {
    context: PublishContext,
    steps: Vec<Box<dyn PublishStep>>,
}

impl NpmPublisher {
    #[must_use]
    pub fn new(context: PublishContext) -> Self {
        Self {
            context,
            steps: vec![
                Box::new(PublishMetadataStep),
                Box::new(PublishContentStep),
                Box::new(PublishOverHttpStep),
            ],
        }
    }

    #[must_use]
    pub fn context(&self) -> &PublishContext {
        &self.context
    }

    /// `(step_id, description)` of each step in run order.
    pub fn steps(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.steps.iter().map(|s| (s.step_id(), s.description()))
    }

    /// Run every step in order.
    ///
    /// A leftover working directory from an earlier run is removed first.
    pub fn publish(
        &self,
        conduit: &dyn UnitConduit,
        publisher: &dyn AtomicPublisher,
    ) -> Result<PublishReport, PublishFailure> {
        let span = info_span!("publish", repo = %self.context.repo_id);
        let _guard = span.enter();

        self.prepare_working_dir().map_err(|error| PublishFailure {
            step_id: PUBLISH_STEP_PUBLISHER,
            error,
            completed: Vec::new(),
        })?;

        let run = StepRun {
            context: &self.context,
            conduit,
            publisher,
        };
        let mut completed = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            info!(step = step.step_id(), "{}", step.description());
            match step.process(&run) {
                Ok(outcome) => completed.push(StepReport {
                    step_id: step.step_id(),
                    description: step.description(),
                    outcome,
                }),
                Err(error) => {
                    return Err(PublishFailure {
                        step_id: step.step_id(),
                        error,
                        completed,
                    })
                }
            }
        }

        Ok(PublishReport {
            step_id: PUBLISH_STEP_PUBLISHER,
            repo_id: self.context.repo_id.clone(),
            steps: completed,
        })
    }

    fn prepare_working_dir(&self) -> Result<(), PkgError> {
        let working = &self.context.working_dir;
        if working.exists() {
            fs::remove_dir_all(working).map_err(|e| {
                PkgError::publish_failed(format!(
                    "Failed to clear working directory {}: {e}",
                    working.display()
                ))
            })?;
        }
        fs::create_dir_all(&self.context.web_working_dir).map_err(|e| {
            PkgError::publish_failed(format!(
                "Failed to create working directory {}: {e}",
                self.context.web_working_dir.display()
            ))
        })
    }
}
