//! `npmirror publish`: publish a repository to its web directory.

use super::{print_json, ErrorInfo};
use miette::Result;
use npmirror_core::constants::{CLI_DISTRIBUTOR_ID, DISTRIBUTOR_TYPE_ID};
use npmirror_core::publish::{NpmPublisher, PublishContext, StepReport};
use npmirror_core::{Config, LocalAtomicPublisher, LocalUnitStore};
use serde::Serialize;

#[derive(Serialize)]
struct PublishOutput<'a> {
    ok: bool,
    distributor_id: &'static str,
    distributor_type_id: &'static str,
    repo_id: &'a str,
    publish_dir: String,
    steps: &'a [StepReport],
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_step: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

pub fn run(config: &Config, repo_id: &str, json: bool) -> Result<()> {
    let store = LocalUnitStore::open(&config.store_directory, repo_id);
    let publisher = NpmPublisher::new(PublishContext::from_config(config, repo_id));
    let publish_dir = publisher.context().web_publish_dir.display().to_string();

    match publisher.publish(&store, &LocalAtomicPublisher::new()) {
        Ok(report) => {
            if json {
                print_json(&PublishOutput {
                    ok: true,
                    distributor_id: CLI_DISTRIBUTOR_ID,
                    distributor_type_id: DISTRIBUTOR_TYPE_ID,
                    repo_id,
                    publish_dir,
                    steps: &report.steps,
                    failed_step: None,
                    error: None,
                })?;
            } else {
                for step in &report.steps {
                    print_step(step);
                }
                println!("Published {repo_id} to {publish_dir}");
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                print_json(&PublishOutput {
                    ok: false,
                    distributor_id: CLI_DISTRIBUTOR_ID,
                    distributor_type_id: DISTRIBUTOR_TYPE_ID,
                    repo_id,
                    publish_dir,
                    steps: &failure.completed,
                    failed_step: Some(failure.step_id),
                    error: Some(ErrorInfo::from(&failure.error)),
                })?;
            } else {
                for step in &failure.completed {
                    print_step(step);
                }
                eprintln!("error: {failure}");
                let working_dir = &publisher.context().working_dir;
                if working_dir.is_dir() {
                    eprintln!("hint: the working tree was left in {}", working_dir.display());
                }
            }
            std::process::exit(1);
        }
    }
}

fn print_step(step: &StepReport) {
    let outcome = &step.outcome;
    let mut parts = Vec::new();
    if !outcome.files_written.is_empty() {
        parts.push(format!("{} file(s)", outcome.files_written.len()));
    }
    if !outcome.dirs_created.is_empty() {
        parts.push(format!("{} dir(s)", outcome.dirs_created.len()));
    }
    if !outcome.symlinks_created.is_empty() {
        parts.push(format!("{} symlink(s)", outcome.symlinks_created.len()));
    }
    if parts.is_empty() {
        println!("{} done", step.description);
    } else {
        println!("{} {}", step.description, parts.join(", "));
    }
}
