//! Option groups shared between commands.
//!
//! Each group is a standalone `clap::Args` struct; commands pick the groups
//! they need with `#[command(flatten)]` and each group applies itself to the
//! loaded [`Config`].

use clap::Args;
use miette::{IntoDiagnostic, Result};
use npmirror_core::Config;
use std::path::PathBuf;

/// Options accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Distributor config file (JSON)
    #[arg(long, global = true, value_name = "PATH", env = "NPMIRROR_CONFIG")]
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    /// Load the config file if one was given, then apply environment overrides.
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path).into_diagnostic()?,
            None => Config::default(),
        };
        Ok(config
            .apply_env()
            .with_verbosity(self.verbose)
            .with_json_logs(self.json))
    }
}

#[derive(Args, Debug, Clone)]
pub struct RepoOptions {
    /// Repository to operate on
    #[arg(long = "repo-id", value_name = "REPO")]
    pub repo_id: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StoreOptions {
    /// Root of the local unit store
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

impl StoreOptions {
    pub fn apply(&self, config: Config) -> Config {
        match &self.store {
            Some(dir) => config.with_store_directory(dir),
            None => config,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PublishOptions {
    /// Root directory published trees are served from
    #[arg(long, value_name = "PATH")]
    pub publish_dir: Option<PathBuf>,

    /// Hostname used in tarball URLs
    #[arg(long, value_name = "HOST")]
    pub publish_domain: Option<String>,

    /// Scratch root for assembling the published tree
    #[arg(long, value_name = "PATH")]
    pub working_dir: Option<PathBuf>,
}

impl PublishOptions {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.publish_dir {
            config = config.with_publish_directory(dir);
        }
        if let Some(domain) = &self.publish_domain {
            config = config.with_publish_domain(domain);
        }
        if let Some(dir) = &self.working_dir {
            config = config.with_working_directory(dir);
        }
        config
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ChecksumOptions {
    /// Checksum algorithm: sha1, sha256, sha512 or blake3
    #[arg(long, value_name = "TYPE")]
    pub checksum_type: Option<String>,
}

impl ChecksumOptions {
    pub fn apply(&self, config: Config) -> Config {
        match &self.checksum_type {
            Some(t) => config.with_checksum_type(t),
            None => config,
        }
    }
}
