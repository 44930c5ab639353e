#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;
mod options;

use clap::Parser;
use miette::Result;
use options::{ChecksumOptions, GlobalOptions, PublishOptions, RepoOptions, StoreOptions};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "npmirror")]
#[command(author, version, about = "Ingest npm package archives and publish them as a registry tree", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Show the descriptor an archive would be stored as
    Inspect {
        /// Package archive (.tgz, .tar.gz or .tar)
        archive: PathBuf,

        #[command(flatten)]
        checksum: ChecksumOptions,
    },

    /// Upload package archives into a repository
    Upload {
        #[command(flatten)]
        repo: RepoOptions,

        #[command(flatten)]
        store: StoreOptions,

        #[command(flatten)]
        checksum: ChecksumOptions,

        /// Package archives to upload
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },

    /// List packages in a repository
    Packages {
        #[command(flatten)]
        repo: RepoOptions,

        #[command(flatten)]
        store: StoreOptions,
    },

    /// Remove packages from a repository
    Remove {
        #[command(flatten)]
        repo: RepoOptions,

        #[command(flatten)]
        store: StoreOptions,

        /// Package name
        #[arg(long)]
        name: String,

        /// Only remove this version
        #[arg(long)]
        version: Option<String>,
    },

    /// Copy packages from one repository to another
    Copy {
        #[command(flatten)]
        repo: RepoOptions,

        #[command(flatten)]
        store: StoreOptions,

        /// Destination repository
        #[arg(long = "to-repo-id", value_name = "REPO")]
        to_repo_id: String,

        /// Only copy packages with this name
        #[arg(long)]
        name: Option<String>,
    },

    /// Publish a repository to its web directory
    Publish {
        #[command(flatten)]
        repo: RepoOptions,

        #[command(flatten)]
        store: StoreOptions,

        #[command(flatten)]
        publish: PublishOptions,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.global.json;

    let Some(command) = cli.command else {
        println!("npmirror: run with --help for usage");
        return Ok(());
    };

    if matches!(command, Commands::Version) {
        return commands::version::run(json);
    }

    let config = cli.global.load_config()?;
    logging::init(config.verbosity, config.json_logs);
    debug!(?config, "Loaded configuration");

    match command {
        Commands::Version => commands::version::run(json),
        Commands::Inspect { archive, checksum } => {
            commands::inspect::run(&checksum.apply(config), &archive, json)
        }
        Commands::Upload {
            repo,
            store,
            checksum,
            archives,
        } => {
            let config = checksum.apply(store.apply(config));
            commands::upload::run(&config, &repo.repo_id, &archives, json)
        }
        Commands::Packages { repo, store } => {
            commands::packages::run(&store.apply(config), &repo.repo_id, json)
        }
        Commands::Remove {
            repo,
            store,
            name,
            version,
        } => commands::remove::run(
            &store.apply(config),
            &repo.repo_id,
            &name,
            version.as_deref(),
            json,
        ),
        Commands::Copy {
            repo,
            store,
            to_repo_id,
            name,
        } => commands::copy::run(
            &store.apply(config),
            &repo.repo_id,
            &to_repo_id,
            name.as_deref(),
            json,
        ),
        Commands::Publish {
            repo,
            store,
            publish,
        } => {
            let config = publish.apply(store.apply(config));
            commands::publish::run(&config, &repo.repo_id, json)
        }
    }
}
