//! `npmirror copy`: copy packages between repositories.

use super::{fail, print_json};
use miette::Result;
use npmirror_core::{Config, LocalUnitStore};

pub fn run(
    config: &Config,
    from_repo: &str,
    to_repo: &str,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let source = LocalUnitStore::open(&config.store_directory, from_repo);
    let mut dest = LocalUnitStore::open(&config.store_directory, to_repo);

    let copied = match source.copy_units(&mut dest, name) {
        Ok(keys) => keys,
        Err(e) => return fail(&e, json),
    };

    if json {
        let copied: Vec<String> = copied.iter().map(ToString::to_string).collect();
        return print_json(&serde_json::json!({
            "ok": true,
            "from_repo_id": from_repo,
            "to_repo_id": to_repo,
            "copied": copied,
        }));
    }

    println!("Copied {} unit(s) from {from_repo} to {to_repo}:", copied.len());
    for key in &copied {
        println!("  {key}");
    }
    Ok(())
}
