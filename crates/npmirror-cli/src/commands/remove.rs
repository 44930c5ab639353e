//! `npmirror remove`: remove packages from a repository.

use super::{fail, print_json};
use miette::Result;
use npmirror_core::{Config, LocalUnitStore};

pub fn run(
    config: &Config,
    repo_id: &str,
    name: &str,
    version: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut store = LocalUnitStore::open(&config.store_directory, repo_id);
    let removed = match store.remove_units(name, version) {
        Ok(keys) => keys,
        Err(e) => return fail(&e, json),
    };

    if json {
        let removed: Vec<String> = removed.iter().map(ToString::to_string).collect();
        return print_json(&serde_json::json!({
            "ok": true,
            "repo_id": repo_id,
            "removed": removed,
        }));
    }

    println!("Removed {} unit(s) from {repo_id}:", removed.len());
    for key in &removed {
        println!("  {key}");
    }
    Ok(())
}
