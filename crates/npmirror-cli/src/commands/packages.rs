//! `npmirror packages`: list the packages in a repository.

use super::{fail, print_json};
use miette::Result;
use npmirror_core::constants::PACKAGE_TYPE_ID;
use npmirror_core::host::{Unit, UnitConduit};
use npmirror_core::pkg::decode_metadata;
use npmirror_core::{Config, LocalUnitStore};
use serde_json::{Map, Value};

/// Fields shown first; the rest follow alphabetically.
const LEADING_FIELDS: [&str; 3] = ["name", "version", "author"];

pub fn run(config: &Config, repo_id: &str, json: bool) -> Result<()> {
    let store = LocalUnitStore::open(&config.store_directory, repo_id);
    let units = match store.get_units() {
        Ok(units) => units,
        Err(e) => return fail(&e, json),
    };

    let documents: Vec<Map<String, Value>> = units
        .iter()
        .filter(|u| u.type_id == PACKAGE_TYPE_ID)
        .map(display_document)
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "ok": true,
            "repo_id": repo_id,
            "packages": documents,
        }));
    }

    if documents.is_empty() {
        println!("No packages in repository {repo_id}");
        return Ok(());
    }
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            println!();
        }
        for (key, value) in ordered_fields(doc) {
            println!("{:<16}{}", format!("{}:", title_case(key)), render(value));
        }
    }
    Ok(())
}

/// Decoded metadata with the unit key merged in.
fn display_document(unit: &Unit) -> Map<String, Value> {
    let mut doc = unit.metadata.clone();
    decode_metadata(&mut doc);
    doc.insert("name".to_string(), Value::String(unit.unit_key.name.clone()));
    doc.insert(
        "version".to_string(),
        Value::String(unit.unit_key.version.clone()),
    );
    doc
}

fn ordered_fields(doc: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut fields: Vec<(&str, &Value)> = LEADING_FIELDS
        .iter()
        .filter_map(|k| doc.get(*k).map(|v| (*k, v)))
        .collect();

    let mut rest: Vec<(&str, &Value)> = doc
        .iter()
        .filter(|(k, _)| !LEADING_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v))
        .collect();
    rest.sort_by(|a, b| a.0.cmp(b.0));

    fields.extend(rest);
    fields
}

fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
