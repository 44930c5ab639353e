//! Registry document synthesis.
//!
//! Rebuilds npm registry package documents ("packuments") from the stored
//! descriptors of one repository. One document is produced per package name;
//! each lists every stored version, points `dist-tags.latest` at the version
//! picked by [`latest_version`], and lifts a fixed set of descriptive fields
//! from that version to the document root.

use super::descriptor::PackageDescriptor;
use super::escape::decode_metadata;
use super::version::latest_version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fields copied from the latest version's metadata into the document root.
pub const ROLLUP_FIELDS: &[&str] = &[
    "author",
    "bugs",
    "contributors",
    "description",
    "homepage",
    "keywords",
    "license",
    "maintainers",
    "readme",
    "readmeFilename",
    "repository",
];

/// Dist-tag always present in a synthesized document.
pub const LATEST_TAG: &str = "latest";

/// An npm registry package document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Version string to full version metadata.
    pub versions: BTreeMap<String, Value>,
    #[serde(rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(rename = "_attachments")]
    pub attachments: Map<String, Value>,
    /// Rolled-up descriptive fields (see [`ROLLUP_FIELDS`]).
    #[serde(flatten)]
    pub rollup: Map<String, Value>,
}

impl RegistryDocument {
    /// The version `dist-tags.latest` points at.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get(LATEST_TAG).map(String::as_str)
    }

    /// File name this document is written to, relative to the publish tree.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

/// Absolute download URL for a package archive in a published repository.
#[must_use]
pub fn tarball_url(publish_domain: &str, repo_id: &str, name: &str, filename: &str) -> String {
    format!("http://{publish_domain}/pulp/npm/web/{repo_id}/{name}/-/{filename}")
}

/// Build one registry document per package name.
///
/// Deterministic for a fixed set of descriptors regardless of their order,
/// provided no `(name, version)` pair repeats.
#[must_use]
pub fn synthesize(
    descriptors: &[PackageDescriptor],
    publish_domain: &str,
    repo_id: &str,
) -> BTreeMap<String, RegistryDocument> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();

    for descriptor in descriptors {
        let entry = version_entry(descriptor, publish_domain, repo_id);
        grouped
            .entry(descriptor.name.clone())
            .or_default()
            .insert(descriptor.version.clone(), entry);
    }

    grouped
        .into_iter()
        .map(|(name, versions)| {
            let document = rollup(&name, versions);
            (name, document)
        })
        .collect()
}

fn version_entry(descriptor: &PackageDescriptor, publish_domain: &str, repo_id: &str) -> Value {
    let mut meta = descriptor.metadata.clone();
    decode_metadata(&mut meta);

    let id = meta
        .remove("id")
        .unwrap_or_else(|| Value::String(format!("{}@{}", descriptor.name, descriptor.version)));
    meta.insert("_id".to_string(), id);
    meta.insert("version".to_string(), Value::String(descriptor.version.clone()));
    meta.insert("name".to_string(), Value::String(descriptor.name.clone()));

    let url = Value::String(tarball_url(
        publish_domain,
        repo_id,
        &descriptor.name,
        &descriptor.filename,
    ));
    match meta.get_mut("dist") {
        Some(Value::Object(dist)) => {
            dist.insert("tarball".to_string(), url);
        }
        _ => {
            let mut dist = Map::new();
            dist.insert("shasum".to_string(), Value::String(descriptor.checksum.clone()));
            dist.insert("tarball".to_string(), url);
            meta.insert("dist".to_string(), Value::Object(dist));
        }
    }

    Value::Object(meta)
}

fn rollup(name: &str, versions: BTreeMap<String, Value>) -> RegistryDocument {
    let mut dist_tags = BTreeMap::new();
    let mut fields = Map::new();

    if let Some(latest) = latest_version(versions.keys().map(String::as_str)) {
        dist_tags.insert(LATEST_TAG.to_string(), latest.to_string());
        if let Some(Value::Object(latest_meta)) = versions.get(latest) {
            for field in ROLLUP_FIELDS {
                if let Some(value) = latest_meta.get(*field) {
                    fields.insert((*field).to_string(), value.clone());
                }
            }
        }
    }

    RegistryDocument {
        id: name.to_string(),
        name: name.to_string(),
        versions,
        dist_tags,
        attachments: Map::new(),
        rollup: fields,
    }
}
