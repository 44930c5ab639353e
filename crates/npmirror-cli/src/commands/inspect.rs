//! `npmirror inspect`: show the descriptor an archive would be stored as.

use super::{checksum_algorithm, fail, print_json};
use miette::Result;
use npmirror_core::pkg::{decode_metadata, PackageDescriptor};
use npmirror_core::Config;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct InspectOutput<'a> {
    ok: bool,
    package: &'a PackageDescriptor,
}

pub fn run(config: &Config, archive: &Path, json: bool) -> Result<()> {
    let descriptor = match checksum_algorithm(config)
        .and_then(|algo| PackageDescriptor::extract_with(archive, algo))
    {
        Ok(d) => d,
        Err(e) => return fail(&e, json),
    };

    if json {
        return print_json(&InspectOutput {
            ok: true,
            package: &descriptor,
        });
    }

    println!("{descriptor}");
    println!("  filename: {}", descriptor.filename);
    println!(
        "  checksum: {}:{}",
        descriptor.checksum_type, descriptor.checksum
    );

    let mut metadata = descriptor.metadata.clone();
    decode_metadata(&mut metadata);
    for (key, value) in &metadata {
        println!("  {key}: {value}");
    }
    Ok(())
}
