use super::print_json;
use miette::Result;
use npmirror_core::version::{version_string, SCHEMA_VERSION};
use npmirror_core::VERSION;

pub fn run(json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::json!({
            "ok": true,
            "version": VERSION,
            "schema_version": SCHEMA_VERSION,
        }))
    } else {
        println!("{}", version_string());
        Ok(())
    }
}
