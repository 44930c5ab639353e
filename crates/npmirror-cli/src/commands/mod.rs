pub mod copy;
pub mod inspect;
pub mod packages;
pub mod publish;
pub mod remove;
pub mod upload;
pub mod version;

use miette::{IntoDiagnostic, Result};
use npmirror_core::pkg::PkgError;
use npmirror_core::Config;
use npmirror_util::ChecksumAlgorithm;
use serde::Serialize;

/// Error as it appears in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&PkgError> for ErrorInfo {
    fn from(err: &PkgError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    ok: bool,
    error: &'a ErrorInfo,
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Report a fatal error and exit with status 1.
pub fn fail(err: &PkgError, json: bool) -> Result<()> {
    if json {
        print_json(&FailureOutput {
            ok: false,
            error: &ErrorInfo::from(err),
        })?;
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(1);
}

/// Resolve the configured checksum algorithm as a package error.
pub fn checksum_algorithm(config: &Config) -> Result<ChecksumAlgorithm, PkgError> {
    config
        .checksum_algorithm()
        .map_err(|e| PkgError::unsupported_checksum(e.to_string()))
}
