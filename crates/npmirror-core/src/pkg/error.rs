//! Package error types.

use std::fmt;
use std::io;

/// Package error codes.
pub mod codes {
    /// Archive unreadable or has no manifest.
    pub const NPM_INVALID_ARCHIVE: &str = "NPM_INVALID_ARCHIVE";
    /// Manifest present but not a JSON object.
    pub const NPM_MALFORMED_MANIFEST: &str = "NPM_MALFORMED_MANIFEST";
    /// Manifest lacks `name` or `version`.
    pub const NPM_MISSING_REQUIRED_FIELD: &str = "NPM_MISSING_REQUIRED_FIELD";
    pub const NPM_UNSUPPORTED_CHECKSUM: &str = "NPM_UNSUPPORTED_CHECKSUM";
    pub const NPM_UNIT_STORE_ERROR: &str = "NPM_UNIT_STORE_ERROR";
    pub const NPM_UNIT_NOT_FOUND: &str = "NPM_UNIT_NOT_FOUND";
    pub const NPM_PUBLISH_FAILED: &str = "NPM_PUBLISH_FAILED";
    pub const NPM_ATOMIC_PUBLISH_FAILED: &str = "NPM_ATOMIC_PUBLISH_FAILED";
}

/// Package error.
#[derive(Debug)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create an invalid archive error.
    pub fn invalid_archive(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_INVALID_ARCHIVE, msg)
    }

    /// Create a malformed manifest error.
    pub fn malformed_manifest(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_MALFORMED_MANIFEST, msg)
    }

    /// Create a missing required field error.
    pub fn missing_required_field(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_MISSING_REQUIRED_FIELD, msg)
    }

    /// Create an unsupported checksum algorithm error.
    pub fn unsupported_checksum(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_UNSUPPORTED_CHECKSUM, msg)
    }

    /// Create a unit store error.
    pub fn unit_store(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_UNIT_STORE_ERROR, msg)
    }

    /// Create a unit not found error.
    #[must_use]
    pub fn unit_not_found(name: &str, version: Option<&str>) -> Self {
        let key = match version {
            Some(v) => format!("{name}-{v}"),
            None => name.to_string(),
        };
        Self::new(codes::NPM_UNIT_NOT_FOUND, format!("No unit matches: {key}"))
    }

    /// Create a publish failed error.
    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_PUBLISH_FAILED, msg)
    }

    /// Create an atomic publish failed error.
    pub fn atomic_publish_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::NPM_ATOMIC_PUBLISH_FAILED, msg)
    }

    /// Whether this error came from reading an uploaded archive.
    #[must_use]
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self.code,
            codes::NPM_INVALID_ARCHIVE
                | codes::NPM_MALFORMED_MANIFEST
                | codes::NPM_MISSING_REQUIRED_FIELD
        )
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::NPM_UNIT_STORE_ERROR, e.to_string())
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(codes::NPM_UNIT_STORE_ERROR, format!("Invalid JSON: {e}"))
    }
}
