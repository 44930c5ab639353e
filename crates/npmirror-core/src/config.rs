use crate::error::Error;
use crate::paths;
use npmirror_util::{ChecksumAlgorithm, DEFAULT_CHECKSUM_TYPE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default directory published trees are served from.
pub const DEFAULT_PUBLISH_DIRECTORY: &str = "/var/lib/pulp/published/npm";

/// Default hostname substituted into tarball URLs.
pub const DEFAULT_PUBLISH_DOMAIN: &str = "localhost";

/// Environment variable overriding the publish domain.
pub const PUBLISH_DOMAIN_ENV: &str = "NPMIRROR_PUBLISH_DOMAIN";

/// Environment variable overriding the publish directory.
pub const PUBLISH_DIRECTORY_ENV: &str = "NPMIRROR_PUBLISH_DIRECTORY";

/// Runtime configuration for npmirror.
///
/// Serialized field names match the distributor config file keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the served tree (`web/` and `master/` live below it).
    #[serde(rename = "npm_publish_directory")]
    pub publish_directory: PathBuf,

    /// Hostname used to build tarball URLs.
    #[serde(rename = "npm_publish_domain")]
    pub publish_domain: String,

    /// Digest algorithm name for unit checksums.
    pub checksum_type: String,

    /// Root of the local unit store.
    pub store_directory: PathBuf,

    /// Root for publish working directories.
    pub working_directory: PathBuf,

    /// Whether to emit JSON logs.
    #[serde(skip)]
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    #[serde(skip)]
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            publish_directory: PathBuf::from(DEFAULT_PUBLISH_DIRECTORY),
            publish_domain: DEFAULT_PUBLISH_DOMAIN.to_string(),
            checksum_type: DEFAULT_CHECKSUM_TYPE.to_string(),
            store_directory: paths::default_store_dir(),
            working_directory: paths::default_working_dir(),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Load a distributor config file. Keys absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.checksum_algorithm()?;
        Ok(config)
    }

    /// Apply `NPMIRROR_PUBLISH_DOMAIN` / `NPMIRROR_PUBLISH_DIRECTORY` overrides.
    #[must_use]
    pub fn apply_env(mut self) -> Self {
        if let Ok(domain) = std::env::var(PUBLISH_DOMAIN_ENV) {
            if !domain.is_empty() {
                self.publish_domain = domain;
            }
        }
        if let Ok(dir) = std::env::var(PUBLISH_DIRECTORY_ENV) {
            if !dir.is_empty() {
                self.publish_directory = PathBuf::from(dir);
            }
        }
        self
    }

    /// Parse the configured checksum type.
    pub fn checksum_algorithm(&self) -> Result<ChecksumAlgorithm, Error> {
        self.checksum_type
            .parse()
            .map_err(|e: npmirror_util::hash::UnknownAlgorithm| Error::ConfigValue {
                key: "checksum_type",
                message: e.to_string(),
            })
    }

    /// Public directory for a repository.
    #[must_use]
    pub fn web_publish_dir(&self, repo_id: &str) -> PathBuf {
        paths::web_publish_dir(&self.publish_directory, repo_id)
    }

    /// History directory for a repository.
    #[must_use]
    pub fn master_publish_dir(&self, repo_id: &str) -> PathBuf {
        paths::master_publish_dir(&self.publish_directory, repo_id)
    }

    /// Set the publish directory.
    #[must_use]
    pub fn with_publish_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.publish_directory = dir.into();
        self
    }

    /// Set the publish domain.
    #[must_use]
    pub fn with_publish_domain(mut self, domain: impl Into<String>) -> Self {
        self.publish_domain = domain.into();
        self
    }

    /// Set the checksum type.
    #[must_use]
    pub fn with_checksum_type(mut self, checksum_type: impl Into<String>) -> Self {
        self.checksum_type = checksum_type.into();
        self
    }

    /// Set the unit store root.
    #[must_use]
    pub fn with_store_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_directory = dir.into();
        self
    }

    /// Set the working directory root.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.publish_domain, "localhost");
        assert_eq!(
            config.publish_directory,
            PathBuf::from("/var/lib/pulp/published/npm")
        );
        assert_eq!(config.checksum_algorithm().unwrap(), ChecksumAlgorithm::Sha1);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("npm_distributor.json");
        fs::write(&path, r#"{"npm_publish_domain": "example.com"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.publish_domain, "example.com");
        assert_eq!(config.checksum_type, "sha1");
        assert_eq!(
            config.publish_directory,
            PathBuf::from(DEFAULT_PUBLISH_DIRECTORY)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/npm_distributor.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("npm_distributor.json");
        fs::write(&path, "not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("npm_distributor.json");
        fs::write(&path, r#"{"checksum_type": "crc32"}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValue {
                key: "checksum_type",
                ..
            }
        ));
    }

    #[test]
    fn test_repo_dirs() {
        let config = Config::default().with_publish_directory("/srv/npm");
        assert_eq!(
            config.web_publish_dir("myrepo"),
            PathBuf::from("/srv/npm/web/myrepo")
        );
        assert_eq!(
            config.master_publish_dir("myrepo"),
            PathBuf::from("/srv/npm/master/myrepo")
        );
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        std::env::set_var(PUBLISH_DOMAIN_ENV, "mirror.example.org");
        std::env::set_var(PUBLISH_DIRECTORY_ENV, "/srv/published");

        let config = Config::default().apply_env();
        assert_eq!(config.publish_domain, "mirror.example.org");
        assert_eq!(config.publish_directory, PathBuf::from("/srv/published"));

        std::env::remove_var(PUBLISH_DOMAIN_ENV);
        std::env::remove_var(PUBLISH_DIRECTORY_ENV);
    }

    #[test]
    #[serial]
    fn test_apply_env_ignores_empty() {
        std::env::set_var(PUBLISH_DOMAIN_ENV, "");
        std::env::remove_var(PUBLISH_DIRECTORY_ENV);

        let config = Config::default().apply_env();
        assert_eq!(config.publish_domain, DEFAULT_PUBLISH_DOMAIN);

        std::env::remove_var(PUBLISH_DOMAIN_ENV);
    }
}
