//! Host collaborators: unit persistence and atomic directory publishing.
//!
//! The package logic only talks to the host through [`UnitConduit`] and
//! [`AtomicPublisher`]. [`store::LocalUnitStore`] and
//! [`atomic::LocalAtomicPublisher`] are filesystem implementations used by
//! the CLI and the tests.

pub mod atomic;
pub mod store;

use crate::pkg::PkgError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

pub use atomic::LocalAtomicPublisher;
pub use store::LocalUnitStore;

/// Identity of a unit within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub name: String,
    pub version: String,
}

impl UnitKey {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A content unit as persisted by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub type_id: String,
    pub unit_key: UnitKey,
    /// Stored metadata; keys are escaped.
    pub metadata: Map<String, Value>,
    /// Absolute path of the unit's content file.
    pub storage_path: PathBuf,
}

/// Unit persistence as seen by importers and distributors.
pub trait UnitConduit {
    /// Register a new unit. `relative_path` is the content file name; the
    /// returned unit carries the absolute `storage_path` it must be written to.
    fn init_unit(
        &mut self,
        type_id: &str,
        unit_key: UnitKey,
        metadata: Map<String, Value>,
        relative_path: &str,
    ) -> Result<Unit, PkgError>;

    /// Commit a unit returned by [`UnitConduit::init_unit`].
    fn save_unit(&mut self, unit: &Unit) -> Result<(), PkgError>;

    /// All units currently associated with the repository.
    fn get_units(&self) -> Result<Vec<Unit>, PkgError>;
}

/// Swaps an assembled working tree into its served location.
pub trait AtomicPublisher {
    /// Publish `working_dir`.
    ///
    /// Each `(relative_dir, public_dir)` pair exposes `working_dir/relative_dir`
    /// at `public_dir`. A copy of the tree is kept below `master_dir`. Returns
    /// the master directory the tree now lives in.
    fn publish(
        &self,
        working_dir: &Path,
        publish_dirs: &[(String, PathBuf)],
        master_dir: &Path,
    ) -> Result<PathBuf, PkgError>;
}
