//! npm package handling.
//!
//! - Reading `package.json` out of package archives (`archive`)
//! - Building package descriptors with checksums and escaped metadata (`descriptor`, `escape`)
//! - Version sanitization, ordering and `latest` selection (`version`)
//! - Registry document synthesis (`registry`)
//! - Ingesting archives into a unit store (`ingest`)
//! - Rejecting names that would escape the store or publish tree (`safe_path`)

pub mod archive;
pub mod descriptor;
pub mod error;
pub mod escape;
pub mod ingest;
pub mod registry;
pub mod safe_path;
pub mod version;

pub use archive::{find_manifest, ManifestMember};
pub use descriptor::PackageDescriptor;
pub use error::{codes as pkg_codes, PkgError};
pub use escape::{decode_metadata, encode_metadata, ESCAPED_DOT};
pub use ingest::{ingest_archive, ingest_batch, IngestOutcome};
pub use registry::{synthesize, tarball_url, RegistryDocument, ROLLUP_FIELDS};
pub use safe_path::is_safe_relative_path;
pub use version::{compare_versions, is_release, latest_version, sanitize_version};
