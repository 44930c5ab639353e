#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod paths;
pub mod pkg;
pub mod publish;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use host::{AtomicPublisher, LocalAtomicPublisher, LocalUnitStore, Unit, UnitConduit, UnitKey};
pub use pkg::{PackageDescriptor, PkgError, RegistryDocument};
pub use publish::{NpmPublisher, PublishContext, PublishFailure, PublishReport};
pub use version::VERSION;
