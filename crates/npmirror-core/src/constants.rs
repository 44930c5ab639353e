//! Type and step identifiers shared with the host platform.

/// Content unit type id for npm packages.
pub const PACKAGE_TYPE_ID: &str = "npm_package";

pub const IMPORTER_TYPE_ID: &str = "npm_importer";
pub const DISTRIBUTOR_TYPE_ID: &str = "npm_distributor";

/// Distributor id the CLI attaches to repositories it creates.
pub const CLI_DISTRIBUTOR_ID: &str = "cli_npm_distributor";

pub const PUBLISH_STEP_PUBLISHER: &str = "npm_publish_step";
pub const PUBLISH_STEP_CONTENT: &str = "npm_publish_content";
pub const PUBLISH_STEP_METADATA: &str = "npm_publish_metadata";
pub const PUBLISH_STEP_OVER_HTTP: &str = "npm_publish_over_http";
