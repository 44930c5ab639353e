//! Checks for package-derived values that end up as path segments.
//!
//! Package names, versions and content filenames are joined onto the store
//! and publish trees. A scoped name (`@scope/name`) legitimately spans two
//! segments; anything absolute or containing `.`/`..` segments is rejected.

use std::path::{Component, Path};

/// Whether `value` stays below whatever directory it is joined onto.
#[must_use]
pub fn is_safe_relative_path(value: &str) -> bool {
    !value.is_empty()
        && Path::new(value)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_scoped_names() {
        assert!(is_safe_relative_path("nectar"));
        assert!(is_safe_relative_path("@scope/tool"));
        assert!(is_safe_relative_path("nectar-1.2.0.tgz"));
    }

    #[test]
    fn test_rejects_escaping_values() {
        for value in ["", "..", "../outside", "../../../outside", "a/../../b", "/abs", "./x"] {
            assert!(!is_safe_relative_path(value), "{value:?} accepted");
        }
    }
}
