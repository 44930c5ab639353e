//! Version ordering for registry documents.
//!
//! Versions look like `MAJOR.MINOR.PATCH[-WORD[.N]]`. The ordering here is the
//! one the published `dist-tags.latest` has always been computed with. It is
//! close to semver precedence but not identical: the pre-release word is
//! compared as a whole string up to its first `.`, and only the final
//! dot-separated component is compared after that. Multi-part pre-release
//! identifiers are not compared component by component.

use std::cmp::Ordering;

/// Repair pre-release tags written without a separator (`1.2.0beta` -> `1.2.0-beta`).
///
/// Only the first ASCII letter is considered: a hyphen is inserted before it
/// unless one is already there. A version that starts with a letter is left
/// alone. Applying this twice gives the same result as applying it once.
#[must_use]
pub fn sanitize_version(version: &str) -> String {
    match version.find(|c: char| c.is_ascii_alphabetic()) {
        Some(pos) if pos > 0 && !version[..pos].ends_with('-') => {
            format!("{}-{}", &version[..pos], &version[pos..])
        }
        _ => version.to_string(),
    }
}

/// Compare two version strings.
///
/// 1. `MAJOR`, `MINOR`, `PATCH` numerically (missing or non-numeric parts count as 0).
/// 2. More `-`-separated segments sorts lower, so `1.0.0-beta` < `1.0.0`.
/// 3. The pre-release word (after the first `-`, up to the first `.`) compared as a string.
/// 4. Fewer `.`-separated segments sorts lower, then the last `.` component:
///    numeric components compare numerically and sort before non-numeric ones.
///    Some older registry tooling ranked the version with more segments lower;
///    this comparator deliberately keeps the fewer-is-lower rule, so
///    `1.0.0-rc` < `1.0.0-rc.1`.
///
/// Distinct strings that still tie fall back to a plain string comparison, so
/// the result is a total order over any set of distinct version strings.
#[must_use]
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    release_triple(v1)
        .cmp(&release_triple(v2))
        .then_with(|| hyphen_segments(v2).cmp(&hyphen_segments(v1)))
        .then_with(|| prerelease_word(v1).cmp(prerelease_word(v2)))
        .then_with(|| dot_segments(v1).cmp(&dot_segments(v2)))
        .then_with(|| compare_component(last_component(v1), last_component(v2)))
        .then_with(|| v1.cmp(v2))
}

/// Whether `version` is a plain release: exactly three numeric dot-separated parts.
#[must_use]
pub fn is_release(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Pick the version `dist-tags.latest` should point at.
///
/// Releases win over pre-releases: if any release exists the newest release
/// is returned, otherwise the newest version overall. Returns `None` only for
/// an empty input.
pub fn latest_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut newest_release: Option<&str> = None;
    let mut newest_any: Option<&str> = None;

    for version in versions {
        if is_release(version) {
            newest_release = Some(max_of(newest_release, version));
        }
        newest_any = Some(max_of(newest_any, version));
    }

    newest_release.or(newest_any)
}

fn max_of<'a>(current: Option<&'a str>, candidate: &'a str) -> &'a str {
    match current {
        Some(c) if compare_versions(c, candidate) == Ordering::Greater => c,
        _ => candidate,
    }
}

fn release_triple(version: &str) -> [u64; 3] {
    let mut triple = [0u64; 3];
    let release = version.split('-').next().unwrap_or_default();
    for (slot, part) in triple.iter_mut().zip(release.split('.')) {
        *slot = part.parse().unwrap_or(0);
    }
    triple
}

fn hyphen_segments(version: &str) -> usize {
    version.split('-').count()
}

fn prerelease_word(version: &str) -> &str {
    version
        .split('-')
        .nth(1)
        .and_then(|rem| rem.split('.').next())
        .unwrap_or_default()
}

fn dot_segments(version: &str) -> usize {
    version.split('.').count()
}

fn last_component(version: &str) -> &str {
    version.rsplit('.').next().unwrap_or_default()
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_inserts_hyphen() {
        assert_eq!(sanitize_version("1.2.0beta"), "1.2.0-beta");
        assert_eq!(sanitize_version("0.1.0rc.1"), "0.1.0-rc.1");
    }

    #[test]
    fn test_sanitize_leaves_valid_versions() {
        assert_eq!(sanitize_version("1.2.0"), "1.2.0");
        assert_eq!(sanitize_version("1.2.0-beta"), "1.2.0-beta");
        assert_eq!(sanitize_version("1.2.0-beta.rc"), "1.2.0-beta.rc");
        assert_eq!(sanitize_version("v1.0.0"), "v1.0.0");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for v in ["1.2.0beta", "1.2.0-beta", "2.0.0alpha.3", "3.1.4", "1.0.0-1a", "x"] {
            let once = sanitize_version(v);
            assert_eq!(sanitize_version(&once), once, "not idempotent for {v}");
        }
    }

    #[test]
    fn test_numeric_parts_compare_numerically() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "10.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.2.0", "1.1.9"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_below_release() {
        assert_eq!(compare_versions("1.1.9-beta", "1.1.9"), Ordering::Less);
        assert_eq!(compare_versions("1.1.9", "1.1.9-beta"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_word_lexicographic() {
        assert_eq!(compare_versions("1.1.9-alpha.2", "1.1.9-beta"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0.0-beta.9"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_number_numeric() {
        assert_eq!(compare_versions("1.1.9-alpha.2", "1.1.9-alpha.1"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0-rc.10", "1.0.0-rc.9"), Ordering::Greater);
    }

    #[test]
    fn test_fewer_dot_segments_sorts_lower() {
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0-beta.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0.0-rc"), Ordering::Greater);
    }

    #[test]
    fn test_documented_chain_sorted() {
        let mut versions = vec![
            "1.1.9-alpha.1",
            "1.2.0",
            "1.1.9-beta",
            "1.1.9",
            "1.1.9-alpha.2",
        ];
        versions.sort_by(|a, b| compare_versions(a, b));
        assert_eq!(
            versions,
            vec!["1.1.9-alpha.1", "1.1.9-alpha.2", "1.1.9-beta", "1.1.9", "1.2.0"]
        );
    }

    #[test]
    fn test_strict_total_order() {
        let versions = [
            "0.9.5", "1.0.0", "1.0.0-rc.1", "1.0.0-rc.2", "1.0.0-beta", "1.0.0-beta.1",
            "1.0.0-beta.x", "1.1.0-rc.1", "2.0.0", "1.0.0.1", "1.0.0-a-b", "10.0.0",
        ];

        for a in versions {
            for b in versions {
                let ab = compare_versions(a, b);
                assert_eq!(ab, compare_versions(b, a).reverse(), "antisymmetry {a} {b}");
                assert_eq!(ab == Ordering::Equal, a == b, "equality {a} {b}");
                for c in versions {
                    if ab == Ordering::Less && compare_versions(b, c) == Ordering::Less {
                        assert_eq!(
                            compare_versions(a, c),
                            Ordering::Less,
                            "transitivity {a} < {b} < {c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_is_release() {
        assert!(is_release("1.0.0"));
        assert!(is_release("10.20.30"));
        assert!(!is_release("1.0.0-beta"));
        assert!(!is_release("1.1.0-rc.1"));
        assert!(!is_release("1.0"));
        assert!(!is_release("1.0.0.0"));
    }

    #[test]
    fn test_latest_prefers_releases() {
        let latest = latest_version(["1.0.0", "1.1.0-rc.1", "0.9.5"]);
        assert_eq!(latest, Some("1.0.0"));
    }

    #[test]
    fn test_latest_falls_back_to_prereleases() {
        let latest = latest_version(["1.0.0-rc.1", "0.9.0-beta"]);
        assert_eq!(latest, Some("1.0.0-rc.1"));
    }

    #[test]
    fn test_latest_ignores_unhyphenated_prerelease_shape() {
        // "2.0.0-beta" has three dot segments but is still a pre-release
        let latest = latest_version(["1.5.0", "2.0.0-beta"]);
        assert_eq!(latest, Some("1.5.0"));
    }

    #[test]
    fn test_latest_empty() {
        assert_eq!(latest_version(Vec::<&str>::new()), None);
    }
}
