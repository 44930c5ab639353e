//! Package archive reading.

use super::error::PkgError;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tar::{Archive, EntryType};

/// Suffix a member name must end with to be considered a manifest.
pub const MANIFEST_SUFFIX: &str = "/package.json";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A manifest file found inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMember {
    /// Member path inside the archive, e.g. `package/package.json`.
    pub path: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

/// Whether an archive member name looks like a package manifest.
#[must_use]
pub fn is_manifest_path(member: &str) -> bool {
    member.ends_with(MANIFEST_SUFFIX)
}

/// Find the outermost `package.json` in a tar or gzip-compressed tar archive.
///
/// When several members match, the one with the shortest path wins; on a
/// tie the first one in archive order is kept.
///
/// # Errors
/// Returns `NPM_INVALID_ARCHIVE` if the archive cannot be read or contains no manifest.
pub fn find_manifest(archive_path: &Path) -> Result<ManifestMember, PkgError> {
    let file = File::open(archive_path).map_err(|e| {
        PkgError::invalid_archive(format!(
            "Failed to open archive {}: {e}",
            archive_path.display()
        ))
    })?;

    let mut reader = BufReader::new(file);
    let is_gzip = reader
        .fill_buf()
        .map(|head| head.starts_with(&GZIP_MAGIC))
        .map_err(|e| {
            PkgError::invalid_archive(format!(
                "Failed to read archive {}: {e}",
                archive_path.display()
            ))
        })?;

    let stream: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    find_manifest_in(stream)?.ok_or_else(|| {
        PkgError::invalid_archive(format!(
            "The archive at {} does not contain a package.json file",
            archive_path.display()
        ))
    })
}

fn find_manifest_in(stream: impl Read) -> Result<Option<ManifestMember>, PkgError> {
    let mut archive = Archive::new(stream);
    let mut best: Option<ManifestMember> = None;

    for entry in archive
        .entries()
        .map_err(|e| PkgError::invalid_archive(format!("Failed to read archive entries: {e}")))?
    {
        let mut entry = entry
            .map_err(|e| PkgError::invalid_archive(format!("Failed to read archive entry: {e}")))?;

        if !matches!(
            entry.header().entry_type(),
            EntryType::Regular | EntryType::Continuous
        ) {
            continue;
        }

        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if !is_manifest_path(&path) {
            continue;
        }
        if best.as_ref().is_some_and(|b| b.path.len() <= path.len()) {
            continue;
        }

        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(|e| {
            PkgError::invalid_archive(format!("Failed to read {path} from archive: {e}"))
        })?;
        best = Some(ManifestMember { path, content });
    }

    Ok(best)
}


#[cfg(test)]
mod tests {
    use super::test_support::{tar_bytes, tgz_bytes};
    use super::*;
    use crate::pkg::error::codes;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_path_pattern() {
        assert!(is_manifest_path("package/package.json"));
        assert!(is_manifest_path("a/b/package.json"));
        assert!(!is_manifest_path("package.json"));
        assert!(!is_manifest_path("package/package.json.bak"));
        assert!(!is_manifest_path("package/my-package.json"));
    }

    #[test]
    fn test_find_manifest_in_tgz() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("left-pad-1.0.0.tgz");
        fs::write(
            &path,
            tgz_bytes(&[
                ("package/index.js", b"module.exports = 1;"),
                ("package/package.json", br#"{"name":"left-pad"}"#),
            ]),
        )
        .unwrap();

        let manifest = find_manifest(&path).unwrap();
        assert_eq!(manifest.path, "package/package.json");
        assert_eq!(manifest.content, br#"{"name":"left-pad"}"#);
    }

    #[test]
    fn test_find_manifest_in_plain_tar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("left-pad-1.0.0.tar");
        fs::write(&path, tar_bytes(&[("package/package.json", b"{}")])).unwrap();

        let manifest = find_manifest(&path).unwrap();
        assert_eq!(manifest.path, "package/package.json");
    }

    #[test]
    fn test_shortest_manifest_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tgz");
        fs::write(
            &path,
            tgz_bytes(&[
                ("package/node_modules/dep/package.json", b"{\"inner\":true}"),
                ("package/package.json", b"{\"outer\":true}"),
                ("package/test/fixtures/package.json", b"{\"fixture\":true}"),
            ]),
        )
        .unwrap();

        let manifest = find_manifest(&path).unwrap();
        assert_eq!(manifest.path, "package/package.json");
        assert_eq!(manifest.content, b"{\"outer\":true}");
    }

    #[test]
    fn test_missing_manifest_is_invalid_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tgz");
        fs::write(&path, tgz_bytes(&[("package/index.js", b"1")])).unwrap();

        let err = find_manifest(&path).unwrap_err();
        assert_eq!(err.code(), codes::NPM_INVALID_ARCHIVE);
        assert!(err.message().contains("does not contain a package.json"));
    }

    #[test]
    fn test_top_level_manifest_not_matched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tgz");
        fs::write(&path, tgz_bytes(&[("package.json", b"{}")])).unwrap();

        let err = find_manifest(&path).unwrap_err();
        assert_eq!(err.code(), codes::NPM_INVALID_ARCHIVE);
    }

    #[test]
    fn test_garbage_is_invalid_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tgz");
        fs::write(&path, [0x1f, 0x8b, 0x00, 0x01, 0x02]).unwrap();

        let err = find_manifest(&path).unwrap_err();
        assert_eq!(err.code(), codes::NPM_INVALID_ARCHIVE);
    }

    #[test]
    fn test_nonexistent_archive() {
        let err = find_manifest(Path::new("/nonexistent/pkg.tgz")).unwrap_err();
        assert_eq!(err.code(), codes::NPM_INVALID_ARCHIVE);
    }
}
