use digest::Digest;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Name of the checksum algorithm used when none is configured.
pub const DEFAULT_CHECKSUM_TYPE: &str = "sha1";

/// Read size used when streaming a file through a hasher (32 MiB).
///
/// Archives can be arbitrarily large, so they are never loaded whole.
pub const CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Digest algorithms accepted for unit checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl ChecksumAlgorithm {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a checksum algorithm name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported checksum algorithm '{}'", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for ChecksumAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Compute the checksum of a file with the given algorithm, returning the hex-encoded digest.
///
/// Streams the file in [`CHUNK_SIZE`] reads to bound memory usage.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn checksum_file(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let mut file = File::open(path)?;
    match algorithm {
        ChecksumAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(&mut file),
        ChecksumAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(&mut file),
        ChecksumAlgorithm::Sha512 => digest_reader::<sha2::Sha512>(&mut file),
        ChecksumAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            for_each_chunk(&mut file, |chunk| {
                hasher.update(chunk);
            })?;
            Ok(hasher.finalize().to_hex().to_string())
        }
    }
}

/// Compute the checksum of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn checksum_bytes(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Sha1 => to_hex(&sha1::Sha1::digest(data)),
        ChecksumAlgorithm::Sha256 => to_hex(&sha2::Sha256::digest(data)),
        ChecksumAlgorithm::Sha512 => to_hex(&sha2::Sha512::digest(data)),
        ChecksumAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
    }
}

fn digest_reader<D: Digest>(reader: &mut impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    for_each_chunk(reader, |chunk| hasher.update(chunk))?;
    Ok(to_hex(&hasher.finalize()))
}

/// Lowercase hex encoding of a digest.
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn for_each_chunk(reader: &mut impl Read, mut f: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        f(&buffer[..bytes_read]);
    }

    Ok(())
}
