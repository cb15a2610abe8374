//! Content digest utilities
//!
//! Digests identify artefact content across backends: the localiser compares
//! them to bound write-back to the actual delta, and managers cache them per
//! file. All digests are lowercase hex without a prefix; the algorithm is
//! carried separately as a [`HashAlgorithm`].

use std::fs::File;
use std::io::Read;
use std::ops::Add;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::digest::generic_array::ArrayLength;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Read buffer for streaming file digests.
const BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
///
/// `Md5` is the default because tree snapshots use it; the stronger
/// algorithms are available wherever a backend or caller asks for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha1,
    Sha256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        };
        write!(f, "{}", name)
    }
}

/// Compute the digest of an in-memory byte slice.
pub fn digest_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Md5 => hex_of::<Md5>(bytes),
        HashAlgorithm::Sha1 => hex_of::<Sha1>(bytes),
        HashAlgorithm::Sha256 => hex_of::<Sha256>(bytes),
    }
}

/// Compute the digest of a file's contents, streaming in 64 KiB chunks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(algorithm: HashAlgorithm, path: &Path) -> Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => file_hex::<Md5>(path),
        HashAlgorithm::Sha1 => file_hex::<Sha1>(path),
        HashAlgorithm::Sha256 => file_hex::<Sha256>(path),
    }
}

fn hex_of<D: Digest>(bytes: &[u8]) -> String
where
    D::OutputSize: Add,
    <D::OutputSize as Add>::Output: ArrayLength<u8>,
{
    let mut hasher = D::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn file_hex<D: Digest>(path: &Path) -> Result<String>
where
    D::OutputSize: Add,
    <D::OutputSize as Add>::Output: ArrayLength<u8>,
{
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| Error::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
