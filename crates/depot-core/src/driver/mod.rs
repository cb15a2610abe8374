//! Storage driver abstraction
//!
//! A [`Driver`] supplies the backend-specific primitives a [`Manager`]
//! delegates to: stat, list, transfer, copy, rename and remove, all keyed by
//! a [`VirtualPath`]. Drivers know nothing about artefact identity, caching
//! or sync; those live above this seam.
//!
//! [`Manager`]: crate::Manager

mod filesystem;
mod memory;

pub use filesystem::FilesystemDriver;
pub use memory::MemoryDriver;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depot_fs::checksum::{self, HashAlgorithm};
use depot_fs::VirtualPath;

use crate::Result;

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Backend metadata for one path.
#[derive(Debug, Clone)]
pub struct Stat {
    /// File or directory
    pub kind: EntryKind,

    /// Content size in bytes; zero for directories
    pub size: u64,

    /// Last content modification instant
    pub modified: DateTime<Utc>,

    /// Creation instant, when the backend records one
    pub created: Option<DateTime<Utc>>,

    /// Last access instant, when the backend records one
    pub accessed: Option<DateTime<Utc>>,

    /// Whether the path is a symbolic link on the backend
    pub is_link: bool,

    /// MIME type, for backends that store one
    pub content_type: Option<String>,

    /// Storage tier label, for backends that tier content
    pub storage_class: Option<String>,
}

impl Stat {
    /// A plain file stat with only the always-present fields set.
    pub fn file(size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            modified,
            created: None,
            accessed: None,
            is_link: false,
            content_type: None,
            storage_class: None,
        }
    }

    /// A plain directory stat.
    pub fn directory(modified: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            modified,
            created: None,
            accessed: None,
            is_link: false,
            content_type: None,
            storage_class: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// One directory listing entry: the child's path plus its stat.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: VirtualPath,
    pub stat: Stat,
}

/// Backend-specific storage primitives.
///
/// All paths are store-absolute [`VirtualPath`]s; the driver maps them onto
/// whatever its backend addresses (a native directory, an object key space,
/// a remote host). Implementations must distinguish "missing" from failure:
/// [`Driver::stat`] returns `Ok(None)` for an absent path and reserves errors
/// for transport problems.
///
/// A put must be all-or-nothing. A destination observed mid-transfer holds
/// either its previous content or the complete new content, never a prefix.
pub trait Driver {
    /// URL scheme identifying the backend kind (`file`, `memory`, ...).
    fn scheme(&self) -> &str;

    /// The backend root this driver is bound to, in display form.
    fn root(&self) -> &str;

    /// Whether artefacts are directly addressable on the local filesystem.
    fn is_local(&self) -> bool {
        false
    }

    /// The native location of `path`, for local backends only.
    fn local_path(&self, _path: &VirtualPath) -> Option<PathBuf> {
        None
    }

    /// Stat one path; `Ok(None)` when nothing exists there.
    fn stat(&self, path: &VirtualPath) -> Result<Option<Stat>>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &VirtualPath) -> Result<bool> {
        Ok(self.stat(path)?.is_some())
    }

    /// List the direct children of a directory, sorted by path.
    fn list(&self, path: &VirtualPath) -> Result<Vec<Entry>>;

    /// Materialize `path` (file or whole directory tree) at a native location.
    fn get(&self, path: &VirtualPath, dest: &Path) -> Result<()>;

    /// Fetch a file's full content.
    fn get_bytes(&self, path: &VirtualPath) -> Result<Vec<u8>>;

    /// Upload a native file or directory tree to `path`.
    fn put(&self, source: &Path, path: &VirtualPath) -> Result<()>;

    /// Write raw bytes as the file at `path`, creating parents as needed.
    fn put_bytes(&self, bytes: &[u8], path: &VirtualPath) -> Result<()>;

    /// Create a directory (and missing ancestors) at `path`.
    fn mkdir(&self, path: &VirtualPath) -> Result<()>;

    /// Duplicate an artefact within this backend.
    fn copy(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()>;

    /// Move an artefact within this backend.
    fn rename(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()>;

    /// Remove a file or directory tree.
    fn remove(&self, path: &VirtualPath) -> Result<()>;

    /// Digest a file's content.
    ///
    /// The default fetches the bytes and hashes locally; backends with a
    /// native checksum primitive should override this.
    fn digest(&self, path: &VirtualPath, algorithm: HashAlgorithm) -> Result<String> {
        Ok(checksum::digest_bytes(algorithm, &self.get_bytes(path)?))
    }
}
