//! Artefact handles
//!
//! A [`File`] or [`Directory`] names an entry in its manager's path table
//! and owns no storage of its own: accessors read the cached record, and
//! mutations go through the [`Manager`]. Because the table is the sole
//! owner, a removed artefact invalidates every held handle at once; any
//! later access fails with `NoLongerExists` instead of serving stale data.
//!
//! [`Placeholder`] is the deferred form returned by write operations. It
//! resolves to the concrete handle on first use by re-querying the manager.
//!
//! [`Manager`]: crate::Manager

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use depot_fs::{HashAlgorithm, VirtualPath};

use crate::driver::{EntryKind, Stat};
use crate::manager::Manager;
use crate::{Error, Result};

/// Stable identity of one artefact within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtefactId(pub(crate) u64);

/// Handle to a file artefact.
#[derive(Debug, Clone)]
pub struct File {
    manager: Manager,
    id: ArtefactId,
    hint: VirtualPath,
}

impl File {
    pub(crate) fn new(manager: Manager, id: ArtefactId, hint: VirtualPath) -> Self {
        Self { manager, id, hint }
    }

    pub(crate) fn id(&self) -> ArtefactId {
        self.id
    }

    pub(crate) fn hint(&self) -> &VirtualPath {
        &self.hint
    }

    /// The manager this file belongs to.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Whether the artefact is still present in its store's table.
    pub fn exists(&self) -> bool {
        self.manager.contains_id(self.id)
    }

    /// Current path, relative to the manager this handle came from.
    ///
    /// Follows renames: a handle taken before a move reports the new
    /// location afterwards.
    pub fn path(&self) -> Result<VirtualPath> {
        self.manager.path_of(self.id, &self.hint)
    }

    /// The file name.
    pub fn name(&self) -> Result<String> {
        let path = self.path()?;
        Ok(path.name().unwrap_or_default().to_string())
    }

    /// Cached backend metadata.
    pub fn stat(&self) -> Result<Stat> {
        self.manager.stat_of(self.id, &self.hint)
    }

    /// Content size in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.stat()?.size)
    }

    pub fn modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.stat()?.modified)
    }

    /// Creation instant; falls back to the modification instant on backends
    /// that do not record one.
    pub fn created(&self) -> Result<DateTime<Utc>> {
        let stat = self.stat()?;
        Ok(stat.created.unwrap_or(stat.modified))
    }

    /// Last access instant; falls back to the modification instant.
    pub fn accessed(&self) -> Result<DateTime<Utc>> {
        let stat = self.stat()?;
        Ok(stat.accessed.unwrap_or(stat.modified))
    }

    pub fn is_link(&self) -> Result<bool> {
        Ok(self.stat()?.is_link)
    }

    pub fn content_type(&self) -> Result<Option<String>> {
        Ok(self.stat()?.content_type)
    }

    pub fn storage_class(&self) -> Result<Option<String>> {
        Ok(self.stat()?.storage_class)
    }

    /// Content digest, computed once per algorithm and then served from the
    /// record's cache until the artefact is evicted.
    pub fn digest(&self, algorithm: HashAlgorithm) -> Result<String> {
        self.manager.digest_of(self.id, &self.hint, algorithm)
    }

    /// Fetch the file's full content.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.manager.read_of(self.id, &self.hint)
    }
}

/// Handles compare by artefact identity: same store, same id. The view
/// prefix they were obtained through does not matter.
impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.manager.shares_state_with(&other.manager)
    }
}

impl Eq for File {}

/// Handle to a directory artefact.
///
/// Children are not owned by the directory; `list` queries the manager's
/// table, fetching the backend listing on first use.
#[derive(Debug, Clone)]
pub struct Directory {
    manager: Manager,
    id: ArtefactId,
    hint: VirtualPath,
}

impl Directory {
    pub(crate) fn new(manager: Manager, id: ArtefactId, hint: VirtualPath) -> Self {
        Self { manager, id, hint }
    }

    pub(crate) fn id(&self) -> ArtefactId {
        self.id
    }

    pub(crate) fn hint(&self) -> &VirtualPath {
        &self.hint
    }

    /// The manager this directory belongs to.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Whether the artefact is still present in its store's table.
    pub fn exists(&self) -> bool {
        self.manager.contains_id(self.id)
    }

    /// Current path, relative to the manager this handle came from.
    pub fn path(&self) -> Result<VirtualPath> {
        self.manager.path_of(self.id, &self.hint)
    }

    /// The directory name; empty for a store root.
    pub fn name(&self) -> Result<String> {
        let path = self.path()?;
        Ok(path.name().unwrap_or_default().to_string())
    }

    pub fn stat(&self) -> Result<Stat> {
        self.manager.stat_of(self.id, &self.hint)
    }

    pub fn modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.stat()?.modified)
    }

    pub fn created(&self) -> Result<DateTime<Utc>> {
        let stat = self.stat()?;
        Ok(stat.created.unwrap_or(stat.modified))
    }

    pub fn accessed(&self) -> Result<DateTime<Utc>> {
        let stat = self.stat()?;
        Ok(stat.accessed.unwrap_or(stat.modified))
    }

    /// Whether the backend listing for this directory has been fetched.
    pub fn collected(&self) -> Result<bool> {
        self.manager.collected_of(self.id, &self.hint)
    }

    /// The directory's children, through the manager's cache.
    pub fn list(&self, recursive: bool) -> Result<Vec<Artefact>> {
        self.manager.list(self, recursive)
    }

    /// Whether the directory has no children, fetching the listing when it
    /// has not been collected yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.list(false)?.is_empty())
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.manager.shares_state_with(&other.manager)
    }
}

impl Eq for Directory {}

/// A file or directory handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artefact {
    File(File),
    Directory(Directory),
}

impl Artefact {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::File(_) => EntryKind::File,
            Self::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn manager(&self) -> &Manager {
        match self {
            Self::File(f) => f.manager(),
            Self::Directory(d) => d.manager(),
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            Self::File(f) => f.exists(),
            Self::Directory(d) => d.exists(),
        }
    }

    pub fn path(&self) -> Result<VirtualPath> {
        match self {
            Self::File(f) => f.path(),
            Self::Directory(d) => d.path(),
        }
    }

    pub fn name(&self) -> Result<String> {
        match self {
            Self::File(f) => f.name(),
            Self::Directory(d) => d.name(),
        }
    }

    pub fn stat(&self) -> Result<Stat> {
        match self {
            Self::File(f) => f.stat(),
            Self::Directory(d) => d.stat(),
        }
    }

    pub fn modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.stat()?.modified)
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    /// Unwrap as a file, or fail with a type mismatch.
    pub fn into_file(self) -> Result<File> {
        match self {
            Self::File(f) => Ok(f),
            Self::Directory(d) => Err(Error::type_mismatch(
                d.hint.clone(),
                EntryKind::File,
                EntryKind::Directory,
            )),
        }
    }

    /// Unwrap as a directory, or fail with a type mismatch.
    pub fn into_directory(self) -> Result<Directory> {
        match self {
            Self::Directory(d) => Ok(d),
            Self::File(f) => Err(Error::type_mismatch(
                f.hint.clone(),
                EntryKind::Directory,
                EntryKind::File,
            )),
        }
    }

    pub(crate) fn id(&self) -> ArtefactId {
        match self {
            Self::File(f) => f.id(),
            Self::Directory(d) => d.id(),
        }
    }

    pub(crate) fn hint(&self) -> &VirtualPath {
        match self {
            Self::File(f) => f.hint(),
            Self::Directory(d) => d.hint(),
        }
    }
}

impl From<File> for Artefact {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

impl From<Directory> for Artefact {
    fn from(directory: Directory) -> Self {
        Self::Directory(directory)
    }
}

#[derive(Debug, Clone, Copy)]
enum PlaceholderState {
    Pending,
    File(ArtefactId),
    Directory(ArtefactId),
}

/// Deferred result of a write operation.
///
/// `put`, `copy` and `rename` usually hand back an already resolved
/// placeholder; it stays pending when the backend could not confirm the
/// destination after the write. Either way, `resolve` re-queries the
/// manager when its cached id is gone and fails with `NoLongerExists`
/// when the destination has meanwhile been removed.
#[derive(Debug)]
pub struct Placeholder {
    manager: Manager,
    path: VirtualPath,
    state: RefCell<PlaceholderState>,
}

impl Placeholder {
    pub(crate) fn pending(manager: Manager, path: VirtualPath) -> Self {
        Self {
            manager,
            path,
            state: RefCell::new(PlaceholderState::Pending),
        }
    }

    pub(crate) fn resolved(
        manager: Manager,
        path: VirtualPath,
        id: ArtefactId,
        kind: EntryKind,
    ) -> Self {
        let state = match kind {
            EntryKind::File => PlaceholderState::File(id),
            EntryKind::Directory => PlaceholderState::Directory(id),
        };
        Self {
            manager,
            path,
            state: RefCell::new(state),
        }
    }

    /// The destination path this placeholder stands for, relative to the
    /// manager that produced it.
    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Resolve to the concrete artefact, querying the manager when needed.
    pub fn resolve(&self) -> Result<Artefact> {
        let state = *self.state.borrow();
        match state {
            PlaceholderState::File(id) | PlaceholderState::Directory(id) => {
                if let Some(artefact) = self.manager.handle_at(id) {
                    return Ok(artefact);
                }
            }
            PlaceholderState::Pending => {}
        }

        let artefact = self
            .manager
            .identify(self.path.clone())?
            .ok_or_else(|| Error::no_longer_exists(self.path.clone()))?;
        *self.state.borrow_mut() = match &artefact {
            Artefact::File(f) => PlaceholderState::File(f.id()),
            Artefact::Directory(d) => PlaceholderState::Directory(d.id()),
        };
        Ok(artefact)
    }

    /// Resolve and unwrap as a file.
    pub fn file(&self) -> Result<File> {
        self.resolve()?.into_file()
    }

    /// Resolve and unwrap as a directory.
    pub fn directory(&self) -> Result<Directory> {
        self.resolve()?.into_directory()
    }
}
