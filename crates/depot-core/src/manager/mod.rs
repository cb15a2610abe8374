//! Managers and subtree views
//!
//! A [`Manager`] owns one driver and the authoritative path table for its
//! store, and exposes the uniform operation set: identify, list, get, put,
//! copy, rename, remove, digest, localise. Cloning is cheap; clones share
//! the driver and table. A clone scoped beneath a prefix (a submanager,
//! from [`Manager::submanager`]) addresses the same artefacts through
//! rewritten paths, so writes through either view are visible through both.

mod table;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use depot_fs::{HashAlgorithm, VirtualPath, io as fsio};

use crate::artefact::{Artefact, ArtefactId, Directory, File, Placeholder};
use crate::driver::{Driver, EntryKind, Stat};
use crate::localiser::Localised;
use crate::{Error, Result};
use table::PathTable;

/// How an operation addresses an artefact: by path, or by a held handle.
///
/// Handles carry their origin, so a manager can reject artefacts that
/// belong to a different store or fall outside its view.
pub enum Locator {
    Path(VirtualPath),
    Handle {
        manager: Manager,
        id: ArtefactId,
        hint: VirtualPath,
    },
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Self::Path(VirtualPath::new(s))
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Self::Path(VirtualPath::new(s))
    }
}

impl From<VirtualPath> for Locator {
    fn from(p: VirtualPath) -> Self {
        Self::Path(p)
    }
}

impl From<&VirtualPath> for Locator {
    fn from(p: &VirtualPath) -> Self {
        Self::Path(p.clone())
    }
}

impl From<&File> for Locator {
    fn from(file: &File) -> Self {
        Self::Handle {
            manager: file.manager().clone(),
            id: file.id(),
            hint: file.hint().clone(),
        }
    }
}

impl From<&Directory> for Locator {
    fn from(directory: &Directory) -> Self {
        Self::Handle {
            manager: directory.manager().clone(),
            id: directory.id(),
            hint: directory.hint().clone(),
        }
    }
}

impl From<&Artefact> for Locator {
    fn from(artefact: &Artefact) -> Self {
        Self::Handle {
            manager: artefact.manager().clone(),
            id: artefact.id(),
            hint: artefact.hint().clone(),
        }
    }
}

/// What a put uploads: raw bytes, a native path, or another artefact
/// (possibly from a different store, in which case it stages through a
/// private temp location first).
pub enum PutSource<'a> {
    Bytes(&'a [u8]),
    Native(&'a Path),
    Artefact(Artefact),
}

impl<'a> From<&'a [u8]> for PutSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for PutSource<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for PutSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Path> for PutSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Native(path)
    }
}

impl<'a> From<&'a PathBuf> for PutSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Self::Native(path)
    }
}

impl<'a> From<Artefact> for PutSource<'a> {
    fn from(artefact: Artefact) -> Self {
        Self::Artefact(artefact)
    }
}

impl<'a> From<&'a Artefact> for PutSource<'a> {
    fn from(artefact: &'a Artefact) -> Self {
        Self::Artefact(artefact.clone())
    }
}

impl<'a> From<&'a File> for PutSource<'a> {
    fn from(file: &'a File) -> Self {
        Self::Artefact(Artefact::File(file.clone()))
    }
}

impl<'a> From<&'a Directory> for PutSource<'a> {
    fn from(directory: &'a Directory) -> Self {
        Self::Artefact(Artefact::Directory(directory.clone()))
    }
}

struct Shared {
    driver: Box<dyn Driver>,
    table: RefCell<PathTable>,
    signature: String,
}

/// One store root (or sub-root) and its artefact cache.
#[derive(Clone)]
pub struct Manager {
    shared: Rc<Shared>,
    prefix: VirtualPath,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("signature", &self.shared.signature)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Manager {
    /// Wrap a driver in a manager rooted at the store root.
    pub fn new(driver: Box<dyn Driver>) -> Self {
        let signature = format!("{}://{}", driver.scheme(), driver.root());
        Self {
            shared: Rc::new(Shared {
                driver,
                table: RefCell::new(PathTable::new()),
                signature,
            }),
            prefix: VirtualPath::root(),
        }
    }

    /// Canonical identity of the underlying store.
    pub fn signature(&self) -> &str {
        &self.shared.signature
    }

    /// The backend scheme (`file`, `memory`, ...).
    pub fn scheme(&self) -> &str {
        self.shared.driver.scheme()
    }

    /// The subtree this view is scoped to; `/` for a whole-store manager.
    pub fn prefix(&self) -> &VirtualPath {
        &self.prefix
    }

    /// Whether artefacts are directly addressable on the local filesystem.
    pub fn is_local(&self) -> bool {
        self.shared.driver.is_local()
    }

    fn driver(&self) -> &dyn Driver {
        self.shared.driver.as_ref()
    }

    /// Store-absolute path for a view-relative one.
    fn full(&self, visible: &VirtualPath) -> VirtualPath {
        self.prefix.concat(visible)
    }

    /// View-relative form of a store-absolute path, for display.
    fn display_path(&self, full: &VirtualPath) -> VirtualPath {
        full.relative_to(&self.prefix).unwrap_or_else(|| full.clone())
    }

    fn view_name(&self) -> String {
        if self.prefix.is_root() {
            self.shared.signature.clone()
        } else {
            format!("{}{}", self.shared.signature, self.prefix)
        }
    }

    /// Resolve a locator to a store-absolute path within this view.
    fn resolve(&self, location: Locator) -> Result<VirtualPath> {
        match location {
            Locator::Path(p) => Ok(self.full(&p)),
            Locator::Handle { manager, id, hint } => {
                if !Rc::ptr_eq(&manager.shared, &self.shared) {
                    return Err(Error::not_a_member(hint, self.view_name()));
                }
                let full = {
                    let table = self.shared.table.borrow();
                    table
                        .get(id)
                        .map(|r| r.path.clone())
                        .ok_or_else(|| Error::no_longer_exists(hint.clone()))?
                };
                if full.relative_to(&self.prefix).is_none() {
                    return Err(Error::not_a_member(full, self.view_name()));
                }
                Ok(full)
            }
        }
    }

    /// Whether anything exists at the location.
    pub fn exists(&self, location: impl Into<Locator>) -> Result<bool> {
        let full = self.resolve(location.into())?;
        self.driver().exists(&full)
    }

    /// Stat a location, refreshing the table.
    ///
    /// Missing is not an error here: the result is `None` and any cached
    /// record for the path is evicted, so handles to the vanished artefact
    /// start failing immediately.
    pub fn identify(&self, location: impl Into<Locator>) -> Result<Option<Artefact>> {
        let full = self.resolve(location.into())?;
        self.identify_full(&full)
    }

    fn identify_full(&self, full: &VirtualPath) -> Result<Option<Artefact>> {
        match self.driver().stat(full)? {
            Some(stat) => {
                let id = self.shared.table.borrow_mut().upsert(full, stat);
                Ok(self.handle_at(id))
            }
            None => {
                self.shared.table.borrow_mut().evict(full);
                Ok(None)
            }
        }
    }

    /// Build a handle for a live record.
    pub(crate) fn handle_at(&self, id: ArtefactId) -> Option<Artefact> {
        let table = self.shared.table.borrow();
        let record = table.get(id)?;
        let hint = record
            .path
            .relative_to(&self.prefix)
            .unwrap_or_else(|| record.path.clone());
        Some(match record.kind {
            EntryKind::File => Artefact::File(File::new(self.clone(), id, hint)),
            EntryKind::Directory => Artefact::Directory(Directory::new(self.clone(), id, hint)),
        })
    }

    /// The artefact at a location, failing when nothing is there.
    pub fn artefact(&self, location: impl Into<Locator>) -> Result<Artefact> {
        let full = self.resolve(location.into())?;
        self.identify_full(&full)?
            .ok_or_else(|| Error::not_found(self.display_path(&full)))
    }

    /// The file at a location.
    pub fn file(&self, location: impl Into<Locator>) -> Result<File> {
        self.artefact(location)?.into_file()
    }

    /// The directory at a location.
    pub fn directory(&self, location: impl Into<Locator>) -> Result<Directory> {
        self.artefact(location)?.into_directory()
    }

    /// Materialize an artefact at a native destination.
    ///
    /// An existing destination directory is only replaced when `overwrite`
    /// is set; it is removed before the transfer.
    pub fn get(&self, location: impl Into<Locator>, dest: &Path, overwrite: bool) -> Result<()> {
        let full = self.resolve(location.into())?;
        if !self.driver().exists(&full)? {
            return Err(Error::not_found(self.display_path(&full)));
        }
        if dest.is_dir() {
            if !overwrite {
                return Err(Error::not_permitted(
                    self.display_path(&full),
                    format!(
                        "destination directory {} exists; pass overwrite to replace it",
                        dest.display()
                    ),
                ));
            }
            fsio::remove_tree(dest)?;
        }
        self.driver().get(&full, dest)
    }

    /// Fetch a file's full content.
    pub fn get_bytes(&self, location: impl Into<Locator>) -> Result<Vec<u8>> {
        let full = self.resolve(location.into())?;
        match self.driver().stat(&full)? {
            None => Err(Error::not_found(self.display_path(&full))),
            Some(stat) if stat.is_directory() => Err(Error::type_mismatch(
                self.display_path(&full),
                EntryKind::File,
                EntryKind::Directory,
            )),
            Some(_) => self.driver().get_bytes(&full),
        }
    }

    /// Upload bytes, a native path or an artefact to `dest`.
    ///
    /// Overwriting an existing file updates the artefact in place: held
    /// handles keep observing it and its record is refreshed eagerly. An
    /// existing directory is only replaced when `overwrite` is set, in
    /// which case it and every cached descendant are evicted first.
    pub fn put<'a>(
        &self,
        source: impl Into<PutSource<'a>>,
        dest: impl Into<VirtualPath>,
        overwrite: bool,
    ) -> Result<Placeholder> {
        let visible = dest.into();
        let full = self.full(&visible);
        let source = source.into();

        let source_is_directory = match &source {
            PutSource::Bytes(_) => false,
            PutSource::Native(path) => path.is_dir(),
            PutSource::Artefact(artefact) => {
                artefact.path()?;
                artefact.is_directory()
            }
        };

        self.prepare_dest(&visible, &full, source_is_directory, overwrite)?;

        match &source {
            PutSource::Bytes(bytes) => self.driver().put_bytes(bytes, &full)?,
            PutSource::Native(path) => self.driver().put(path, &full)?,
            PutSource::Artefact(artefact) => self.put_artefact(artefact, &full)?,
        }

        match self.record_write(&full)? {
            Some((id, kind)) => Ok(Placeholder::resolved(self.clone(), visible, id, kind)),
            None => Ok(Placeholder::pending(self.clone(), visible)),
        }
    }

    fn put_artefact(&self, artefact: &Artefact, full: &VirtualPath) -> Result<()> {
        let source_manager = artefact.manager();
        let source_path = artefact.path()?;
        if let Some(native) = source_manager.native_path(source_path.clone())? {
            return self.driver().put(&native, full);
        }
        let staging = tempfile::tempdir()?;
        let local = staging
            .path()
            .join(source_path.name().unwrap_or("artefact"));
        source_manager.get(source_path, &local, true)?;
        self.driver().put(&local, full)
    }

    /// Refresh the record chain for a completed write at `full`.
    ///
    /// The destination is re-statted and upserted (a same-kind overwrite
    /// keeps its id, so held handles observe the new content immediately),
    /// and unrecorded ancestor directories below the nearest recorded one
    /// are backfilled, so already-collected listings include the new path.
    fn record_write(&self, full: &VirtualPath) -> Result<Option<(ArtefactId, EntryKind)>> {
        let mut missing: Vec<VirtualPath> = Vec::new();
        {
            let table = self.shared.table.borrow();
            let mut current = full.parent();
            while let Some(dir) = current {
                if dir.is_root() || table.id_at(&dir).is_some() {
                    break;
                }
                current = dir.parent();
                missing.push(dir);
            }
        }
        for dir in missing.into_iter().rev() {
            if let Some(stat) = self.driver().stat(&dir)? {
                self.shared.table.borrow_mut().upsert(&dir, stat);
            }
        }

        match self.driver().stat(full)? {
            Some(stat) => {
                let kind = stat.kind;
                let id = self.shared.table.borrow_mut().upsert(full, stat);
                Ok(Some((id, kind)))
            }
            None => Ok(None),
        }
    }

    /// Clear the destination when the incoming artefact replaces it.
    fn prepare_dest(
        &self,
        visible: &VirtualPath,
        full: &VirtualPath,
        source_is_directory: bool,
        overwrite: bool,
    ) -> Result<()> {
        match self.driver().stat(full)? {
            Some(stat) if stat.is_directory() => {
                if !overwrite {
                    return Err(Error::not_permitted(
                        visible.clone(),
                        "destination is a directory; pass overwrite to replace it",
                    ));
                }
                self.driver().remove(full)?;
                self.shared.table.borrow_mut().evict(full);
            }
            Some(stat) if stat.is_file() && source_is_directory => {
                self.driver().remove(full)?;
                self.shared.table.borrow_mut().evict(full);
            }
            _ => {}
        }
        Ok(())
    }

    /// Duplicate an artefact at a new path.
    ///
    /// A source within the same store uses the backend's native copy; a
    /// foreign artefact degrades to a put.
    pub fn copy(
        &self,
        source: impl Into<Locator>,
        dest: impl Into<VirtualPath>,
        overwrite: bool,
    ) -> Result<Placeholder> {
        let source = source.into();
        let visible = dest.into();
        let full_dest = self.full(&visible);

        if let Locator::Handle { manager, id, hint } = &source {
            if !Rc::ptr_eq(&manager.shared, &self.shared) {
                let artefact = manager
                    .handle_at(*id)
                    .ok_or_else(|| Error::no_longer_exists(hint.clone()))?;
                return self.put(&artefact, visible, overwrite);
            }
        }

        let full_source = self.resolve(source)?;
        if full_source.is_root() {
            return Err(Error::not_permitted(
                self.display_path(&full_source),
                "cannot copy the store root",
            ));
        }
        let source_stat = self
            .driver()
            .stat(&full_source)?
            .ok_or_else(|| Error::not_found(self.display_path(&full_source)))?;
        self.prepare_dest(&visible, &full_dest, source_stat.is_directory(), overwrite)?;
        self.driver().copy(&full_source, &full_dest)?;
        match self.record_write(&full_dest)? {
            Some((id, kind)) => Ok(Placeholder::resolved(self.clone(), visible, id, kind)),
            None => Ok(Placeholder::pending(self.clone(), visible)),
        }
    }

    /// Move an artefact to a new path within this store.
    ///
    /// The artefact keeps its identity: held handles follow the move. A
    /// foreign source degrades to put-then-remove.
    pub fn rename(
        &self,
        source: impl Into<Locator>,
        dest: impl Into<VirtualPath>,
        overwrite: bool,
    ) -> Result<Placeholder> {
        let source = source.into();
        let visible = dest.into();
        let full_dest = self.full(&visible);

        if let Locator::Handle { manager, id, hint } = &source {
            if !Rc::ptr_eq(&manager.shared, &self.shared) {
                let artefact = manager
                    .handle_at(*id)
                    .ok_or_else(|| Error::no_longer_exists(hint.clone()))?;
                let placeholder = self.put(&artefact, visible, overwrite)?;
                let source_path = artefact.path()?;
                manager.remove(source_path, true)?;
                return Ok(placeholder);
            }
        }

        let full_source = self.resolve(source)?;
        if full_source.is_root() {
            return Err(Error::not_permitted(
                self.display_path(&full_source),
                "cannot move the store root",
            ));
        }
        let source_stat = self
            .driver()
            .stat(&full_source)?
            .ok_or_else(|| Error::not_found(self.display_path(&full_source)))?;
        self.prepare_dest(&visible, &full_dest, source_stat.is_directory(), overwrite)?;
        self.driver().rename(&full_source, &full_dest)?;

        {
            let mut table = self.shared.table.borrow_mut();
            // a replaced destination loses its identity before the source
            // subtree is re-keyed onto it
            table.evict(&full_dest);
            table.rekey(&full_source, &full_dest);
        }
        match self.record_write(&full_dest)? {
            Some((id, kind)) => Ok(Placeholder::resolved(self.clone(), visible, id, kind)),
            None => Ok(Placeholder::pending(self.clone(), visible)),
        }
    }

    /// Remove an artefact.
    ///
    /// A non-empty directory is refused unless `recursive` is set. The
    /// record and, for directories, every cached descendant are evicted,
    /// so held handles fail from here on.
    pub fn remove(&self, location: impl Into<Locator>, recursive: bool) -> Result<()> {
        let full = self.resolve(location.into())?;
        if full.is_root() {
            return Err(Error::not_permitted(
                self.display_path(&full),
                "cannot remove the store root",
            ));
        }
        let stat = self
            .driver()
            .stat(&full)?
            .ok_or_else(|| Error::not_found(self.display_path(&full)))?;
        if stat.is_directory() && !recursive && !self.driver().list(&full)?.is_empty() {
            return Err(Error::not_permitted(
                self.display_path(&full),
                "directory is not empty; pass recursive to remove it",
            ));
        }
        self.driver().remove(&full)?;
        self.shared.table.borrow_mut().evict(&full);
        Ok(())
    }

    /// List a directory's children.
    ///
    /// The backend listing for each directory is fetched once and cached in
    /// the table; later calls serve from the cache until
    /// [`refresh`](Manager::refresh). Recursive listing collects
    /// subdirectories on the way down and returns all descendants in tree
    /// order.
    pub fn list(&self, location: impl Into<Locator>, recursive: bool) -> Result<Vec<Artefact>> {
        let full = self.resolve(location.into())?;
        let dir_id = match self.identify_full(&full)? {
            Some(Artefact::Directory(d)) => d.id(),
            Some(Artefact::File(_)) => {
                return Err(Error::type_mismatch(
                    self.display_path(&full),
                    EntryKind::Directory,
                    EntryKind::File,
                ));
            }
            None => return Err(Error::not_found(self.display_path(&full))),
        };

        self.collect(&full, dir_id)?;
        if recursive {
            self.collect_tree(&full)?;
        }

        let ids = {
            let table = self.shared.table.borrow();
            if recursive {
                table.descendants(&full)
            } else {
                table.children(&full)
            }
        };
        Ok(ids.into_iter().filter_map(|id| self.handle_at(id)).collect())
    }

    /// Fetch and cache one directory's listing, reconciling the table:
    /// cached children no longer present on the backend are evicted.
    fn collect(&self, full: &VirtualPath, id: ArtefactId) -> Result<()> {
        let done = self
            .shared
            .table
            .borrow()
            .get(id)
            .map(|r| r.collected)
            .unwrap_or(false);
        if done {
            return Ok(());
        }

        let entries = self.driver().list(full)?;
        let mut table = self.shared.table.borrow_mut();
        let seen: BTreeSet<&VirtualPath> = entries.iter().map(|e| &e.path).collect();
        let stale: Vec<VirtualPath> = table
            .children(full)
            .into_iter()
            .filter_map(|cid| table.get(cid).map(|r| r.path.clone()))
            .filter(|p| !seen.contains(p))
            .collect();
        for path in stale {
            table.evict(&path);
        }
        for entry in entries {
            table.upsert(&entry.path, entry.stat);
        }
        if let Some(record) = table.get_mut(id) {
            record.collected = true;
        }
        Ok(())
    }

    fn collect_tree(&self, full: &VirtualPath) -> Result<()> {
        let subdirectories: Vec<(VirtualPath, ArtefactId)> = {
            let table = self.shared.table.borrow();
            table
                .children(full)
                .into_iter()
                .filter_map(|id| {
                    table
                        .get(id)
                        .filter(|r| r.kind == EntryKind::Directory)
                        .map(|r| (r.path.clone(), id))
                })
                .collect()
        };
        for (path, id) in subdirectories {
            self.collect(&path, id)?;
            self.collect_tree(&path)?;
        }
        Ok(())
    }

    /// Drop the cached listings for a directory and everything beneath it,
    /// so the next list fetches fresh backend state.
    pub fn refresh(&self, location: impl Into<Locator>) -> Result<()> {
        let full = self.resolve(location.into())?;
        self.shared.table.borrow_mut().clear_collected(&full);
        Ok(())
    }

    /// Digest a file's content, served from the record's cache when one was
    /// already computed for the algorithm.
    pub fn digest(&self, location: impl Into<Locator>, algorithm: HashAlgorithm) -> Result<String> {
        self.file(location)?.digest(algorithm)
    }

    /// Create a directory, including missing ancestors.
    pub fn mkdir(&self, path: impl Into<VirtualPath>) -> Result<Directory> {
        let visible = path.into();
        let full = self.full(&visible);
        match self.driver().stat(&full)? {
            Some(stat) if stat.is_file() => {
                return Err(Error::type_mismatch(
                    visible,
                    EntryKind::Directory,
                    EntryKind::File,
                ));
            }
            Some(_) => {}
            None => self.driver().mkdir(&full)?,
        }
        match self.record_write(&full)? {
            Some((id, EntryKind::Directory)) => Ok(Directory::new(self.clone(), id, visible)),
            _ => Err(Error::not_found(visible)),
        }
    }

    /// Ensure a file exists at `path`, creating it empty when missing.
    pub fn touch(&self, path: impl Into<VirtualPath>) -> Result<File> {
        let visible = path.into();
        let full = self.full(&visible);
        match self.driver().stat(&full)? {
            Some(stat) if stat.is_directory() => Err(Error::type_mismatch(
                visible,
                EntryKind::File,
                EntryKind::Directory,
            )),
            Some(_) => self.file(visible),
            None => {
                self.driver().put_bytes(&[], &full)?;
                match self.record_write(&full)? {
                    Some((id, EntryKind::File)) => Ok(File::new(self.clone(), id, visible)),
                    _ => Err(Error::not_found(visible)),
                }
            }
        }
    }

    /// A view of this store scoped beneath `path`.
    ///
    /// The view shares this manager's driver and table; `path` must name an
    /// existing directory.
    pub fn submanager(&self, path: impl Into<Locator>) -> Result<Manager> {
        let full = self.resolve(path.into())?;
        match self.identify_full(&full)? {
            Some(Artefact::Directory(_)) => Ok(Manager {
                shared: Rc::clone(&self.shared),
                prefix: full,
            }),
            Some(Artefact::File(_)) => Err(Error::type_mismatch(
                self.display_path(&full),
                EntryKind::Directory,
                EntryKind::File,
            )),
            None => Err(Error::not_found(self.display_path(&full))),
        }
    }

    /// The native location of an artefact, for locally addressable stores.
    pub fn native_path(&self, location: impl Into<Locator>) -> Result<Option<PathBuf>> {
        let full = self.resolve(location.into())?;
        if !self.driver().is_local() {
            return Ok(None);
        }
        Ok(self.driver().local_path(&full))
    }

    /// Materialize an artefact at a local path for the duration of a scope.
    ///
    /// See [`Localised`] for the write-back contract.
    pub fn localise(&self, location: impl Into<Locator>) -> Result<Localised> {
        let full = self.resolve(location.into())?;
        let visible = self.display_path(&full);
        Localised::open(self.clone(), visible)
    }

    /// Run `work` against a localised copy, then reconcile edits back.
    ///
    /// Reconciliation runs even when `work` fails: whatever the closure
    /// wrote before failing is pushed, and the closure's own error is
    /// returned.
    pub fn with_localised<T>(
        &self,
        location: impl Into<Locator>,
        work: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<T> {
        let session = self.localise(location)?;
        match work(session.path()) {
            Ok(value) => {
                session.close()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(close_error) = session.close() {
                    tracing::warn!(
                        "Write-back after a failed localised scope also failed: {}",
                        close_error
                    );
                }
                Err(error)
            }
        }
    }

    pub(crate) fn contains_id(&self, id: ArtefactId) -> bool {
        self.shared.table.borrow().contains(id)
    }

    /// Whether two managers are views over the same store.
    pub(crate) fn shares_state_with(&self, other: &Manager) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn path_of(&self, id: ArtefactId, hint: &VirtualPath) -> Result<VirtualPath> {
        let full = {
            let table = self.shared.table.borrow();
            table
                .get(id)
                .map(|r| r.path.clone())
                .ok_or_else(|| Error::no_longer_exists(hint.clone()))?
        };
        full.relative_to(&self.prefix)
            .ok_or_else(|| Error::not_a_member(full, self.view_name()))
    }

    pub(crate) fn stat_of(&self, id: ArtefactId, hint: &VirtualPath) -> Result<Stat> {
        self.shared
            .table
            .borrow()
            .get(id)
            .map(|r| r.stat.clone())
            .ok_or_else(|| Error::no_longer_exists(hint.clone()))
    }

    pub(crate) fn collected_of(&self, id: ArtefactId, hint: &VirtualPath) -> Result<bool> {
        self.shared
            .table
            .borrow()
            .get(id)
            .map(|r| r.collected)
            .ok_or_else(|| Error::no_longer_exists(hint.clone()))
    }

    pub(crate) fn read_of(&self, id: ArtefactId, hint: &VirtualPath) -> Result<Vec<u8>> {
        let full = {
            let table = self.shared.table.borrow();
            table
                .get(id)
                .map(|r| r.path.clone())
                .ok_or_else(|| Error::no_longer_exists(hint.clone()))?
        };
        self.driver().get_bytes(&full)
    }

    pub(crate) fn digest_of(
        &self,
        id: ArtefactId,
        hint: &VirtualPath,
        algorithm: HashAlgorithm,
    ) -> Result<String> {
        let (full, cached) = {
            let table = self.shared.table.borrow();
            let record = table
                .get(id)
                .ok_or_else(|| Error::no_longer_exists(hint.clone()))?;
            (record.path.clone(), record.digests.get(&algorithm).cloned())
        };
        if let Some(hex) = cached {
            return Ok(hex);
        }
        let hex = self.driver().digest(&full, algorithm)?;
        if let Some(record) = self.shared.table.borrow_mut().get_mut(id) {
            record.digests.insert(algorithm, hex.clone());
        }
        Ok(hex)
    }
}
