//! Scoped local materialization with write-back
//!
//! [`Localised`] hands out a native path for an artefact, lets the caller
//! edit it with ordinary file APIs, and pushes the edits back to the store
//! when the scope closes. For locally addressable stores the native path
//! is the artefact itself and write-back is a no-op; everything else stages
//! through a private temp directory and reconciles against a snapshot taken
//! at open time, so only what actually changed travels back.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use depot_fs::{TreeManifest, VirtualPath, checksum, io as fsio};

use crate::artefact::Artefact;
use crate::manager::Manager;
use crate::{HashAlgorithm, Result};

/// Digest algorithm used for open-time snapshots and change detection.
pub const SNAPSHOT_ALGORITHM: HashAlgorithm = HashAlgorithm::Md5;

/// What the artefact looked like when the scope opened.
#[derive(Debug)]
enum Snapshot {
    /// In place on a local store; nothing to reconcile.
    Local,
    /// Nothing existed at the path; anything left behind is uploaded.
    Missing,
    /// A file, identified by its content digest.
    File(String),
    /// A directory, captured as a manifest for member-wise diffing.
    Tree(TreeManifest),
}

/// A live localisation scope.
///
/// Closing (or dropping) the scope reconciles the local copy against the
/// open-time snapshot: a vanished copy removes the artefact, a changed file
/// is pushed whole, and a changed tree pushes added and modified members
/// and removes deleted ones, member by member. Prefer [`Localised::close`]
/// over relying on drop: drop can only log a failed write-back.
#[derive(Debug)]
pub struct Localised {
    manager: Manager,
    path: VirtualPath,
    local: PathBuf,
    snapshot: Snapshot,
    // staging directory is kept alive for the lifetime of the scope
    _staging: Option<TempDir>,
    closed: bool,
}

impl Localised {
    pub(crate) fn open(manager: Manager, path: VirtualPath) -> Result<Self> {
        if let Some(native) = manager.native_path(path.clone())? {
            if let Some(parent) = native.parent() {
                fsio::ensure_dir(parent)?;
            }
            tracing::debug!("Localised {} in place at {}", path, native.display());
            return Ok(Self {
                manager,
                path,
                local: native,
                snapshot: Snapshot::Local,
                _staging: None,
                closed: false,
            });
        }

        let staging = tempfile::tempdir()?;
        let local = staging.path().join(path.name().unwrap_or("artefact"));
        let snapshot = match manager.identify(path.clone())? {
            None => Snapshot::Missing,
            Some(artefact) => {
                manager.get(&artefact, &local, true)?;
                match artefact {
                    Artefact::File(_) => {
                        Snapshot::File(checksum::digest_file(SNAPSHOT_ALGORITHM, &local)?)
                    }
                    Artefact::Directory(_) => {
                        Snapshot::Tree(TreeManifest::capture(&local, SNAPSHOT_ALGORITHM)?)
                    }
                }
            }
        };
        tracing::debug!("Localised {} into staging at {}", path, local.display());
        Ok(Self {
            manager,
            path,
            local,
            snapshot,
            _staging: Some(staging),
            closed: false,
        })
    }

    /// The native path to read and write through.
    pub fn path(&self) -> &Path {
        &self.local
    }

    /// The artefact path this scope localises.
    pub fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    /// Whether the scope addresses the artefact in place, with no staging
    /// copy and no write-back.
    pub fn is_in_place(&self) -> bool {
        matches!(self.snapshot, Snapshot::Local)
    }

    /// Reconcile edits back to the store and end the scope.
    pub fn close(mut self) -> Result<()> {
        let result = self.reconcile();
        self.closed = true;
        result
    }

    fn reconcile(&self) -> Result<()> {
        match &self.snapshot {
            Snapshot::Local => Ok(()),
            Snapshot::Missing => {
                if self.local.exists() {
                    self.manager.put(&self.local, self.path.clone(), true)?;
                }
                Ok(())
            }
            Snapshot::File(digest) => {
                if !self.local.exists() {
                    return self.manager.remove(self.path.clone(), true);
                }
                if self.local.is_dir() {
                    // the caller replaced the file with a directory
                    self.manager.put(&self.local, self.path.clone(), true)?;
                    return Ok(());
                }
                let current = checksum::digest_file(SNAPSHOT_ALGORITHM, &self.local)?;
                if current != *digest {
                    self.manager.put(&self.local, self.path.clone(), true)?;
                }
                Ok(())
            }
            Snapshot::Tree(manifest) => {
                if !self.local.exists() {
                    return self.manager.remove(self.path.clone(), true);
                }
                if self.local.is_file() {
                    self.manager.put(&self.local, self.path.clone(), true)?;
                    return Ok(());
                }
                let current = TreeManifest::capture(&self.local, SNAPSHOT_ALGORITHM)?;
                let diff = manifest.diff(&current);
                if diff.is_empty() {
                    return Ok(());
                }
                for rel in &diff.removed {
                    self.manager.remove(self.path.concat(rel), true)?;
                }
                for rel in diff.added.iter().chain(diff.changed.iter()) {
                    let native = rel.to_native_under(&self.local);
                    self.manager.put(&native, self.path.concat(rel), false)?;
                }
                for rel in &diff.added_dirs {
                    self.manager.mkdir(self.path.concat(rel))?;
                }
                tracing::debug!(
                    "Reconciled {}: {} added, {} changed, {} removed",
                    self.path,
                    diff.added.len(),
                    diff.changed.len(),
                    diff.removed.len()
                );
                Ok(())
            }
        }
    }
}

impl Drop for Localised {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(error) = self.reconcile() {
            tracing::warn!("Write-back for {} failed on drop: {}", self.path, error);
        }
    }
}
