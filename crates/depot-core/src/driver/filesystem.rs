//! Local filesystem driver
//!
//! Maps virtual paths onto a native root directory. All writes go through
//! the atomic primitives in `depot_fs::io`, so interrupted transfers never
//! leave partial files visible under the root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depot_fs::checksum::{self, HashAlgorithm};
use depot_fs::{VirtualPath, io as fsio};

use super::{Driver, Entry, EntryKind, Stat};
use crate::{Error, Result};

/// Driver for a directory tree on the local filesystem.
#[derive(Debug)]
pub struct FilesystemDriver {
    root: PathBuf,
    display_root: String,
}

impl FilesystemDriver {
    /// Bind a driver to `root`, creating the directory if it is missing.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let raw = root.as_ref();
        fsio::ensure_dir(raw)?;
        let root = dunce::canonicalize(raw)
            .map_err(|e| Error::transport("file", VirtualPath::root(), e))?;
        let display_root = root.to_string_lossy().replace('\\', "/");
        Ok(Self { root, display_root })
    }

    fn native(&self, path: &VirtualPath) -> PathBuf {
        path.to_native_under(&self.root)
    }

    fn stat_native(&self, native: &Path, path: &VirtualPath) -> Result<Option<Stat>> {
        let metadata = match fs::metadata(native) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::transport("file", path.clone(), e)),
        };
        let is_link = fs::symlink_metadata(native)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| Error::transport("file", path.clone(), e))?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Some(Stat {
            kind,
            size: if kind == EntryKind::File {
                metadata.len()
            } else {
                0
            },
            modified,
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            accessed: metadata.accessed().ok().map(DateTime::<Utc>::from),
            is_link,
            content_type: None,
            storage_class: None,
        }))
    }
}

impl Driver for FilesystemDriver {
    fn scheme(&self) -> &str {
        "file"
    }

    fn root(&self) -> &str {
        &self.display_root
    }

    fn is_local(&self) -> bool {
        true
    }

    fn local_path(&self, path: &VirtualPath) -> Option<PathBuf> {
        Some(self.native(path))
    }

    fn stat(&self, path: &VirtualPath) -> Result<Option<Stat>> {
        self.stat_native(&self.native(path), path)
    }

    fn list(&self, path: &VirtualPath) -> Result<Vec<Entry>> {
        let native = self.native(path);
        match self.stat_native(&native, path)? {
            None => return Err(Error::not_found(path)),
            Some(stat) if stat.is_file() => {
                return Err(Error::type_mismatch(
                    path,
                    EntryKind::Directory,
                    EntryKind::File,
                ));
            }
            Some(_) => {}
        }

        let mut entries = Vec::new();
        for child in fsio::sorted_entries(&native)? {
            let Some(name) = child.file_name() else {
                continue;
            };
            let child_path = path.join(name.to_string_lossy());
            // Entries that vanish mid-listing (or dangle) drop out.
            if let Some(stat) = self.stat_native(&child, &child_path)? {
                entries.push(Entry {
                    path: child_path,
                    stat,
                });
            }
        }
        Ok(entries)
    }

    fn get(&self, path: &VirtualPath, dest: &Path) -> Result<()> {
        let native = self.native(path);
        match self.stat_native(&native, path)? {
            None => Err(Error::not_found(path)),
            Some(stat) if stat.is_directory() => copy_tree(&native, dest),
            Some(_) => Ok(fsio::copy_file_atomic(&native, dest)?),
        }
    }

    fn get_bytes(&self, path: &VirtualPath) -> Result<Vec<u8>> {
        match fs::read(self.native(path)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(path)),
            Err(e) => Err(Error::transport("file", path.clone(), e)),
        }
    }

    fn put(&self, source: &Path, path: &VirtualPath) -> Result<()> {
        let metadata =
            fs::metadata(source).map_err(|e| Error::transport("file", path.clone(), e))?;
        let native = self.native(path);
        if metadata.is_dir() {
            copy_tree(source, &native)
        } else {
            Ok(fsio::copy_file_atomic(source, &native)?)
        }
    }

    fn put_bytes(&self, bytes: &[u8], path: &VirtualPath) -> Result<()> {
        Ok(fsio::write_atomic(&self.native(path), bytes)?)
    }

    fn mkdir(&self, path: &VirtualPath) -> Result<()> {
        Ok(fsio::ensure_dir(&self.native(path))?)
    }

    fn copy(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()> {
        let native_source = self.native(source);
        match self.stat_native(&native_source, source)? {
            None => Err(Error::not_found(source)),
            Some(stat) if stat.is_directory() => copy_tree(&native_source, &self.native(dest)),
            Some(_) => Ok(fsio::copy_file_atomic(&native_source, &self.native(dest))?),
        }
    }

    fn rename(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()> {
        let native_source = self.native(source);
        if self.stat_native(&native_source, source)?.is_none() {
            return Err(Error::not_found(source));
        }
        let native_dest = self.native(dest);
        if let Some(parent) = native_dest.parent() {
            fsio::ensure_dir(parent)?;
        }
        fs::rename(&native_source, &native_dest)
            .map_err(|e| Error::transport("file", source.clone(), e))
    }

    fn remove(&self, path: &VirtualPath) -> Result<()> {
        let native = self.native(path);
        if self.stat_native(&native, path)?.is_none() {
            return Err(Error::not_found(path));
        }
        Ok(fsio::remove_tree(&native)?)
    }

    fn digest(&self, path: &VirtualPath, algorithm: HashAlgorithm) -> Result<String> {
        let native = self.native(path);
        match self.stat_native(&native, path)? {
            None => Err(Error::not_found(path)),
            Some(stat) if stat.is_directory() => Err(Error::type_mismatch(
                path,
                EntryKind::File,
                EntryKind::Directory,
            )),
            Some(_) => Ok(checksum::digest_file(algorithm, &native)?),
        }
    }
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fsio::ensure_dir(dest)?;
    for entry in fsio::sorted_entries(source)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = dest.join(name);
        let metadata = fs::metadata(&entry).map_err(|e| depot_fs::Error::io(&entry, e))?;
        if metadata.is_dir() {
            copy_tree(&entry, &target)?;
        } else {
            fsio::copy_file_atomic(&entry, &target)?;
        }
    }
    Ok(())
}
