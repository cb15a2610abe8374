//! Digest manifests of local directory trees
//!
//! A [`TreeManifest`] captures the shape and content of a directory at a
//! point in time: every file keyed by its tree-relative path with a content
//! digest, plus the set of directories. Two manifests diff into the minimal
//! set of per-path operations needed to reconcile the older tree with the
//! newer one.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::checksum::{self, HashAlgorithm};
use crate::path::VirtualPath;
use crate::{Error, Result, io};

/// Snapshot of a directory tree: file digests and directory set.
///
/// Keys are rooted paths relative to the captured root (`/sub/file.txt`).
/// The root itself is not listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeManifest {
    algorithm: HashAlgorithm,
    files: BTreeMap<VirtualPath, String>,
    directories: BTreeSet<VirtualPath>,
}

/// The difference between two manifests, as per-path operations.
///
/// `removed` is ancestor-filtered: when a directory disappears, its
/// descendants are subsumed and do not appear separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Files present only in the newer tree.
    pub added: Vec<VirtualPath>,
    /// Files present in both trees whose digest changed.
    pub changed: Vec<VirtualPath>,
    /// Files and directories present only in the older tree.
    pub removed: Vec<VirtualPath>,
    /// Newer-tree directories with no newer file beneath them; these must be
    /// created explicitly because no file transfer will materialize them.
    pub added_dirs: Vec<VirtualPath>,
}

impl TreeDiff {
    /// Whether the two trees were identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.added_dirs.is_empty()
    }
}

impl TreeManifest {
    /// Capture a manifest of the tree rooted at `root`.
    ///
    /// Entries are visited in sorted order; symlinked files are digested
    /// through the link.
    pub fn capture(root: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        let mut manifest = Self {
            algorithm,
            files: BTreeMap::new(),
            directories: BTreeSet::new(),
        };
        if !root.is_dir() {
            return Err(Error::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        manifest.walk(root, &VirtualPath::root())?;
        Ok(manifest)
    }

    fn walk(&mut self, dir: &Path, prefix: &VirtualPath) -> Result<()> {
        for entry in io::sorted_entries(dir)? {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let key = prefix.join(name.to_string_lossy());
            let metadata = fs::metadata(&entry).map_err(|e| Error::io(&entry, e))?;
            if metadata.is_dir() {
                self.directories.insert(key.clone());
                self.walk(&entry, &key)?;
            } else {
                self.files
                    .insert(key, checksum::digest_file(self.algorithm, &entry)?);
            }
        }
        Ok(())
    }

    /// The digest algorithm this manifest was captured with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// File paths and digests, in tree order.
    pub fn files(&self) -> &BTreeMap<VirtualPath, String> {
        &self.files
    }

    /// Directory paths, in tree order.
    pub fn directories(&self) -> &BTreeSet<VirtualPath> {
        &self.directories
    }

    /// Whether the captured tree had no entries at all.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Number of files in the manifest.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Diff this (older) manifest against a newer capture of the same tree.
    pub fn diff(&self, newer: &TreeManifest) -> TreeDiff {
        let mut diff = TreeDiff::default();

        for (path, digest) in &newer.files {
            match self.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(previous) if previous != digest => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }

        let mut removed: BTreeSet<VirtualPath> = self
            .files
            .keys()
            .filter(|p| !newer.files.contains_key(*p))
            .cloned()
            .collect();
        removed.extend(
            self.directories
                .iter()
                .filter(|d| !newer.directories.contains(*d))
                .cloned(),
        );

        // Keep only the shallowest removed path of each gone subtree.
        for path in removed {
            if !diff.removed.iter().any(|kept| kept.is_ancestor_of(&path)) {
                diff.removed.push(path);
            }
        }

        for dir in newer.directories.difference(&self.directories) {
            if !newer.files.keys().any(|f| dir.is_ancestor_of(f)) {
                diff.added_dirs.push(dir.clone());
            }
        }

        diff
    }
}
