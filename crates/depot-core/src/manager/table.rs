//! Authoritative path table
//!
//! One table per store, the sole long-lived owner of artefact records.
//! Handles hold an [`ArtefactId`] and query the table on access, so evicting
//! a record is all it takes to invalidate every outstanding handle.
//! Identifiers are allocated monotonically and never reused; a stale id can
//! never alias a newer artefact that reappears at the same path.

use std::collections::BTreeMap;

use depot_fs::{HashAlgorithm, VirtualPath};

use crate::artefact::ArtefactId;
use crate::driver::{EntryKind, Stat};

#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub path: VirtualPath,
    pub kind: EntryKind,
    pub stat: Stat,
    /// Lazily computed digests; kept for the record's lifetime.
    pub digests: BTreeMap<HashAlgorithm, String>,
    /// Whether a directory's listing has been fetched.
    pub collected: bool,
}

#[derive(Debug, Default)]
pub(crate) struct PathTable {
    records: BTreeMap<ArtefactId, Record>,
    by_path: BTreeMap<VirtualPath, ArtefactId>,
    next_id: u64,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ArtefactId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: ArtefactId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: ArtefactId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn id_at(&self, path: &VirtualPath) -> Option<ArtefactId> {
        self.by_path.get(path).copied()
    }

    pub fn record_at(&self, path: &VirtualPath) -> Option<&Record> {
        self.id_at(path).and_then(|id| self.records.get(&id))
    }

    /// Insert or refresh the record at `path`.
    ///
    /// A same-kind upsert keeps the existing id, digest cache and collected
    /// flag, so held handles observe the update. A kind change evicts the
    /// old record (and its subtree) and allocates a fresh identity.
    pub fn upsert(&mut self, path: &VirtualPath, stat: Stat) -> ArtefactId {
        if let Some(id) = self.id_at(path) {
            let same_kind = self
                .records
                .get(&id)
                .map(|r| r.kind == stat.kind)
                .unwrap_or(false);
            if same_kind {
                if let Some(record) = self.records.get_mut(&id) {
                    record.stat = stat;
                }
                return id;
            }
            self.evict(path);
        }

        let id = self.allocate();
        self.records.insert(
            id,
            Record {
                path: path.clone(),
                kind: stat.kind,
                stat,
                digests: BTreeMap::new(),
                collected: false,
            },
        );
        self.by_path.insert(path.clone(), id);
        id
    }

    fn allocate(&mut self) -> ArtefactId {
        let id = ArtefactId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Remove the records for `path` and everything beneath it.
    ///
    /// Returns how many records were evicted.
    pub fn evict(&mut self, path: &VirtualPath) -> usize {
        let doomed: Vec<ArtefactId> = self
            .by_path
            .iter()
            .filter(|(p, _)| *p == path || path.is_ancestor_of(p))
            .map(|(_, id)| *id)
            .collect();
        for id in &doomed {
            if let Some(record) = self.records.remove(id) {
                self.by_path.remove(&record.path);
            }
        }
        doomed.len()
    }

    /// Re-key `path` and its subtree under a new location, preserving ids.
    pub fn rekey(&mut self, from: &VirtualPath, to: &VirtualPath) {
        let moved: Vec<(VirtualPath, ArtefactId)> = self
            .by_path
            .iter()
            .filter(|(p, _)| *p == from || from.is_ancestor_of(p))
            .map(|(p, id)| (p.clone(), *id))
            .collect();
        for (old_path, id) in moved {
            let Some(rel) = old_path.relative_to(from) else {
                continue;
            };
            let new_path = to.concat(&rel);
            self.by_path.remove(&old_path);
            if let Some(record) = self.records.get_mut(&id) {
                record.path = new_path.clone();
            }
            self.by_path.insert(new_path, id);
        }
    }

    /// Direct children of `path`, in path order.
    pub fn children(&self, path: &VirtualPath) -> Vec<ArtefactId> {
        let child_depth = path.depth() + 1;
        self.by_path
            .iter()
            .filter(|(p, _)| p.starts_with(path) && p.depth() == child_depth)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Every record strictly beneath `path`, in path order.
    pub fn descendants(&self, path: &VirtualPath) -> Vec<ArtefactId> {
        self.by_path
            .iter()
            .filter(|(p, _)| path.is_ancestor_of(p))
            .map(|(_, id)| *id)
            .collect()
    }

    /// Forget the cached listings for `path` and every directory beneath it.
    pub fn clear_collected(&mut self, path: &VirtualPath) {
        let ids: Vec<ArtefactId> = self
            .by_path
            .iter()
            .filter(|(p, _)| *p == path || path.is_ancestor_of(p))
            .map(|(_, id)| *id)
            .collect();
        for id in ids {
            if let Some(record) = self.records.get_mut(&id) {
                record.collected = false;
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
