//! In-memory driver
//!
//! A whole store held in a `BTreeMap`, used for tests and as the reference
//! for backends that are not locally addressable: `is_local` is false, so
//! managers over it exercise the full download/upload localisation path.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use depot_fs::{VirtualPath, io as fsio};

use super::{Driver, Entry, EntryKind, Stat};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct Object {
    kind: EntryKind,
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
    created: DateTime<Utc>,
    content_type: Option<String>,
    storage_class: Option<String>,
}

impl Object {
    fn file(bytes: Vec<u8>, now: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::File,
            bytes,
            modified: now,
            created: now,
            content_type: None,
            storage_class: None,
        }
    }

    fn directory(now: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::Directory,
            bytes: Vec::new(),
            modified: now,
            created: now,
            content_type: None,
            storage_class: None,
        }
    }

    fn stat(&self) -> Stat {
        Stat {
            kind: self.kind,
            size: self.bytes.len() as u64,
            modified: self.modified,
            created: Some(self.created),
            accessed: None,
            is_link: false,
            content_type: self.content_type.clone(),
            storage_class: self.storage_class.clone(),
        }
    }
}

/// Driver backed by an in-process object map.
///
/// The root directory always exists. Parent directories materialize
/// implicitly on write, the way object stores surface key prefixes.
#[derive(Debug)]
pub struct MemoryDriver {
    name: String,
    created_at: DateTime<Utc>,
    objects: RefCell<BTreeMap<VirtualPath, Object>>,
}

impl MemoryDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            objects: RefCell::new(BTreeMap::new()),
        }
    }

    /// Insert a file object directly, with backend metadata attached.
    pub fn seed(
        &self,
        path: impl Into<VirtualPath>,
        bytes: impl Into<Vec<u8>>,
        content_type: Option<&str>,
        storage_class: Option<&str>,
    ) -> Result<()> {
        let path = path.into();
        let now = Utc::now();
        let mut objects = self.objects.borrow_mut();
        insert_parents(&mut objects, &path, now)?;
        let mut object = Object::file(bytes.into(), now);
        object.content_type = content_type.map(str::to_string);
        object.storage_class = storage_class.map(str::to_string);
        objects.insert(path, object);
        Ok(())
    }

    fn subtree_keys(&self, path: &VirtualPath) -> Vec<VirtualPath> {
        self.objects
            .borrow()
            .keys()
            .filter(|k| *k == path || path.is_ancestor_of(k))
            .cloned()
            .collect()
    }
}

fn insert_parents(
    objects: &mut BTreeMap<VirtualPath, Object>,
    path: &VirtualPath,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut ancestors = Vec::new();
    let mut current = path.parent();
    while let Some(p) = current {
        if p.is_root() {
            break;
        }
        ancestors.push(p.clone());
        current = p.parent();
    }
    for ancestor in ancestors.into_iter().rev() {
        match objects.get(&ancestor) {
            Some(o) if o.kind == EntryKind::File => {
                return Err(Error::type_mismatch(
                    ancestor,
                    EntryKind::Directory,
                    EntryKind::File,
                ));
            }
            Some(_) => {}
            None => {
                objects.insert(ancestor, Object::directory(now));
            }
        }
    }
    Ok(())
}

impl Driver for MemoryDriver {
    fn scheme(&self) -> &str {
        "memory"
    }

    fn root(&self) -> &str {
        &self.name
    }

    fn stat(&self, path: &VirtualPath) -> Result<Option<Stat>> {
        if path.is_root() {
            return Ok(Some(Stat::directory(self.created_at)));
        }
        Ok(self.objects.borrow().get(path).map(Object::stat))
    }

    fn list(&self, path: &VirtualPath) -> Result<Vec<Entry>> {
        if !path.is_root() {
            match self.objects.borrow().get(path) {
                None => return Err(Error::not_found(path)),
                Some(o) if o.kind == EntryKind::File => {
                    return Err(Error::type_mismatch(
                        path,
                        EntryKind::Directory,
                        EntryKind::File,
                    ));
                }
                Some(_) => {}
            }
        }
        let child_depth = path.depth() + 1;
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|(k, _)| k.starts_with(path) && k.depth() == child_depth)
            .map(|(k, o)| Entry {
                path: k.clone(),
                stat: o.stat(),
            })
            .collect())
    }

    fn get(&self, path: &VirtualPath, dest: &Path) -> Result<()> {
        let stat = self.stat(path)?.ok_or_else(|| Error::not_found(path))?;
        if stat.is_file() {
            let bytes = self.get_bytes(path)?;
            return Ok(fsio::write_atomic(dest, &bytes)?);
        }

        fsio::ensure_dir(dest)?;
        for key in self.subtree_keys(path) {
            if key == *path {
                continue;
            }
            let Some(rel) = key.relative_to(path) else {
                continue;
            };
            let native = rel.to_native_under(dest);
            let object = self
                .objects
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::not_found(&key))?;
            match object.kind {
                EntryKind::Directory => fsio::ensure_dir(&native)?,
                EntryKind::File => fsio::write_atomic(&native, &object.bytes)?,
            }
        }
        Ok(())
    }

    fn get_bytes(&self, path: &VirtualPath) -> Result<Vec<u8>> {
        match self.objects.borrow().get(path) {
            None => Err(Error::not_found(path)),
            Some(o) if o.kind == EntryKind::Directory => Err(Error::type_mismatch(
                path,
                EntryKind::File,
                EntryKind::Directory,
            )),
            Some(o) => Ok(o.bytes.clone()),
        }
    }

    fn put(&self, source: &Path, path: &VirtualPath) -> Result<()> {
        let metadata = fs::metadata(source).map_err(|e| depot_fs::Error::io(source, e))?;
        if metadata.is_dir() {
            self.mkdir(path)?;
            for entry in fsio::sorted_entries(source)? {
                let Some(name) = entry.file_name() else {
                    continue;
                };
                self.put(&entry, &path.join(name.to_string_lossy()))?;
            }
            Ok(())
        } else {
            self.put_bytes(&fsio::read_bytes(source)?, path)
        }
    }

    fn put_bytes(&self, bytes: &[u8], path: &VirtualPath) -> Result<()> {
        if path.is_root() {
            return Err(Error::type_mismatch(
                path,
                EntryKind::File,
                EntryKind::Directory,
            ));
        }
        let now = Utc::now();
        let mut objects = self.objects.borrow_mut();
        insert_parents(&mut objects, path, now)?;
        match objects.get_mut(path) {
            Some(o) if o.kind == EntryKind::Directory => Err(Error::type_mismatch(
                path,
                EntryKind::File,
                EntryKind::Directory,
            )),
            Some(o) => {
                o.bytes = bytes.to_vec();
                o.modified = now;
                Ok(())
            }
            None => {
                objects.insert(path.clone(), Object::file(bytes.to_vec(), now));
                Ok(())
            }
        }
    }

    fn mkdir(&self, path: &VirtualPath) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        let now = Utc::now();
        let mut objects = self.objects.borrow_mut();
        insert_parents(&mut objects, path, now)?;
        match objects.get(path) {
            Some(o) if o.kind == EntryKind::File => Err(Error::type_mismatch(
                path,
                EntryKind::Directory,
                EntryKind::File,
            )),
            Some(_) => Ok(()),
            None => {
                objects.insert(path.clone(), Object::directory(now));
                Ok(())
            }
        }
    }

    fn copy(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()> {
        let keys = self.subtree_keys(source);
        if keys.is_empty() {
            return Err(Error::not_found(source));
        }
        let now = Utc::now();
        let mut objects = self.objects.borrow_mut();
        insert_parents(&mut objects, dest, now)?;
        for key in keys {
            let Some(rel) = key.relative_to(source) else {
                continue;
            };
            if let Some(object) = objects.get(&key).cloned() {
                objects.insert(dest.concat(&rel), object);
            }
        }
        Ok(())
    }

    fn rename(&self, source: &VirtualPath, dest: &VirtualPath) -> Result<()> {
        let keys = self.subtree_keys(source);
        if keys.is_empty() {
            return Err(Error::not_found(source));
        }
        let now = Utc::now();
        let mut objects = self.objects.borrow_mut();
        insert_parents(&mut objects, dest, now)?;
        for key in keys {
            let Some(rel) = key.relative_to(source) else {
                continue;
            };
            if let Some(object) = objects.remove(&key) {
                objects.insert(dest.concat(&rel), object);
            }
        }
        Ok(())
    }

    fn remove(&self, path: &VirtualPath) -> Result<()> {
        let keys = self.subtree_keys(path);
        if keys.is_empty() {
            return Err(Error::not_found(path));
        }
        let mut objects = self.objects.borrow_mut();
        for key in keys {
            objects.remove(&key);
        }
        Ok(())
    }
}
