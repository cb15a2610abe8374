//! Storage virtualization: uniform artefact operations across backends
//!
//! depot presents the content of any supported store, a directory tree on
//! disk or an in-process scratch store, as artefacts addressed by virtual
//! paths. A [`Manager`] owns one store and exposes the uniform operation
//! set: identify, list, get, put, copy, rename, remove, digest. Handles
//! track artefacts by identity, so they follow renames and fail once the
//! artefact is gone. Localisation materializes an artefact at a native
//! path for ordinary tooling and pushes edits back when the scope closes,
//! and the sync engine reconciles two stores against a persisted baseline.
//!
//! # Architecture
//!
//! - [`driver`]: the backend trait plus the filesystem and memory backends
//! - [`manager`]: managers, subtree views and the shared artefact table
//! - [`artefact`]: typed handles and lazily resolved placeholders
//! - [`localiser`]: scoped local materialization with write-back
//! - [`sync`]: baseline reconciliation, conflict policies and mirroring
//! - [`config`] / [`registry`]: store configuration and connection pooling

pub mod artefact;
pub mod config;
pub mod driver;
pub mod error;
pub mod localiser;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod sync;

pub use artefact::{Artefact, ArtefactId, Directory, File, Placeholder};
pub use config::StoreConfig;
pub use driver::{Driver, Entry, EntryKind, FilesystemDriver, MemoryDriver, Stat};
pub use error::{Error, Result};
pub use localiser::{Localised, SNAPSHOT_ALGORITHM};
pub use manager::{Locator, Manager, PutSource};
pub use registry::Registry;
pub use sync::{
    Baseline, Conflict, ConflictKind, ConflictPolicy, ConflictResolver, MirrorOptions,
    MirrorReport, Side, SyncEngine, SyncOptions, SyncReport, mirror,
};

// Path and digest primitives come from depot-fs; re-exported so most
// callers need only this crate.
pub use depot_fs::{HashAlgorithm, TreeDiff, TreeManifest, VirtualPath};
