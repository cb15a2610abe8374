//! Reconciliation between two stores
//!
//! The sync engine compares two managers against a persisted [`Baseline`]
//! of the previous run, classifies every path as create, update or delete
//! on either side, applies the non-conflicting transfers, and settles
//! conflicting paths under a [`ConflictPolicy`]. [`mirror`] is the simpler
//! one-way variant with no baseline.

mod baseline;
mod engine;
mod mirror;

pub use baseline::Baseline;
pub use engine::{SyncEngine, SyncOptions, SyncReport};
pub use mirror::{MirrorOptions, MirrorReport, mirror};

use std::fmt;

use depot_fs::VirtualPath;

/// One end of a sync pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// What happened to a path on one side since the last reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

/// A path both sides touched since the last reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: VirtualPath,
    pub local: ConflictKind,
    pub remote: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} locally, {} remotely",
            self.path, self.local, self.remote
        )
    }
}

/// Chooses a winning side for one conflict under [`ConflictPolicy::Prompt`].
pub trait ConflictResolver {
    fn resolve(&self, conflict: &Conflict) -> Side;
}

impl<F> ConflictResolver for F
where
    F: Fn(&Conflict) -> Side,
{
    fn resolve(&self, conflict: &Conflict) -> Side {
        self(conflict)
    }
}

/// How conflicting paths are settled.
#[derive(Default)]
pub enum ConflictPolicy {
    /// Apply the non-conflicting transfers, then abort reporting every
    /// conflict. Nothing is rolled back.
    #[default]
    Stop,
    /// The local side wins every conflict.
    TrustLocal,
    /// The remote side wins every conflict.
    TrustRemote,
    /// Ask a resolver, conflict by conflict.
    Prompt(Box<dyn ConflictResolver>),
}

impl fmt::Debug for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("Stop"),
            Self::TrustLocal => f.write_str("TrustLocal"),
            Self::TrustRemote => f.write_str("TrustRemote"),
            Self::Prompt(_) => f.write_str("Prompt(..)"),
        }
    }
}
