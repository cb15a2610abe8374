//! Error types for depot-core

use depot_fs::VirtualPath;

use crate::driver::EntryKind;
use crate::sync::Conflict;

/// Result type for depot-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depot-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No artefact exists at the addressed path
    #[error("Not found: {path}")]
    NotFound { path: VirtualPath },

    /// An artefact or path from outside this manager's subtree was used
    #[error("{path} is not a member of {manager}")]
    NotAMember { path: VirtualPath, manager: String },

    /// A file was expected where a directory sits, or vice versa
    #[error("{path} is a {found}, expected a {expected}")]
    TypeMismatch {
        path: VirtualPath,
        expected: EntryKind,
        found: EntryKind,
    },

    /// The operation is refused in the current state
    #[error("Operation not permitted on {path}: {reason}")]
    OperationNotPermitted { path: VirtualPath, reason: String },

    /// A held handle refers to an artefact that has since been removed
    #[error("{path} no longer exists")]
    NoLongerExists { path: VirtualPath },

    /// A backend I/O primitive failed
    #[error("{scheme} transport failure at {path}: {source}")]
    Transport {
        scheme: String,
        path: VirtualPath,
        #[source]
        source: std::io::Error,
    },

    /// Invalid store configuration or URL
    #[error("Invalid store configuration {value:?}: {message}")]
    InvalidConfig { value: String, message: String },

    /// Sync stopped on unresolved conflicts under the stop policy
    #[error("Sync aborted with {} unresolved conflict(s)", conflicts.len())]
    SyncAborted { conflicts: Vec<Conflict> },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from depot-fs
    #[error(transparent)]
    Fs(#[from] depot_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn not_found(path: impl Into<VirtualPath>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn not_a_member(path: impl Into<VirtualPath>, manager: impl Into<String>) -> Self {
        Self::NotAMember {
            path: path.into(),
            manager: manager.into(),
        }
    }

    pub fn type_mismatch(
        path: impl Into<VirtualPath>,
        expected: EntryKind,
        found: EntryKind,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    pub fn not_permitted(path: impl Into<VirtualPath>, reason: impl Into<String>) -> Self {
        Self::OperationNotPermitted {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn no_longer_exists(path: impl Into<VirtualPath>) -> Self {
        Self::NoLongerExists { path: path.into() }
    }

    pub fn transport(
        scheme: impl Into<String>,
        path: impl Into<VirtualPath>,
        source: std::io::Error,
    ) -> Self {
        Self::Transport {
            scheme: scheme.into(),
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            value: value.into(),
            message: message.into(),
        }
    }
}
