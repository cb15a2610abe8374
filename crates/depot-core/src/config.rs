//! Store configuration
//!
//! A [`StoreConfig`] names a backend and where it is rooted, in a form
//! that serializes cleanly and parses from a URL. It is what callers hand
//! to the [`Registry`](crate::Registry) to obtain managers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::driver::{Driver, FilesystemDriver, MemoryDriver};
use crate::{Error, Result};

/// The backend a store runs on and its root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// A directory tree on the local filesystem
    Filesystem {
        /// Native directory the store is rooted at
        root: PathBuf,
    },

    /// An in-process store, for tests and scratch work
    Memory {
        /// Name distinguishing one memory store from another
        name: String,
    },
}

impl StoreConfig {
    /// Configuration for a filesystem store rooted at `root`.
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self::Filesystem { root: root.into() }
    }

    /// Configuration for a named in-process store.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::Memory { name: name.into() }
    }

    /// Parse a store URL.
    ///
    /// `file:///path` and `memory://name` select their backends; a bare
    /// path is shorthand for a filesystem store.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::invalid_config(url, "empty store URL"));
        }
        if let Some(rest) = url.strip_prefix("memory://") {
            if rest.is_empty() {
                return Err(Error::invalid_config(url, "memory store needs a name"));
            }
            return Ok(Self::memory(rest));
        }
        if let Some(rest) = url.strip_prefix("file://") {
            if rest.is_empty() {
                return Err(Error::invalid_config(url, "filesystem store needs a path"));
            }
            return Ok(Self::filesystem(rest));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(Error::invalid_config(
                url,
                format!("unknown store scheme '{scheme}'"),
            ));
        }
        Ok(Self::filesystem(url))
    }

    /// Textual identity used to share managers between equal configs.
    pub fn signature(&self) -> String {
        match self {
            Self::Filesystem { root } => format!("file://{}", root.display()),
            Self::Memory { name } => format!("memory://{name}"),
        }
    }

    /// Construct the driver this configuration describes.
    pub fn open(&self) -> Result<Box<dyn Driver>> {
        match self {
            Self::Filesystem { root } => Ok(Box::new(FilesystemDriver::new(root)?)),
            Self::Memory { name } => Ok(Box::new(MemoryDriver::new(name))),
        }
    }
}
