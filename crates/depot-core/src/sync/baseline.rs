//! Persisted reconciliation state
//!
//! A [`Baseline`] records when the last reconciliation ran and which file
//! paths it left present on both sides. The engine compares the next run's
//! scans against it to tell creations, updates and deletions apart. It is
//! persisted as a TOML file, locked for both load and save.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use depot_fs::VirtualPath;

use crate::Result;

/// What the last reconciliation saw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// When the reconciliation ran, as epoch seconds.
    #[serde(with = "chrono::serde::ts_seconds")]
    tracked_time: DateTime<Utc>,
    /// Paths present on both sides when it finished.
    tracked_paths: BTreeSet<VirtualPath>,
}

impl Baseline {
    /// A baseline for a pair that has never reconciled: epoch time, no
    /// tracked paths, so everything present reads as created.
    pub fn empty() -> Self {
        Self {
            tracked_time: DateTime::<Utc>::UNIX_EPOCH,
            tracked_paths: BTreeSet::new(),
        }
    }

    pub fn new(tracked_time: DateTime<Utc>, tracked_paths: BTreeSet<VirtualPath>) -> Self {
        Self {
            tracked_time,
            tracked_paths,
        }
    }

    pub fn tracked_time(&self) -> DateTime<Utc> {
        self.tracked_time
    }

    pub fn tracked_paths(&self) -> &BTreeSet<VirtualPath> {
        &self.tracked_paths
    }

    pub fn contains(&self, path: &VirtualPath) -> bool {
        self.tracked_paths.contains(path)
    }

    /// Load a baseline from a TOML file with shared lock.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        file.lock_shared()?;

        // Read through the locked file handle to avoid TOCTOU race
        let mut content = String::new();
        use std::io::Read;
        (&file).read_to_string(&mut content)?;
        let baseline: Baseline = toml::from_str(&content)?;

        // Lock released when file is dropped
        Ok(baseline)
    }

    /// Load a baseline, falling back to [`Baseline::empty`] when the file
    /// does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::empty())
        }
    }

    /// Save the baseline to a TOML file atomically with exclusive lock.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        // Create or open the target file for locking
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        // Acquire exclusive lock (blocks if another process holds lock)
        lock_file.lock_exclusive()?;

        // Write to temporary file first
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;

        // Atomically rename to target
        fs::rename(&temp_path, path)?;

        // Lock released when lock_file is dropped
        Ok(())
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::empty()
    }
}
