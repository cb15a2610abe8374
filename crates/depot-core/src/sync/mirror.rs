//! One-way mirroring
//!
//! The stateless counterpart to [`SyncEngine`](super::SyncEngine): make the
//! destination hold what the source holds, never touching the source and
//! never consulting a baseline.

use depot_fs::VirtualPath;

use crate::Result;
use crate::manager::Manager;

use super::engine::scan;

/// Tuning for a mirror pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorOptions {
    /// Remove destination files with no source counterpart.
    pub delete: bool,
    /// Plan and report without transferring anything.
    pub dry_run: bool,
}

/// What one pass did, or would do under dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub copied: Vec<VirtualPath>,
    pub deleted: Vec<VirtualPath>,
    pub skipped: usize,
    pub dry_run: bool,
}

/// Copy every file under `source` into `dest`.
///
/// A destination file is rewritten when it is missing or older than its
/// source; extraneous destination files are only removed under
/// [`MirrorOptions::delete`].
pub fn mirror(source: &Manager, dest: &Manager, options: &MirrorOptions) -> Result<MirrorReport> {
    source.refresh("/")?;
    dest.refresh("/")?;
    let source_files = scan(source)?;
    let dest_files = scan(dest)?;

    let mut report = MirrorReport {
        dry_run: options.dry_run,
        ..Default::default()
    };

    for (path, modified) in &source_files {
        let fresh = match dest_files.get(path) {
            None => false,
            Some(dest_modified) => dest_modified >= modified,
        };
        if fresh {
            report.skipped += 1;
            continue;
        }
        if !options.dry_run {
            let artefact = source.artefact(path.clone())?;
            dest.put(&artefact, path.clone(), false)?;
        }
        report.copied.push(path.clone());
    }

    if options.delete {
        let extraneous: Vec<VirtualPath> = dest_files
            .keys()
            .filter(|path| !source_files.contains_key(*path))
            .cloned()
            .collect();
        for path in extraneous {
            if !options.dry_run {
                dest.remove(path.clone(), false)?;
            }
            report.deleted.push(path);
        }
    }

    tracing::info!(
        "Mirrored {} -> {}: {} copied, {} deleted, {} up to date",
        source.signature(),
        dest.signature(),
        report.copied.len(),
        report.deleted.len(),
        report.skipped
    );
    Ok(report)
}
