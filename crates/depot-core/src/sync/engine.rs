//! Baseline-driven reconciliation engine
//!
//! Each run rescans both sides, classifies every path in the union of
//! local, remote and previously tracked paths, applies the unambiguous
//! transfers and deletions, settles conflicts under the configured policy,
//! and finally advances the in-memory baseline. Persisting the baseline
//! between runs is the caller's concern, via [`Baseline::save`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use depot_fs::VirtualPath;

use crate::artefact::Artefact;
use crate::manager::Manager;
use crate::{Error, Result};

use super::{Baseline, Conflict, ConflictKind, ConflictPolicy, Side};

/// Tuning for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Plan and report without transferring anything or advancing the
    /// baseline.
    pub dry_run: bool,
}

/// What one run did, or would do under dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<VirtualPath>,
    pub downloaded: Vec<VirtualPath>,
    pub deleted_local: Vec<VirtualPath>,
    pub deleted_remote: Vec<VirtualPath>,
    /// Conflicts encountered. Under a trusting or prompting policy their
    /// resolutions also appear in the transfer lists above.
    pub conflicts: Vec<Conflict>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.uploaded.is_empty()
            && self.downloaded.is_empty()
            && self.deleted_local.is_empty()
            && self.deleted_remote.is_empty()
            && self.conflicts.is_empty()
    }

    fn record(&mut self, path: VirtualPath, action: Action) {
        match action {
            Action::Upload => self.uploaded.push(path),
            Action::Download => self.downloaded.push(path),
            Action::DeleteLocal => self.deleted_local.push(path),
            Action::DeleteRemote => self.deleted_remote.push(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Upload,
    Download,
    DeleteLocal,
    DeleteRemote,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Noop,
    Do(Action),
    Clash(ConflictKind, ConflictKind),
}

/// Classify one path from its presence on each side and in the baseline.
///
/// A modification time at or before the baseline time counts as unchanged
/// since the last run; anything newer counts as an update.
fn classify(
    local: Option<DateTime<Utc>>,
    remote: Option<DateTime<Utc>>,
    tracked: bool,
    tracked_time: DateTime<Utc>,
) -> Outcome {
    match (local, remote, tracked) {
        // Never tracked: fresh creations, colliding when simultaneous.
        (Some(_), None, false) => Outcome::Do(Action::Upload),
        (None, Some(_), false) => Outcome::Do(Action::Download),
        (Some(_), Some(_), false) => {
            Outcome::Clash(ConflictKind::Created, ConflictKind::Created)
        }

        // Tracked but gone from one side: a deletion to propagate, unless
        // the surviving copy was edited in the meantime.
        (Some(l), None, true) => {
            if l <= tracked_time {
                Outcome::Do(Action::DeleteLocal)
            } else {
                Outcome::Clash(ConflictKind::Updated, ConflictKind::Deleted)
            }
        }
        (None, Some(r), true) => {
            if r <= tracked_time {
                Outcome::Do(Action::DeleteRemote)
            } else {
                Outcome::Clash(ConflictKind::Deleted, ConflictKind::Updated)
            }
        }

        // Tracked and present on both sides: push whichever copy moved.
        (Some(l), Some(r), true) => {
            match (l <= tracked_time, r <= tracked_time) {
                (true, true) => Outcome::Noop,
                (true, false) => Outcome::Do(Action::Download),
                (false, true) => Outcome::Do(Action::Upload),
                (false, false) => {
                    Outcome::Clash(ConflictKind::Updated, ConflictKind::Updated)
                }
            }
        }

        // Tracked and gone from both sides: stays tracked until a run
        // deletes it itself.
        (None, None, _) => Outcome::Noop,
    }
}

/// The transfer that enacts a conflict resolution.
fn action_for(conflict: &Conflict, winner: Side) -> Action {
    match winner {
        Side::Local => {
            if conflict.local == ConflictKind::Deleted {
                Action::DeleteRemote
            } else {
                Action::Upload
            }
        }
        Side::Remote => {
            if conflict.remote == ConflictKind::Deleted {
                Action::DeleteLocal
            } else {
                Action::Download
            }
        }
    }
}

/// All files under a manager's view, keyed by view-relative path.
pub(crate) fn scan(manager: &Manager) -> Result<BTreeMap<VirtualPath, DateTime<Utc>>> {
    let mut files = BTreeMap::new();
    for artefact in manager.list("/", true)? {
        if let Artefact::File(file) = artefact {
            files.insert(file.path()?, file.modified()?);
        }
    }
    Ok(files)
}

/// A reconciling pair of managers and the baseline between them.
#[derive(Debug)]
pub struct SyncEngine {
    local: Manager,
    remote: Manager,
    baseline: Baseline,
    policy: ConflictPolicy,
}

impl SyncEngine {
    pub fn new(
        local: Manager,
        remote: Manager,
        baseline: Baseline,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            local,
            remote,
            baseline,
            policy,
        }
    }

    pub fn local(&self) -> &Manager {
        &self.local
    }

    pub fn remote(&self) -> &Manager {
        &self.remote
    }

    /// The baseline as advanced by the last successful run.
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Run one reconciliation.
    ///
    /// Unambiguous transfers run first; conflicts are then settled under
    /// the policy. [`ConflictPolicy::Stop`] aborts with
    /// [`Error::SyncAborted`] after the unambiguous transfers have been
    /// applied; nothing is rolled back and the baseline does not advance.
    pub fn sync(&mut self, options: &SyncOptions) -> Result<SyncReport> {
        self.local.refresh("/")?;
        self.remote.refresh("/")?;
        let local_files = scan(&self.local)?;
        let remote_files = scan(&self.remote)?;

        let mut universe: BTreeSet<VirtualPath> = BTreeSet::new();
        universe.extend(local_files.keys().cloned());
        universe.extend(remote_files.keys().cloned());
        universe.extend(self.baseline.tracked_paths().iter().cloned());

        let tracked_time = self.baseline.tracked_time();
        let mut actions: Vec<(VirtualPath, Action)> = Vec::new();
        let mut conflicts: Vec<Conflict> = Vec::new();

        for path in &universe {
            match classify(
                local_files.get(path).copied(),
                remote_files.get(path).copied(),
                self.baseline.contains(path),
                tracked_time,
            ) {
                Outcome::Noop => {}
                Outcome::Do(action) => actions.push((path.clone(), action)),
                Outcome::Clash(local, remote) => conflicts.push(Conflict {
                    path: path.clone(),
                    local,
                    remote,
                }),
            }
        }

        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        if options.dry_run {
            for (path, action) in actions {
                report.record(path, action);
            }
            report.conflicts = conflicts;
            tracing::info!(
                "Dry run for {} <-> {}: {} action(s), {} conflict(s) pending",
                self.local.signature(),
                self.remote.signature(),
                report.uploaded.len()
                    + report.downloaded.len()
                    + report.deleted_local.len()
                    + report.deleted_remote.len(),
                report.conflicts.len()
            );
            return Ok(report);
        }

        let mut deleted: BTreeSet<VirtualPath> = BTreeSet::new();
        for (path, action) in actions {
            self.apply(&path, action, &mut report, &mut deleted)?;
        }

        if !conflicts.is_empty() {
            if matches!(self.policy, ConflictPolicy::Stop) {
                tracing::warn!(
                    "Sync halted by {} unresolved conflict(s)",
                    conflicts.len()
                );
                return Err(Error::SyncAborted { conflicts });
            }
            for conflict in &conflicts {
                if let Some(winner) = self.winner_for(conflict) {
                    let action = action_for(conflict, winner);
                    self.apply(&conflict.path, action, &mut report, &mut deleted)?;
                }
            }
            report.conflicts = conflicts;
        }

        let tracked: BTreeSet<VirtualPath> = universe
            .into_iter()
            .filter(|path| !deleted.contains(path))
            .collect();
        self.baseline = Baseline::new(Utc::now(), tracked);

        tracing::info!(
            "Synced {} <-> {}: {} up, {} down, {} deleted locally, {} deleted remotely, {} conflict(s)",
            self.local.signature(),
            self.remote.signature(),
            report.uploaded.len(),
            report.downloaded.len(),
            report.deleted_local.len(),
            report.deleted_remote.len(),
            report.conflicts.len()
        );
        Ok(report)
    }

    fn winner_for(&self, conflict: &Conflict) -> Option<Side> {
        match &self.policy {
            ConflictPolicy::Stop => None,
            ConflictPolicy::TrustLocal => Some(Side::Local),
            ConflictPolicy::TrustRemote => Some(Side::Remote),
            ConflictPolicy::Prompt(resolver) => Some(resolver.resolve(conflict)),
        }
    }

    fn apply(
        &self,
        path: &VirtualPath,
        action: Action,
        report: &mut SyncReport,
        deleted: &mut BTreeSet<VirtualPath>,
    ) -> Result<()> {
        match action {
            Action::Upload => {
                let artefact = self.local.artefact(path.clone())?;
                self.remote.put(&artefact, path.clone(), false)?;
                tracing::debug!("Uploaded {}", path);
            }
            Action::Download => {
                let artefact = self.remote.artefact(path.clone())?;
                self.local.put(&artefact, path.clone(), false)?;
                tracing::debug!("Downloaded {}", path);
            }
            Action::DeleteLocal => {
                self.local.remove(path.clone(), false)?;
                deleted.insert(path.clone());
                tracing::debug!("Removed local copy of {}", path);
            }
            Action::DeleteRemote => {
                self.remote.remove(path.clone(), false)?;
                deleted.insert(path.clone());
                tracing::debug!("Removed remote copy of {}", path);
            }
        }
        report.record(path.clone(), action);
        Ok(())
    }
}
