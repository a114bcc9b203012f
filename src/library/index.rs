//! The per-root track index and its incremental rescan.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::SystemTime;

use tracing::debug;

use crate::error::{Error, Result};

use super::model::Track;
use super::scan::{Scanner, is_cancelled};

/// Counts produced by a rescan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanReport {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Changes computed against the disk, not yet applied to an index.
///
/// A plan is built from a snapshot of the root and the known paths, so the
/// walk and the probes run without holding any lock on the index.
#[derive(Debug, Default)]
pub struct RescanPlan {
    additions: Vec<Track>,
    removals: Vec<PathBuf>,
}

impl RescanPlan {
    /// Walk `root` and diff it against `known`, probing only new files.
    pub fn compute(
        root: &Path,
        known: &BTreeSet<PathBuf>,
        scanner: &Scanner,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self> {
        let found = scanner.discover(root, cancel)?;

        let removals: Vec<PathBuf> = known.difference(&found).cloned().collect();

        let mut additions = Vec::new();
        for path in found.into_iter().filter(|p| !known.contains(p)) {
            if is_cancelled(cancel) {
                return Err(Error::ScanInterrupted(root.to_path_buf()));
            }
            let meta = scanner.probe(&path);
            additions.push(Track::new(path, meta));
        }

        Ok(Self {
            additions,
            removals,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryIndex {
    root: PathBuf,
    tracks: BTreeMap<PathBuf, Track>,
}

impl LibraryIndex {
    /// An empty index for `root`.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            tracks: BTreeMap::new(),
        }
    }

    /// Rebuild an index from stored tracks.
    ///
    /// Tracks outside `root` are dropped and duplicate paths keep the last
    /// record, so the path invariants hold whatever the file contained.
    pub fn from_tracks(root: PathBuf, tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut index = Self::new(root);
        for track in tracks {
            if track.path.starts_with(&index.root) {
                index.tracks.insert(track.path.clone(), track);
            } else {
                debug!("dropping {} outside {}", track.path.display(), index.root.display());
            }
        }
        index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in path order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn favourites(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(|t| t.favourite)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tracks.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Result<&Track> {
        self.tracks
            .get(path)
            .ok_or_else(|| Error::TrackNotFound(path.to_path_buf()))
    }

    /// Record one play of `path` at `at`.
    pub fn apply_played(&mut self, path: &Path, at: SystemTime) -> Result<Track> {
        let track = self
            .tracks
            .get_mut(path)
            .ok_or_else(|| Error::TrackNotFound(path.to_path_buf()))?;
        track.play_count = track.play_count.saturating_add(1);
        track.last_played = Some(track.last_played.map_or(at, |prev| prev.max(at)));
        Ok(track.clone())
    }

    pub fn toggle_favourite(&mut self, path: &Path) -> Result<Track> {
        let track = self
            .tracks
            .get_mut(path)
            .ok_or_else(|| Error::TrackNotFound(path.to_path_buf()))?;
        track.favourite = !track.favourite;
        Ok(track.clone())
    }

    /// Resynchronize with the files currently under `root`.
    ///
    /// New files are probed and added with no history, vanished files are
    /// dropped, and everything else is left exactly as it was.
    pub fn rescan(&mut self, scanner: &Scanner, cancel: Option<&AtomicBool>) -> Result<RescanReport> {
        let plan = self.plan_rescan(scanner, cancel)?;
        Ok(self.apply_rescan(plan))
    }

    /// Every indexed path.
    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.tracks.keys().cloned().collect()
    }

    /// Walk the disk and probe new files without touching the index.
    pub fn plan_rescan(&self, scanner: &Scanner, cancel: Option<&AtomicBool>) -> Result<RescanPlan> {
        RescanPlan::compute(&self.root, &self.paths(), scanner, cancel)
    }

    /// Apply a plan. Paths that appeared or vanished since planning are
    /// re-checked so concurrent history updates are never overwritten.
    pub fn apply_rescan(&mut self, plan: RescanPlan) -> RescanReport {
        let mut report = RescanReport::default();

        for path in plan.removals {
            if self.tracks.remove(&path).is_some() {
                debug!("removed {}", path.display());
                report.removed += 1;
            }
        }
        for track in plan.additions {
            if !track.path.starts_with(&self.root) || self.tracks.contains_key(&track.path) {
                continue;
            }
            debug!("added {}", track.path.display());
            self.tracks.insert(track.path.clone(), track);
            report.added += 1;
        }

        report.unchanged = self.tracks.len() - report.added;
        report
    }
}
