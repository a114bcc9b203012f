//! The catalogue of named libraries.
//!
//! Each library's index sits behind an `RwLock` so a background rescan and a
//! playback session can share it: rescans walk the disk against a snapshot
//! taken under a brief read lock, only the apply step takes the write lock,
//! and every mutation is followed by a save.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::error::{Error, Result};

use super::index::{LibraryIndex, RescanPlan, RescanReport};
use super::model::Track;
use super::scan::Scanner;
use super::store::LibraryStore;

/// A row of `list`.
///
/// Libraries whose file could not be loaded have no root and carry the load
/// error in `problem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySummary {
    pub name: String,
    pub root: Option<PathBuf>,
    pub track_count: usize,
    pub problem: Option<String>,
}

/// Shared handle to one named library.
#[derive(Clone)]
pub struct Library {
    name: Arc<str>,
    index: Arc<RwLock<LibraryIndex>>,
    store: LibraryStore,
    save_lock: Arc<Mutex<()>>,
}

impl Library {
    fn new(name: &str, index: LibraryIndex, store: LibraryStore) -> Self {
        Self {
            name: Arc::from(name),
            index: Arc::new(RwLock::new(index)),
            store,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> RwLockReadGuard<'_, LibraryIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LibraryIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the current state.
    ///
    /// The snapshot is taken while holding the save lock, so saves land on
    /// disk in the same order as the mutations they capture.
    pub fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.read().clone();
        self.store.save(&self.name, &snapshot)
    }

    /// Rescan the library and persist the result.
    ///
    /// No lock is held while the disk is walked, so history updates and
    /// favourite toggles go through during a long rescan.
    pub fn update(&self, scanner: &Scanner, cancel: Option<&AtomicBool>) -> Result<RescanReport> {
        let (root, known) = {
            let index = self.read();
            (index.root().to_path_buf(), index.paths())
        };
        let plan = RescanPlan::compute(&root, &known, scanner, cancel)?;
        let report = if plan.is_empty() {
            RescanReport {
                unchanged: self.read().len(),
                ..RescanReport::default()
            }
        } else {
            let report = self.write().apply_rescan(plan);
            self.save()?;
            report
        };
        info!(
            "library \"{}\" updated: {} added, {} removed, {} unchanged",
            self.name, report.added, report.removed, report.unchanged
        );
        Ok(report)
    }

    /// Record a play of `path` and persist.
    pub fn record_played(&self, path: &Path, at: SystemTime) -> Result<Track> {
        let track = self.write().apply_played(path, at)?;
        self.save()?;
        Ok(track)
    }

    /// Flip the favourite flag of `path` and persist.
    pub fn toggle_favourite(&self, path: &Path) -> Result<Track> {
        let track = self.write().toggle_favourite(path)?;
        self.save()?;
        Ok(track)
    }

    fn summary(&self) -> LibrarySummary {
        let index = self.read();
        LibrarySummary {
            name: self.name.to_string(),
            root: Some(index.root().to_path_buf()),
            track_count: index.len(),
            problem: None,
        }
    }
}

pub struct LibraryRegistry {
    store: LibraryStore,
    scanner: Scanner,
    libraries: BTreeMap<String, Library>,
    /// Library files that failed to load, with the reason.
    unreadable: BTreeMap<String, String>,
}

impl LibraryRegistry {
    /// Load every library stored in `store`.
    ///
    /// A file that cannot be loaded does not stop the others; it is logged
    /// and kept as an unreadable entry that can be listed and deleted.
    pub fn open(store: LibraryStore, scanner: Scanner) -> Result<Self> {
        let mut libraries = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for name in store.names()? {
            match store.load(&name) {
                Ok(index) => {
                    libraries.insert(name.clone(), Library::new(&name, index, store.clone()));
                }
                Err(e) => {
                    warn!("library \"{name}\" cannot be loaded: {e}");
                    unreadable.insert(name, e.to_string());
                }
            }
        }
        Ok(Self {
            store,
            scanner,
            libraries,
            unreadable,
        })
    }

    fn knows(&self, name: &str) -> bool {
        self.libraries.contains_key(name) || self.unreadable.contains_key(name)
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Register a new library rooted at `root` and run its first scan.
    pub fn create(&mut self, name: &str, root: &Path) -> Result<Library> {
        validate_name(name)?;
        if self.knows(name) || self.store.exists(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let root = readable_dir(root)?;

        let mut index = LibraryIndex::new(root);
        let report = index.rescan(&self.scanner, None)?;
        self.store.save(name, &index)?;
        info!(
            "created library \"{name}\" at {} with {} tracks",
            index.root().display(),
            report.added
        );

        let library = Library::new(name, index, self.store.clone());
        self.libraries.insert(name.to_string(), library.clone());
        Ok(library)
    }

    pub fn get(&self, name: &str) -> Result<Library> {
        if let Some(reason) = self.unreadable.get(name) {
            return Err(Error::Unreadable {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.libraries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::LibraryNotFound(name.to_string()))
    }

    /// Fails only when `name` is not a library at all; unreadable libraries
    /// pass so they can still be deleted.
    pub fn ensure_known(&self, name: &str) -> Result<()> {
        if self.knows(name) {
            Ok(())
        } else {
            Err(Error::LibraryNotFound(name.to_string()))
        }
    }

    /// All libraries, sorted by name.
    pub fn list(&self) -> Vec<LibrarySummary> {
        let unreadable = self.unreadable.iter().map(|(name, reason)| LibrarySummary {
            name: name.clone(),
            root: None,
            track_count: 0,
            problem: Some(reason.clone()),
        });
        let mut all: Vec<LibrarySummary> =
            self.libraries.values().map(Library::summary).chain(unreadable).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.ensure_known(name)?;
        if self.store.exists(name) {
            self.store.remove(name)?;
        } else {
            warn!("library \"{name}\" had no file on disk");
        }
        self.libraries.remove(name);
        self.unreadable.remove(name);
        info!("deleted library \"{name}\"");
        Ok(())
    }

    pub fn update(&self, name: &str) -> Result<RescanReport> {
        self.update_with_cancel(name, None)
    }

    pub fn update_with_cancel(&self, name: &str, cancel: Option<&AtomicBool>) -> Result<RescanReport> {
        self.get(name)?.update(&self.scanner, cancel)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).components().count() != 1;
    if bad {
        Err(Error::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

fn readable_dir(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|_| Error::InvalidRoot(root.to_path_buf()))?;
    // The root is stored as a TOML string.
    if canonical.to_str().is_none() || !canonical.is_dir() || fs::read_dir(&canonical).is_err() {
        return Err(Error::InvalidRoot(root.to_path_buf()));
    }
    Ok(canonical)
}
