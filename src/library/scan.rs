use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::{Error, Result};

use super::metadata::{MetadataExtractor, TrackMetadata};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

pub(crate) fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Walks library roots and probes the files it finds.
#[derive(Clone)]
pub struct Scanner {
    settings: LibrarySettings,
    extractor: Arc<dyn MetadataExtractor>,
}

impl Scanner {
    pub fn new(settings: LibrarySettings, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    /// Collect every supported audio file under `root`.
    ///
    /// `cancel` is checked between file visits; when it is raised the walk
    /// stops with [`Error::ScanInterrupted`]. Paths that are not valid UTF-8
    /// are skipped with a warning.
    pub fn discover(&self, root: &Path, cancel: Option<&AtomicBool>) -> Result<BTreeSet<PathBuf>> {
        let settings = &self.settings;
        let mut found = BTreeSet::new();

        let mut walker = WalkDir::new(root).follow_links(settings.follow_links);

        // Non-recursive = only the root directory.
        let depth_cap = if settings.recursive {
            settings.max_depth
        } else {
            Some(1)
        };
        if let Some(d) = depth_cap {
            walker = walker.max_depth(d);
        }

        for entry in walker
            .into_iter()
            .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        {
            if is_cancelled(cancel) {
                return Err(Error::ScanInterrupted(root.to_path_buf()));
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping unreadable entry under {}: {e}", root.display());
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() || !self.extractor.supports(path) {
                continue;
            }
            // Library files are TOML, which only holds UTF-8 strings.
            if path.to_str().is_none() {
                warn!("skipping {}: file name is not valid UTF-8", path.display());
                continue;
            }
            found.insert(path.to_path_buf());
        }

        Ok(found)
    }

    /// Probe one file, falling back to empty metadata on failure.
    pub fn probe(&self, path: &Path) -> TrackMetadata {
        match self.extractor.probe(path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("{e}");
                TrackMetadata::default()
            }
        }
    }
}
