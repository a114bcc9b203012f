//! On-disk library files: one TOML document per library.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a crash mid-save leaves the previous file intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::index::LibraryIndex;
use super::model::Track;

const FORMAT_VERSION: u32 = 1;
const EXTENSION: &str = "toml";

#[derive(Serialize, Deserialize)]
struct LibraryFile {
    version: u32,
    root: PathBuf,
    #[serde(default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Clone)]
pub struct LibraryStore {
    dir: PathBuf,
}

impl LibraryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Names of all stored libraries, sorted. A missing directory holds none.
    pub fn names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::persistence_io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::persistence_io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    pub fn load(&self, name: &str) -> Result<LibraryIndex> {
        let path = self.path_for(name);
        let text = fs::read_to_string(&path).map_err(|e| Error::persistence_io(&path, e))?;
        let file: LibraryFile = toml::from_str(&text).map_err(|source| Error::PersistenceDecode {
            path: path.clone(),
            source,
        })?;
        if file.version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion {
                path,
                found: file.version,
            });
        }
        Ok(LibraryIndex::from_tracks(file.root, file.tracks))
    }

    pub fn save(&self, name: &str, index: &LibraryIndex) -> Result<()> {
        let file = LibraryFile {
            version: FORMAT_VERSION,
            root: index.root().to_path_buf(),
            tracks: index.tracks().cloned().collect(),
        };
        let text = toml::to_string(&file).map_err(|source| Error::PersistenceEncode {
            name: name.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence_io(&self.dir, e))?;
        let target = self.path_for(name);

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::persistence_io(&self.dir, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence_io(tmp.path(), e))?;
        tmp.persist(&target)
            .map_err(|e| Error::persistence_io(&target, e.error))?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        fs::remove_file(&path).map_err(|e| Error::persistence_io(&path, e))
    }
}

impl LibraryIndex {
    /// Load the index stored under `name`.
    pub fn load(store: &LibraryStore, name: &str) -> Result<Self> {
        store.load(name)
    }

    /// Persist this index under `name`.
    pub fn save(&self, store: &LibraryStore, name: &str) -> Result<()> {
        store.save(name, self)
    }
}
