//! Tag extraction for newly discovered files.
//!
//! Extraction is per file and never fatal: the index falls back to the
//! filename when `probe` fails.

use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::tag::Tag;

use crate::config::LibrarySettings;
use crate::error::{Error, Result};

/// Structured tags read from an audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<Duration>,
}

pub trait MetadataExtractor: Send + Sync {
    /// Whether `path` looks like a file this extractor (and the player) can handle.
    fn supports(&self, path: &Path) -> bool;

    /// Read tags from `path`.
    fn probe(&self, path: &Path) -> Result<TrackMetadata>;
}

/// Reads tags with `lofty`; file support is decided by extension.
pub struct LoftyExtractor {
    extensions: Vec<String>,
}

impl LoftyExtractor {
    pub fn new(settings: &LibrarySettings) -> Self {
        let extensions = settings
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }
}

impl MetadataExtractor for LoftyExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| e == &ext)
            })
            .unwrap_or(false)
    }

    fn probe(&self, path: &Path) -> Result<TrackMetadata> {
        let tagged = lofty::read_from_path(path).map_err(|e| Error::ExtractionFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());
        let primary = tagged.primary_tag();
        let tags = tagged.tags();

        Ok(TrackMetadata {
            title: first_non_empty(primary, tags, |t| t.title().map(|v| v.into_owned())),
            artist: first_non_empty(primary, tags, |t| t.artist().map(|v| v.into_owned())),
            album: first_non_empty(primary, tags, |t| t.album().map(|v| v.into_owned())),
            genre: first_non_empty(primary, tags, |t| t.genre().map(|v| v.into_owned())),
            duration,
        })
    }
}

/// First trimmed, non-empty value from the primary tag, then any other tag.
fn first_non_empty<F>(primary: Option<&Tag>, tags: &[Tag], extract: F) -> Option<String>
where
    F: Fn(&Tag) -> Option<String>,
{
    primary
        .into_iter()
        .chain(tags.iter())
        .filter_map(|t| extract(t))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn supports_matches_configured_extensions_case_insensitive() {
        let ex = LoftyExtractor::new(&LibrarySettings::default());
        assert!(ex.supports(Path::new("/tmp/a.mp3")));
        assert!(ex.supports(Path::new("/tmp/a.MP3")));
        assert!(ex.supports(Path::new("/tmp/a.flac")));
        assert!(ex.supports(Path::new("/tmp/a.ogg")));
        assert!(!ex.supports(Path::new("/tmp/a.txt")));
        assert!(!ex.supports(Path::new("/tmp/a")));
    }

    #[test]
    fn supports_normalizes_dotted_extensions() {
        let settings = LibrarySettings {
            extensions: vec![".MP3".into(), "  ".into()],
            ..LibrarySettings::default()
        };
        let ex = LoftyExtractor::new(&settings);
        assert!(ex.supports(Path::new("song.mp3")));
        assert!(!ex.supports(Path::new("song.flac")));
    }

    #[test]
    fn probe_reports_missing_file_as_extraction_failure() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("gone.mp3");

        let ex = LoftyExtractor::new(&LibrarySettings::default());
        match ex.probe(&p) {
            Err(Error::ExtractionFailed { path, .. }) => assert_eq!(path, p),
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }
}
