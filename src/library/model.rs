use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::metadata::TrackMetadata;

/// One indexed audio file with its metadata and play history.
///
/// Plain values come before `duration` and `last_played` so the TOML
/// encoder can emit them ahead of the nested tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub favourite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<SystemTime>,
}

impl Track {
    /// A track with no play history.
    pub fn new(path: PathBuf, meta: TrackMetadata) -> Self {
        Self {
            path,
            title: meta.title,
            artist: meta.artist,
            album: meta.album,
            genre: meta.genre,
            play_count: 0,
            favourite: false,
            duration: meta.duration.filter(|d| !d.is_zero()),
            last_played: None,
        }
    }

    /// Title tag, or the file stem when the file carries none.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => file_stem(&self.path),
        }
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}
