use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path: `<home>/config.toml`, where `<home>` is `$REPRISE_HOME`,
/// `$XDG_CONFIG_HOME/reprise` or `~/.config/reprise`.
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `REPRISE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub selection: SelectionSettings,
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Weight multiplier applied to favourite tracks. 1.0 leaves them alone.
    pub favourite_weight: f64,
    /// How strongly recently played tracks are held back among otherwise
    /// equal candidates, from 0.0 (ignored) to 1.0.
    pub recency_bias: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            favourite_weight: 1.0,
            recency_bias: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// A skipped or stopped track only counts as played after this many seconds.
    pub min_played_secs: u64,
    /// Fade-out applied to the playing track when the player quits.
    pub fade_out_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            min_played_secs: 30,
            fade_out_ms: 250,
        }
    }
}

/// Key bindings for the `play` command.
///
/// Each value is a single character or one of `space`, `enter`, `esc`,
/// `tab`, `left`, `right`, `up`, `down`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    pub play_pause: String,
    pub skip: String,
    pub favourite: String,
    pub quit: String,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            play_pause: "space".to_string(),
            skip: "n".to_string(),
            favourite: "f".to_string(),
            quit: "q".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Which track fields to show when a track starts, and in what order.
    ///
    /// Example: ["artist", "title", "album"]
    pub now_playing_fields: Vec<TrackDisplayField>,
    /// Separator used to join `now_playing_fields`.
    pub now_playing_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            now_playing_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            now_playing_separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    Genre,
    Filename,
    Path,
}
