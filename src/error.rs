//! Error types shared by the library index, selector and playback engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No library is registered under this name.
    #[error("Library \"{0}\" does not exist!")]
    LibraryNotFound(String),

    /// The path is not indexed by the library.
    #[error("Track not found: {}", .0.display())]
    TrackNotFound(PathBuf),

    #[error("Library with name {0} already exists!")]
    AlreadyExists(String),

    /// Library roots must be readable directories.
    #[error("{} is not a valid directory!", .0.display())]
    InvalidRoot(PathBuf),

    /// Library names double as file names in the configuration home.
    #[error("Invalid library name {0:?}")]
    InvalidName(String),

    /// Per-file tag read failure. Absorbed by rescans.
    #[error("Could not read metadata from {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Library \"{0}\" has no tracks to play!")]
    EmptyLibrary(String),

    #[error("Could not read or write {}: {source}", path.display())]
    PersistenceIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Library file {} is corrupted: {source}", path.display())]
    PersistenceDecode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not serialize library \"{name}\": {source}")]
    PersistenceEncode {
        name: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Library file {} has unsupported format version {found}", path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },

    /// Every track in the library failed to decode; the session gave up.
    #[error("Could not play {}: {reason}", path.display())]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("Scan of {} was interrupted", .0.display())]
    ScanInterrupted(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The library file exists but could not be loaded. The library is
    /// still listed so it can be deleted.
    #[error("Library \"{name}\" cannot be loaded: {reason}")]
    Unreadable { name: String, reason: String },

    /// The user declined a confirmation prompt.
    #[error("Delete aborted")]
    Aborted,

    /// Raw-mode terminal setup or key polling failed.
    #[error("Terminal error: {0}")]
    Terminal(#[source] io::Error),

    /// Reading a prompt answer or writing command output failed.
    #[error("Console I/O error: {0}")]
    Console(#[source] io::Error),
}

impl Error {
    pub(crate) fn persistence_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PersistenceIo {
            path: path.into(),
            source,
        }
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
