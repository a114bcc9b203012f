//! Playback-related small types: states, commands, events and the decode
//! collaborator interface.

use std::path::{Path, PathBuf};

use crate::library::Track;

/// The playback state of a session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Ephemeral state of one `play` invocation.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub library_name: String,
    pub current_track: Option<Track>,
    pub state: PlaybackState,
}

/// Transport commands issued by the front end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayerCmd {
    /// Start when idle, otherwise toggle pause/resume.
    PlayPause,
    Pause,
    Resume,
    Skip,
    ToggleFavourite,
    Stop,
}

/// What the controller reports back to the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackStarted(Track),
    Paused,
    Resumed,
    FavouriteToggled(Track),
    /// Decoding failed; the session moved on to another track.
    TrackUnplayable { path: PathBuf, reason: String },
    Stopped,
}

/// Identifies one decode request so stale notifications can be ignored.
pub type DecodeHandle = u64;

/// Asynchronous notifications from the decode collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    Finished(DecodeHandle),
    Failed { handle: DecodeHandle, reason: String },
}

/// The out-of-thread audio backend.
///
/// Calls never block on playback; completion and failure arrive later as
/// [`DecodeEvent`]s. Cancelling or pausing an unknown handle is a no-op.
pub trait Decoder {
    fn start(&mut self, path: &Path) -> DecodeHandle;
    fn pause(&mut self, handle: DecodeHandle);
    fn resume(&mut self, handle: DecodeHandle);
    fn cancel(&mut self, handle: DecodeHandle);
}
