//! Commands understood by the audio thread.

use std::path::PathBuf;

use crate::playback::DecodeHandle;

#[derive(Debug)]
pub enum AudioCmd {
    /// Replace whatever is playing with `path`.
    Start { handle: DecodeHandle, path: PathBuf },
    Pause(DecodeHandle),
    Resume(DecodeHandle),
    /// Stop the track if it is still the current one.
    Cancel(DecodeHandle),
    /// Quit the audio thread, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}
