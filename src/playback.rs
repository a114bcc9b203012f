//! Playback sequencing: ties the selector, the decode backend and the
//! library's play history together.

mod clock;
mod controller;
mod types;

pub use clock::{Clock, SystemClock};
pub use controller::{PlaybackController, PlaybackOptions};
pub use types::{
    DecodeEvent, DecodeHandle, Decoder, PlaybackSession, PlaybackState, PlayerCmd, PlayerEvent,
};
