//! The `rodio` decode backend.
//!
//! Audio runs on its own thread: transport commands go in over a channel,
//! and [`DecodeEvent`](crate::playback::DecodeEvent)s come back out when a
//! track finishes or cannot be played.

mod player;
mod sink;
mod thread;
mod types;

pub use player::RodioDecoder;
