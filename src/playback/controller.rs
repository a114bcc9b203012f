use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::PlaybackSettings;
use crate::error::{Error, Result};
use crate::library::{Library, Track};
use crate::selector::Selector;

use super::clock::{Clock, SystemClock};
use super::types::{
    DecodeEvent, DecodeHandle, Decoder, PlaybackSession, PlaybackState, PlayerCmd, PlayerEvent,
};

#[derive(Debug, Clone, Copy)]
pub struct PlaybackOptions {
    /// Skipped or stopped tracks count as played only past this point.
    pub min_played: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::from(&PlaybackSettings::default())
    }
}

impl From<&PlaybackSettings> for PlaybackOptions {
    fn from(s: &PlaybackSettings) -> Self {
        Self {
            min_played: Duration::from_secs(s.min_played_secs),
        }
    }
}

/// The track currently handed to the decoder.
struct NowPlaying {
    handle: DecodeHandle,
    path: PathBuf,
    /// `None` while paused.
    started_at: Option<Instant>,
    accumulated: Duration,
}

/// Sequences selections with transport commands and records play history.
///
/// States: `Idle -> Playing <-> Paused`, and any state `-> Stopped`. A
/// stopped session can be started again.
pub struct PlaybackController<D: Decoder> {
    library: Library,
    selector: Selector,
    rng: StdRng,
    decoder: D,
    clock: Box<dyn Clock>,
    options: PlaybackOptions,
    session: PlaybackSession,
    now_playing: Option<NowPlaying>,
    /// Tracks that failed to decode since the session was started.
    unplayable: HashSet<PathBuf>,
    events: Sender<PlayerEvent>,
}

impl<D: Decoder> PlaybackController<D> {
    pub fn new(library: Library, decoder: D, events: Sender<PlayerEvent>) -> Self {
        let session = PlaybackSession {
            library_name: library.name().to_string(),
            current_track: None,
            state: PlaybackState::Idle,
        };
        Self {
            library,
            selector: Selector::default(),
            rng: entropy_rng(),
            decoder,
            clock: Box::new(SystemClock),
            options: PlaybackOptions::default(),
            session,
            now_playing: None,
            unplayable: HashSet::new(),
            events,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.current_track.as_ref()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Play time of the current track, excluding paused stretches.
    pub fn elapsed(&self) -> Duration {
        self.now_playing.as_ref().map_or(Duration::ZERO, |np| {
            np.accumulated
                + np.started_at
                    .map_or(Duration::ZERO, |s| self.clock.now().saturating_duration_since(s))
        })
    }

    pub fn dispatch(&mut self, cmd: PlayerCmd) -> Result<()> {
        match cmd {
            PlayerCmd::PlayPause => match self.session.state {
                PlaybackState::Idle | PlaybackState::Stopped => self.start().map(drop),
                PlaybackState::Playing => {
                    self.pause();
                    Ok(())
                }
                PlaybackState::Paused => {
                    self.resume();
                    Ok(())
                }
            },
            PlayerCmd::Pause => {
                self.pause();
                Ok(())
            }
            PlayerCmd::Resume => {
                self.resume();
                Ok(())
            }
            PlayerCmd::Skip => self.skip().map(drop),
            PlayerCmd::ToggleFavourite => self.toggle_favourite().map(drop),
            PlayerCmd::Stop => self.stop(),
        }
    }

    /// Pick a track and start playing it. Already playing or paused sessions
    /// are left alone.
    pub fn start(&mut self) -> Result<Track> {
        if matches!(
            self.session.state,
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            if let Some(track) = &self.session.current_track {
                return Ok(track.clone());
            }
        }
        self.unplayable.clear();
        self.advance(None)
    }

    pub fn pause(&mut self) {
        if self.session.state != PlaybackState::Playing {
            return;
        }
        let now = self.clock.now();
        if let Some(np) = self.now_playing.as_mut() {
            if let Some(started) = np.started_at.take() {
                np.accumulated += now.saturating_duration_since(started);
            }
            self.decoder.pause(np.handle);
        }
        self.session.state = PlaybackState::Paused;
        self.emit(PlayerEvent::Paused);
    }

    pub fn resume(&mut self) {
        if self.session.state != PlaybackState::Paused {
            return;
        }
        let now = self.clock.now();
        if let Some(np) = self.now_playing.as_mut() {
            np.started_at = Some(now);
            self.decoder.resume(np.handle);
        }
        self.session.state = PlaybackState::Playing;
        self.emit(PlayerEvent::Resumed);
    }

    /// Move on to another track. Returns `None` when nothing was playing.
    pub fn skip(&mut self) -> Result<Option<Track>> {
        if !matches!(
            self.session.state,
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            return Ok(None);
        }
        let (last, recorded) = self.finish_current(false);
        let next = self.advance(last.as_deref());
        recorded?;
        next.map(Some)
    }

    pub fn toggle_favourite(&mut self) -> Result<Option<Track>> {
        let Some(path) = self.session.current_track.as_ref().map(|t| t.path.clone()) else {
            return Ok(None);
        };
        let track = self.library.toggle_favourite(&path)?;
        self.session.current_track = Some(track.clone());
        self.emit(PlayerEvent::FavouriteToggled(track.clone()));
        Ok(Some(track))
    }

    pub fn stop(&mut self) -> Result<()> {
        let (_, recorded) = self.finish_current(false);
        self.halt();
        recorded
    }

    /// React to a completion or failure notification from the decoder.
    ///
    /// A track that fails to decode is not picked again this session. The
    /// session stops with [`Error::DecodeFailed`] once every track has failed.
    pub fn handle_decode_event(&mut self, event: DecodeEvent) -> Result<()> {
        match event {
            DecodeEvent::Finished(handle) if self.is_current(handle) => {
                let (last, recorded) = self.finish_current(true);
                let next = self.advance(last.as_deref());
                recorded?;
                next.map(drop)
            }
            DecodeEvent::Failed { handle, reason } if self.is_current(handle) => {
                let Some(np) = self.now_playing.take() else {
                    return Ok(());
                };
                warn!("could not play {}: {reason}", np.path.display());
                self.emit(PlayerEvent::TrackUnplayable {
                    path: np.path.clone(),
                    reason: reason.clone(),
                });

                self.unplayable.insert(np.path.clone());
                let exhausted = self
                    .library
                    .read()
                    .tracks()
                    .all(|t| self.unplayable.contains(&t.path));
                if exhausted {
                    self.halt();
                    return Err(Error::DecodeFailed {
                        path: np.path,
                        reason,
                    });
                }
                self.advance(Some(&np.path)).map(drop)
            }
            other => {
                debug!("ignoring stale decode event {other:?}");
                Ok(())
            }
        }
    }

    fn is_current(&self, handle: DecodeHandle) -> bool {
        self.now_playing.as_ref().is_some_and(|np| np.handle == handle)
    }

    fn advance(&mut self, exclude: Option<&Path>) -> Result<Track> {
        let next = {
            let index = self.library.read();
            self.selector
                .next(&index, exclude, &self.unplayable, &mut self.rng)
        };
        match next {
            Some(track) => {
                self.begin(track.clone());
                Ok(track)
            }
            None => {
                self.halt();
                Err(Error::EmptyLibrary(self.session.library_name.clone()))
            }
        }
    }

    fn begin(&mut self, track: Track) {
        let handle = self.decoder.start(&track.path);
        info!("playing {}", track.path.display());
        self.now_playing = Some(NowPlaying {
            handle,
            path: track.path.clone(),
            started_at: Some(self.clock.now()),
            accumulated: Duration::ZERO,
        });
        self.session.current_track = Some(track.clone());
        self.session.state = PlaybackState::Playing;
        self.emit(PlayerEvent::TrackStarted(track));
    }

    /// Release the current track, recording the play when it ran to the end
    /// or past the threshold. The record result is returned separately so
    /// callers can finish their transition before reporting it.
    fn finish_current(&mut self, completed: bool) -> (Option<PathBuf>, Result<()>) {
        let elapsed = self.elapsed();
        let Some(np) = self.now_playing.take() else {
            return (None, Ok(()));
        };
        if !completed {
            self.decoder.cancel(np.handle);
        }
        if !completed && elapsed < self.options.min_played {
            debug!(
                "not counting {} after {:?}",
                np.path.display(),
                elapsed
            );
            return (Some(np.path), Ok(()));
        }

        let recorded = match self.library.record_played(&np.path, self.clock.wall_time()) {
            Ok(_) => Ok(()),
            Err(Error::TrackNotFound(path)) => {
                warn!("{} left the library while playing", path.display());
                Ok(())
            }
            Err(e) => Err(e),
        };
        (Some(np.path), recorded)
    }

    fn halt(&mut self) {
        if let Some(np) = self.now_playing.take() {
            self.decoder.cancel(np.handle);
        }
        self.session.current_track = None;
        if self.session.state != PlaybackState::Stopped {
            self.session.state = PlaybackState::Stopped;
            self.emit(PlayerEvent::Stopped);
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }
}

/// A `StdRng` seeded from OS entropy, or from the clock if that is unavailable.
fn entropy_rng() -> StdRng {
    let mut seed = [0u8; 32];
    if let Err(e) = getrandom::fill(&mut seed) {
        warn!("no OS entropy ({e}), seeding selection from the clock");
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        return StdRng::seed_from_u64(nanos);
    }
    StdRng::from_seed(seed)
}
