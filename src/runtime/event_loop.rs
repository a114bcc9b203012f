use std::io::{self, Write};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tracing::warn;

use crate::config::UiSettings;
use crate::error::{Error, Result};
use crate::library::{Track, display_from_fields, format_duration};
use crate::playback::{DecodeEvent, Decoder, PlaybackController, PlaybackState, PlayerEvent};

use super::keymap::{Action, Keymap};

/// Channels the loop drains on every iteration.
pub(super) struct Inbox<'a> {
    pub decode: &'a Receiver<DecodeEvent>,
    pub player: &'a Receiver<PlayerEvent>,
}

/// Play until the user quits or the session cannot continue.
///
/// Expects the terminal to be in raw mode, so every status line ends with
/// `\r\n`.
pub(super) fn run<D: Decoder>(
    controller: &mut PlaybackController<D>,
    inbox: Inbox<'_>,
    keymap: &Keymap,
    ui: &UiSettings,
) -> Result<()> {
    let mut out = io::stdout();
    let started = controller.start();
    flush_events(&mut out, inbox.player, ui)?;
    started?;

    loop {
        while let Ok(ev) = inbox.decode.try_recv() {
            let handled = controller.handle_decode_event(ev);
            flush_events(&mut out, inbox.player, ui)?;
            report(&mut out, handled)?;
        }

        if controller.state() == PlaybackState::Stopped {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(50)).map_err(Error::Terminal)? {
            continue;
        }
        let Event::Key(key) = event::read().map_err(Error::Terminal)? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match keymap.action(&key) {
            Some(Action::Quit) => {
                let stopped = controller.stop();
                flush_events(&mut out, inbox.player, ui)?;
                return stopped;
            }
            Some(Action::Command(cmd)) => {
                let handled = controller.dispatch(cmd);
                flush_events(&mut out, inbox.player, ui)?;
                report(&mut out, handled)?;
            }
            None => {}
        }
    }
}

/// Errors that end the session are returned; the rest are shown and playback
/// carries on.
fn report(out: &mut impl Write, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ (Error::DecodeFailed { .. } | Error::EmptyLibrary(_))) => Err(e),
        Err(e) => {
            warn!("{e}");
            line(out, &format!("! {e}"))
        }
    }
}

fn flush_events(out: &mut impl Write, events: &Receiver<PlayerEvent>, ui: &UiSettings) -> Result<()> {
    for ev in events.try_iter() {
        line(out, &describe(&ev, ui))?;
    }
    Ok(())
}

fn line(out: &mut impl Write, text: &str) -> Result<()> {
    write!(out, "{text}\r\n")
        .and_then(|()| out.flush())
        .map_err(Error::Console)
}

/// Status line for a controller event.
pub(super) fn describe(event: &PlayerEvent, ui: &UiSettings) -> String {
    let show = |t: &Track| display_from_fields(t, &ui.now_playing_fields, &ui.now_playing_separator);
    match event {
        PlayerEvent::TrackStarted(t) => {
            let mut s = format!("Now playing: {}", show(t));
            if let Some(d) = t.duration {
                s.push_str(&format!(" [{}]", format_duration(d)));
            }
            if t.favourite {
                s.push_str(" *");
            }
            s
        }
        PlayerEvent::Paused => "Paused".to_string(),
        PlayerEvent::Resumed => "Resumed".to_string(),
        PlayerEvent::FavouriteToggled(t) if t.favourite => {
            format!("Added {} to favourites", show(t))
        }
        PlayerEvent::FavouriteToggled(t) => format!("Removed {} from favourites", show(t)),
        PlayerEvent::TrackUnplayable { path, reason } => {
            format!("Skipping {}: {reason}", path.display())
        }
        PlayerEvent::Stopped => "Stopped".to_string(),
    }
}
