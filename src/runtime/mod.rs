use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{debug, info, warn};

use crate::audio::RodioDecoder;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::library::LibraryRegistry;
use crate::playback::{PlaybackController, PlaybackOptions};
use crate::selector::Selector;

mod event_loop;
mod keymap;
mod settings;

use keymap::Keymap;
pub use settings::load_settings;

/// Play `name` until the user quits.
///
/// With `refresh`, the library is rescanned on a background thread while it
/// plays; the rescan is cancelled if the session ends first.
pub fn play(registry: &LibraryRegistry, name: &str, settings: &Settings, refresh: bool) -> Result<()> {
    let library = registry.get(name)?;
    if library.read().is_empty() {
        return Err(Error::EmptyLibrary(name.to_string()));
    }
    let keymap = Keymap::new(&settings.controls).map_err(Error::Config)?;

    let (decode_tx, decode_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let decoder = RodioDecoder::new(
        decode_tx,
        Duration::from_millis(settings.playback.fade_out_ms),
    );
    let mut controller = PlaybackController::new(library.clone(), decoder, event_tx)
        .with_selector(Selector::new(&settings.selection))
        .with_options(PlaybackOptions::from(&settings.playback));

    println!(
        "Playing \"{}\" ({} tracks). Keys: {}",
        controller.session().library_name,
        library.read().len(),
        keymap.help()
    );

    let cancel = AtomicBool::new(false);
    thread::scope(|scope| {
        if refresh {
            let (library, cancel) = (&library, &cancel);
            scope.spawn(move || match library.update(registry.scanner(), Some(cancel)) {
                Ok(report) => info!(
                    "refreshed \"{}\": {} added, {} removed",
                    library.name(),
                    report.added,
                    report.removed
                ),
                Err(Error::ScanInterrupted(_)) => debug!("refresh cancelled"),
                Err(e) => warn!("refresh of \"{}\" failed: {e}", library.name()),
            });
        }

        let result = enable_raw_mode().map_err(Error::Terminal).and_then(|()| {
            let result = event_loop::run(
                &mut controller,
                event_loop::Inbox {
                    decode: &decode_rx,
                    player: &event_rx,
                },
                &keymap,
                &settings.ui,
            );
            let restored = disable_raw_mode().map_err(Error::Terminal);
            let _ = io::stdout().flush();
            result.and(restored)
        });
        cancel.store(true, Ordering::Relaxed);
        result
    })
}
