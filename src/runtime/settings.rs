use std::path::Path;

use tracing::warn;

use crate::config;

use super::keymap::Keymap;

/// Load settings for `home`, falling back to defaults when the file or the
/// environment holds something unusable.
pub fn load_settings(home: Option<&Path>) -> config::Settings {
    match config::Settings::load(home) {
        Ok(s) => {
            let checked = s
                .validate()
                .and_then(|()| Keymap::new(&s.controls).map(drop));
            if let Err(msg) = checked {
                warn!("invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            warn!("failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
