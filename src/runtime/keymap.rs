//! Key bindings for the `play` loop.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::ControlsSettings;
use crate::playback::PlayerCmd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Command(PlayerCmd),
    Quit,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<Binding>,
}

#[derive(Debug, Clone)]
struct Binding {
    key: KeyCode,
    label: String,
    action: Action,
    what: &'static str,
}

impl Keymap {
    pub fn new(controls: &ControlsSettings) -> Result<Self, String> {
        let wanted = [
            (&controls.play_pause, Action::Command(PlayerCmd::PlayPause), "play/pause"),
            (&controls.skip, Action::Command(PlayerCmd::Skip), "skip"),
            (&controls.favourite, Action::Command(PlayerCmd::ToggleFavourite), "favourite"),
            (&controls.quit, Action::Quit, "quit"),
        ];

        let mut bindings: Vec<Binding> = Vec::with_capacity(wanted.len());
        for (label, action, what) in wanted {
            let key = parse_key(label)?;
            if let Some(other) = bindings.iter().find(|b| b.key == key) {
                return Err(format!(
                    "controls: \"{label}\" is bound to both {} and {what}",
                    other.what
                ));
            }
            bindings.push(Binding {
                key,
                label: label.trim().to_string(),
                action,
                what,
            });
        }
        Ok(Self { bindings })
    }

    /// The action bound to `key`. Ctrl-C always quits.
    pub fn action(&self, key: &KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return (key.code == KeyCode::Char('c')).then_some(Action::Quit);
        }
        self.bindings
            .iter()
            .find(|b| b.key == key.code)
            .map(|b| b.action)
    }

    /// One-line summary such as `space play/pause, n skip`.
    pub fn help(&self) -> String {
        self.bindings
            .iter()
            .map(|b| format!("{} {}", b.label, b.what))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse a binding: a single character or a named key.
pub fn parse_key(s: &str) -> Result<KeyCode, String> {
    let s = s.trim();
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(c));
    }
    let code = match s.to_ascii_lowercase().as_str() {
        "space" => KeyCode::Char(' '),
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        _ => return Err(format!("controls: unknown key \"{s}\"")),
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn parses_named_and_single_char_keys() {
        assert_eq!(parse_key("space"), Ok(KeyCode::Char(' ')));
        assert_eq!(parse_key(" Enter "), Ok(KeyCode::Enter));
        assert_eq!(parse_key("right"), Ok(KeyCode::Right));
        assert_eq!(parse_key("N"), Ok(KeyCode::Char('N')));
        assert!(parse_key("").is_err());
        assert!(parse_key("ctrl+x").is_err());
    }

    #[test]
    fn default_bindings_map_to_commands() {
        let keymap = Keymap::new(&ControlsSettings::default()).unwrap();
        assert_eq!(
            keymap.action(&press(KeyCode::Char(' '))),
            Some(Action::Command(PlayerCmd::PlayPause))
        );
        assert_eq!(
            keymap.action(&press(KeyCode::Char('n'))),
            Some(Action::Command(PlayerCmd::Skip))
        );
        assert_eq!(
            keymap.action(&press(KeyCode::Char('f'))),
            Some(Action::Command(PlayerCmd::ToggleFavourite))
        );
        assert_eq!(keymap.action(&press(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(keymap.action(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_quits_and_other_chords_are_ignored() {
        let keymap = Keymap::new(&ControlsSettings::default()).unwrap();
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(keymap.action(&ctrl('c')), Some(Action::Quit));
        assert_eq!(keymap.action(&ctrl('n')), None);
    }

    #[test]
    fn duplicate_bindings_are_rejected() {
        let controls = ControlsSettings {
            skip: "q".to_string(),
            ..ControlsSettings::default()
        };
        let err = Keymap::new(&controls).unwrap_err();
        assert!(err.contains("skip") && err.contains("quit"), "{err}");
    }

    #[test]
    fn help_lists_bindings_in_order() {
        let keymap = Keymap::new(&ControlsSettings::default()).unwrap();
        assert_eq!(keymap.help(), "space play/pause, n skip, f favourite, q quit");
    }
}
