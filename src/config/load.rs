use std::{env, path::PathBuf};

use super::schema::Settings;

const CONFIG_FILE: &str = "config.toml";

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then environment variables
/// (prefix `REPRISE__`), and falls back to struct defaults.
impl Settings {
    /// Load settings from the config file under `home` and the environment.
    pub fn load(home: Option<&std::path::Path>) -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path(home);

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("REPRISE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let w = self.selection.favourite_weight;
        if !w.is_finite() || w < 0.0 {
            return Err("selection.favourite_weight must be a finite number >= 0".to_string());
        }
        let b = self.selection.recency_bias;
        if !(0.0..=1.0).contains(&b) {
            return Err("selection.recency_bias must be between 0.0 and 1.0".to_string());
        }
        if self
            .library
            .extensions
            .iter()
            .all(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err("library.extensions must name at least one extension".to_string());
        }
        Ok(())
    }
}

/// Resolve the config file from `REPRISE_CONFIG_PATH`, or `config.toml` in the
/// configuration home.
pub fn resolve_config_path(home: Option<&std::path::Path>) -> Option<PathBuf> {
    if let Some(p) = env::var_os("REPRISE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    match home {
        Some(h) => Some(h.join(CONFIG_FILE)),
        None => resolve_home().map(|h| h.join(CONFIG_FILE)),
    }
}

/// Resolve the configuration home from `REPRISE_HOME` or XDG defaults.
pub fn resolve_home() -> Option<PathBuf> {
    if let Some(p) = env::var_os("REPRISE_HOME") {
        return Some(PathBuf::from(p));
    }
    default_home()
}

/// Compute the default home `$XDG_CONFIG_HOME/reprise` or `~/.config/reprise`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_home() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("reprise"))
}
