use std::time::Duration;

use crate::config::TrackDisplayField;

use super::model::Track;

/// Build a display string for `track` according to the provided `fields` and separator.
///
/// This composes metadata fields (artist, title, album, genre, filename, path)
/// in the configured order and falls back to the display title when no parts
/// were produced.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    let non_empty = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    for f in fields {
        match f {
            TrackDisplayField::Title => parts.push(track.display_title()),
            TrackDisplayField::Artist => parts.extend(non_empty(track.artist.as_deref())),
            TrackDisplayField::Album => parts.extend(non_empty(track.album.as_deref())),
            TrackDisplayField::Genre => parts.extend(non_empty(track.genre.as_deref())),
            TrackDisplayField::Filename => {
                if let Some(name) = track.path.file_name().and_then(|s| s.to_str()) {
                    parts.push(name.to_string());
                }
            }
            TrackDisplayField::Path => parts.push(track.path.display().to_string()),
        }
    }

    if parts.is_empty() {
        track.display_title()
    } else {
        parts.join(sep)
    }
}

/// Format a duration as `m:ss`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64().round() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}
