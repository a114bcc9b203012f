//! Opening and decoding a file into a `rodio` sink.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink};

use crate::error::{Error, Result};

/// Create a paused `Sink` for the file at `path`.
pub(super) fn open_sink(stream: &OutputStream, path: &Path) -> Result<Sink> {
    let failed = |reason: String| Error::DecodeFailed {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| failed(e.to_string()))?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| failed(e.to_string()))?;

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
