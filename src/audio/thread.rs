use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, warn};

use crate::error::Error;
use crate::playback::{DecodeEvent, DecodeHandle};

use super::sink::open_sink;
use super::types::AudioCmd;

/// How often the thread checks whether the current sink ran dry.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct Current {
    handle: DecodeHandle,
    sink: Sink,
    paused: bool,
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: Sender<DecodeEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        // Without an output device every start request fails.
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the stream is dropped, which would
                // garble the raw-mode terminal.
                stream.log_on_drop(false);
                Ok(stream)
            }
            Err(e) => {
                warn!("no audio output device: {e}");
                Err(format!("no audio output device: {e}"))
            }
        };

        let mut current: Option<Current> = None;
        let send = |event: DecodeEvent| {
            let _ = events.send(event);
        };

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(AudioCmd::Start { handle, path }) => {
                    if let Some(old) = current.take() {
                        old.sink.stop();
                    }
                    match start(&stream, &path) {
                        Ok(sink) => {
                            debug!("decoding {} as #{handle}", path.display());
                            current = Some(Current {
                                handle,
                                sink,
                                paused: false,
                            });
                        }
                        Err(reason) => send(DecodeEvent::Failed { handle, reason }),
                    }
                }
                Ok(AudioCmd::Pause(handle)) => {
                    if let Some(c) = current.as_mut().filter(|c| c.handle == handle) {
                        c.sink.pause();
                        c.paused = true;
                    }
                }
                Ok(AudioCmd::Resume(handle)) => {
                    if let Some(c) = current.as_mut().filter(|c| c.handle == handle) {
                        c.sink.play();
                        c.paused = false;
                    }
                }
                Ok(AudioCmd::Cancel(handle)) => {
                    if current.as_ref().is_some_and(|c| c.handle == handle) {
                        if let Some(c) = current.take() {
                            c.sink.stop();
                        }
                    }
                }
                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    if let Some(c) = current.take() {
                        if !c.paused {
                            fade_out_sink(&c.sink, fade_out_ms);
                        }
                        c.sink.stop();
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let finished = current.as_ref().is_some_and(|c| !c.paused && c.sink.empty());
                    if finished {
                        if let Some(c) = current.take() {
                            send(DecodeEvent::Finished(c.handle));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

fn start(stream: &Result<OutputStream, String>, path: &Path) -> Result<Sink, String> {
    let stream = stream.as_ref().map_err(Clone::clone)?;
    let sink = open_sink(stream, path).map_err(|e| match e {
        Error::DecodeFailed { reason, .. } => reason,
        other => other.to_string(),
    })?;
    sink.play();
    Ok(sink)
}

fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    let from = sink.volume();
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
