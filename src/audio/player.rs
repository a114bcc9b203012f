use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::playback::{DecodeEvent, DecodeHandle, Decoder};

use super::thread::spawn_audio_thread;
use super::types::AudioCmd;

/// [`Decoder`] backed by a `rodio` sink on a dedicated thread.
///
/// Completion and failure are reported on the channel given to [`new`].
///
/// [`new`]: RodioDecoder::new
pub struct RodioDecoder {
    tx: Sender<AudioCmd>,
    next_handle: DecodeHandle,
    fade_out: Duration,
    join: Option<JoinHandle<()>>,
}

impl RodioDecoder {
    pub fn new(events: Sender<DecodeEvent>, fade_out: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let join = spawn_audio_thread(rx, events);
        Self {
            tx,
            next_handle: 0,
            fade_out,
            join: Some(join),
        }
    }

    fn send(&self, cmd: AudioCmd) {
        // Fails only once the thread has quit.
        let _ = self.tx.send(cmd);
    }
}

impl Decoder for RodioDecoder {
    fn start(&mut self, path: &Path) -> DecodeHandle {
        self.next_handle += 1;
        let handle = self.next_handle;
        self.send(AudioCmd::Start {
            handle,
            path: path.to_path_buf(),
        });
        handle
    }

    fn pause(&mut self, handle: DecodeHandle) {
        self.send(AudioCmd::Pause(handle));
    }

    fn resume(&mut self, handle: DecodeHandle) {
        self.send(AudioCmd::Resume(handle));
    }

    fn cancel(&mut self, handle: DecodeHandle) {
        self.send(AudioCmd::Cancel(handle));
    }
}

impl Drop for RodioDecoder {
    fn drop(&mut self) {
        self.send(AudioCmd::Quit {
            fade_out_ms: self.fade_out.as_millis() as u64,
        });
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
