use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::MediaError;

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, Playback, PlaybackHandle, PlaybackInfo};

/// `Playback` backed by a rodio sink living on its own thread.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    playback: PlaybackHandle,
    join: Option<JoinHandle<()>>,
}

impl AudioPlayer {
    pub fn spawn() -> Result<Self, MediaError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let audio_handle = spawn_audio_thread(rx, playback_info.clone())
            .map_err(|e| MediaError::OutputUnavailable(e.to_string()))?;

        Ok(Self {
            tx,
            playback: playback_info,
            join: Some(audio_handle),
        })
    }

    fn send(&self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("audio thread is gone");
        }
    }

    fn info<T>(&self, f: impl FnOnce(&PlaybackInfo) -> T) -> Option<T> {
        self.playback.lock().ok().map(|info| f(&info))
    }
}

fn thread_gone() -> MediaError {
    MediaError::OutputUnavailable("audio thread stopped".into())
}

impl Playback for AudioPlayer {
    fn load(&mut self, path: &Path) -> Result<(), MediaError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(AudioCmd::Load {
                path: path.to_path_buf(),
                reply,
            })
            .map_err(|_| thread_gone())?;
        rx.recv().map_err(|_| thread_gone())?.map(|_| ())
    }

    fn play(&mut self) {
        self.send(AudioCmd::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn stop(&mut self) {
        self.send(AudioCmd::Stop);
    }

    fn duration(&self) -> Option<Duration> {
        self.info(|i| i.duration).flatten()
    }

    fn set_time(&mut self, to: Duration) -> Result<(), MediaError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(AudioCmd::Seek { to, reply })
            .map_err(|_| thread_gone())?;
        rx.recv().map_err(|_| thread_gone())?
    }

    fn time(&self) -> Duration {
        self.info(|i| i.elapsed).unwrap_or(Duration::ZERO)
    }

    fn is_done(&self) -> bool {
        self.info(|i| i.finished).unwrap_or(false)
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCmd::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}
