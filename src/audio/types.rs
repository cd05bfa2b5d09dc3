//! Audio-related small types and handles.
//!
//! This module defines the `Playback` seam the engines drive, the commands
//! sent to the audio thread and the playback info it shares back.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::MediaError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

/// A single-clip player. Loading a new clip replaces the current one.
pub trait Playback {
    /// Open and decode `path`, leaving it paused at the start.
    fn load(&mut self, path: &Path) -> Result<(), MediaError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Length of the loaded clip, when the decoder knows it.
    fn duration(&self) -> Option<Duration>;
    fn set_time(&mut self, to: Duration) -> Result<(), MediaError>;
    fn time(&self) -> Duration;
    /// Whether the loaded clip has played to its end.
    fn is_done(&self) -> bool;
}

#[derive(Debug)]
pub(super) enum AudioCmd {
    /// Replace the current clip with the file at `path`.
    Load {
        path: PathBuf,
        reply: Sender<Result<Option<Duration>, MediaError>>,
    },
    Play,
    Pause,
    /// Stop and unload the current clip.
    Stop,
    /// Restart the current clip at `to`.
    Seek {
        to: Duration,
        reply: Sender<Result<(), MediaError>>,
    },
    /// Quit the audio thread.
    Quit,
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// File of the loaded clip (if any).
    pub loaded: Option<PathBuf>,
    /// Length of the loaded clip, if known.
    pub duration: Option<Duration>,
    /// Elapsed playback time for the current clip.
    pub elapsed: Duration,
    /// Whether playback is currently active.
    pub playing: bool,
    /// Set once the clip has run out of samples.
    pub finished: bool,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
