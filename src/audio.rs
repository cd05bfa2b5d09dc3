//! Audio collaborator: a single-clip player behind the `Playback` trait.
//!
//! `AudioPlayer` owns a dedicated thread holding the rodio output stream and
//! sink. Callers talk to it with `AudioCmd` messages; elapsed time and the
//! end-of-clip flag come back through a shared `PlaybackHandle`.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPlayer;
pub use types::{Playback, PlaybackHandle, PlaybackInfo, PlaybackState};
