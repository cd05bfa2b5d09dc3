use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use crate::error::MediaError;

use super::sink::create_sink_at;
use super::types::{AudioCmd, PlaybackHandle, PlaybackInfo};

/// The clip currently owned by the audio thread.
struct Loaded {
    sink: Sink,
    path: PathBuf,
    /// Offset of the sink's start within the file, after a seek.
    base: Duration,
}

fn update(playback_info: &PlaybackHandle, f: impl FnOnce(&mut PlaybackInfo)) {
    // A poisoned lock only means a reader panicked; skip the update.
    if let Ok(mut info) = playback_info.lock() {
        f(&mut info);
    }
}

fn unload(current: &mut Option<Loaded>, playback_info: &PlaybackHandle) {
    if let Some(loaded) = current.take() {
        loaded.sink.stop();
    }
    update(playback_info, |info| *info = PlaybackInfo::default());
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    playback_info: PlaybackHandle,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("vinyl-audio".into())
        .spawn(move || {
            let stream: Option<OutputStream> = match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    // rodio logs to stderr when OutputStream is dropped. That's useful in
                    // debugging, but noisy for a TUI app.
                    stream.log_on_drop(false);
                    Some(stream)
                }
                Err(e) => {
                    error!(error = %e, "no audio output device");
                    None
                }
            };

            let mut current: Option<Loaded> = None;

            loop {
                match rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(AudioCmd::Load { path, reply }) => {
                        unload(&mut current, &playback_info);
                        let result = match stream.as_ref() {
                            Some(stream) => create_sink_at(stream, &path, Duration::ZERO),
                            None => Err(MediaError::OutputUnavailable(
                                "no audio output device".into(),
                            )),
                        };
                        let reply_value = match result {
                            Ok((sink, duration)) => {
                                debug!(path = %path.display(), "loaded clip");
                                update(&playback_info, |info| {
                                    info.loaded = Some(path.clone());
                                    info.duration = duration;
                                });
                                current = Some(Loaded {
                                    sink,
                                    path,
                                    base: Duration::ZERO,
                                });
                                Ok(duration)
                            }
                            Err(e) => {
                                warn!(error = %e, "load failed");
                                Err(e)
                            }
                        };
                        let _ = reply.send(reply_value);
                    }

                    Ok(AudioCmd::Play) => {
                        if let Some(loaded) = current.as_ref() {
                            loaded.sink.play();
                            update(&playback_info, |info| info.playing = true);
                        }
                    }

                    Ok(AudioCmd::Pause) => {
                        if let Some(loaded) = current.as_ref() {
                            loaded.sink.pause();
                            update(&playback_info, |info| info.playing = false);
                        }
                    }

                    Ok(AudioCmd::Stop) => unload(&mut current, &playback_info),

                    Ok(AudioCmd::Seek { to, reply }) => {
                        // Scrubbing: rebuild the current sink and skip into the file.
                        let result = match (current.take(), stream.as_ref()) {
                            (Some(old), Some(stream)) => {
                                let paused = old.sink.is_paused();
                                old.sink.stop();
                                match create_sink_at(stream, &old.path, to) {
                                    Ok((sink, _)) => {
                                        if !paused {
                                            sink.play();
                                        }
                                        current = Some(Loaded {
                                            sink,
                                            path: old.path,
                                            base: to,
                                        });
                                        update(&playback_info, |info| {
                                            info.elapsed = to;
                                            info.finished = false;
                                        });
                                        Ok(())
                                    }
                                    Err(e) => {
                                        unload(&mut current, &playback_info);
                                        Err(e)
                                    }
                                }
                            }
                            (None, _) => Ok(()),
                            (Some(_), None) => Err(MediaError::OutputUnavailable(
                                "no audio output device".into(),
                            )),
                        };
                        let _ = reply.send(result);
                    }

                    Ok(AudioCmd::Quit) => {
                        unload(&mut current, &playback_info);
                        break;
                    }

                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(loaded) = current.as_ref() {
                            let elapsed = loaded.base + loaded.sink.get_pos();
                            let finished = loaded.sink.empty();
                            update(&playback_info, |info| {
                                info.elapsed = elapsed;
                                info.finished = finished;
                                if finished {
                                    info.playing = false;
                                }
                            });
                        }
                    }

                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
}
