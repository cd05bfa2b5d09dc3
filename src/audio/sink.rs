//! Utilities for creating `rodio` sinks from files on disk.
//!
//! Opening/decoding is split from sink creation so decode failures can be
//! reported without an output device.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use rodio::source::SkipDuration;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::MediaError;

pub(super) type FileSource = SkipDuration<Decoder<BufReader<File>>>;

/// Decode `path` and skip to `start_at`. Also returns the full clip length.
pub(super) fn open_source(
    path: &Path,
    start_at: Duration,
) -> Result<(FileSource, Option<Duration>), MediaError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MediaError::Missing(path.to_path_buf()),
        _ => MediaError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| MediaError::Unsupported {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let total = decoder.total_duration();
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    Ok((decoder.skip_duration(start_at), total))
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    handle: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), MediaError> {
    let (source, total) = open_source(path, start_at)?;
    let sink = Sink::connect_new(handle.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}
