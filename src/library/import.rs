//! Bulk import: tag reading on worker threads, results applied on the
//! control thread.
//!
//! Workers only read files and send `ImportResult`s. The store is never
//! touched off the control thread. The in-flight counter is owned by the
//! batch and is settled once per path by whoever applies the results.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, error};

use crate::error::MediaError;

use super::model::TrackMetadata;
use super::scan::read_tags;

/// Reads the metadata of one file.
pub type TagReader = fn(&Path) -> Result<TrackMetadata, MediaError>;

#[derive(Debug)]
pub struct ImportResult {
    pub path: PathBuf,
    pub outcome: Result<TrackMetadata, MediaError>,
}

/// How one path ended up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Settled {
    Loaded,
    Skipped,
    Failed,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ImportTally {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What `ImportBatch::poll` found on the channel.
#[derive(Debug)]
pub enum Polled {
    Result(ImportResult),
    /// Nothing ready yet.
    Empty,
    /// Every worker is gone.
    Closed,
}

pub struct ImportBatch {
    rx: Receiver<ImportResult>,
    in_flight: usize,
    tally: ImportTally,
    announced: bool,
}

impl ImportBatch {
    pub fn spawn(paths: Vec<PathBuf>, workers: usize) -> Self {
        Self::spawn_with(paths, workers, read_tags)
    }

    /// Start `workers` threads (at least one, at most one per path) that run
    /// `reader` over `paths`.
    pub fn spawn_with(paths: Vec<PathBuf>, workers: usize, reader: TagReader) -> Self {
        let in_flight = paths.len();
        let (tx, rx) = mpsc::channel::<ImportResult>();
        let threads = workers.max(1).min(in_flight);
        let queue: Arc<Mutex<VecDeque<PathBuf>>> = Arc::new(Mutex::new(paths.into()));

        for n in 0..threads {
            let queue = queue.clone();
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("vinyl-import-{n}"))
                .spawn(move || {
                    loop {
                        let next = match queue.lock() {
                            Ok(mut q) => q.pop_front(),
                            Err(_) => None,
                        };
                        let Some(path) = next else {
                            break;
                        };
                        let outcome = reader(&path);
                        if tx.send(ImportResult { path, outcome }).is_err() {
                            break;
                        }
                    }
                });
            if let Err(e) = spawned {
                error!(error = %e, "failed to start import worker");
            }
        }
        debug!(files = in_flight, threads, "import started");

        Self {
            rx,
            in_flight,
            tally: ImportTally::default(),
            announced: false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn tally(&self) -> ImportTally {
        self.tally
    }

    /// Next result without blocking.
    pub fn poll(&self) -> Polled {
        if self.in_flight == 0 {
            return Polled::Closed;
        }
        match self.rx.try_recv() {
            Ok(result) => Polled::Result(result),
            Err(TryRecvError::Empty) => Polled::Empty,
            Err(TryRecvError::Disconnected) => Polled::Closed,
        }
    }

    /// Next result, waiting for a worker if needed.
    pub fn wait(&self) -> Polled {
        if self.in_flight == 0 {
            return Polled::Closed;
        }
        match self.rx.recv() {
            Ok(result) => Polled::Result(result),
            Err(RecvError) => Polled::Closed,
        }
    }

    /// Count one path as done.
    pub fn settle(&mut self, how: Settled) {
        if self.in_flight == 0 {
            return;
        }
        self.in_flight -= 1;
        match how {
            Settled::Loaded => self.tally.loaded += 1,
            Settled::Skipped => self.tally.skipped += 1,
            Settled::Failed => self.tally.failed += 1,
        }
    }

    /// Count every outstanding path as failed.
    pub fn abandon(&mut self) {
        if self.in_flight > 0 {
            error!(lost = self.in_flight, "import workers stopped early");
        }
        self.tally.failed += self.in_flight;
        self.in_flight = 0;
    }

    /// The final tally, handed out once when nothing is left in flight.
    pub fn finish(&mut self) -> Option<ImportTally> {
        if self.in_flight > 0 || self.announced {
            return None;
        }
        self.announced = true;
        Some(self.tally)
    }
}
