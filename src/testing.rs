//! Fakes and fixtures shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::audio::Playback;
use crate::error::MediaError;
use crate::events::{EventBus, EventKind, LibraryEvent, ListenerRef};
use crate::library::{TrackId, TrackMetadata, TrackStore};
use crate::session::Session;
use crate::view::SortEngine;

pub(crate) fn memory_store() -> TrackStore {
    TrackStore::open_in_memory(Rc::new(EventBus::new())).unwrap()
}

pub(crate) fn add(
    store: &mut TrackStore,
    artist: &str,
    album: &str,
    number: u32,
    title: &str,
) -> TrackId {
    let path = format!("/music/{artist}/{album}/{number:02} {title}.mp3");
    store
        .insert(
            &TrackMetadata::new(path)
                .artist(artist)
                .album(album)
                .album_track_number(number)
                .title(title),
        )
        .unwrap()
}

/// A session over `titles` (one album, numbered in order) with a fake
/// player and an event log attached after the tracks were added.
pub(crate) fn session(titles: &[&str]) -> (Session, FakePlayback, EventLog, Vec<TrackId>) {
    let mut store = memory_store();
    let ids = titles
        .iter()
        .enumerate()
        .map(|(i, t)| add(&mut store, "Artist", "Album", i as u32 + 1, t))
        .collect();
    let log = EventLog::attach(store.bus());
    let player = FakePlayback::new();
    let session = Session::new(store, SortEngine::default(), Box::new(player.clone()))
        .with_tag_reader(name_tags);
    (session, player, log, ids)
}

/// Records every event published on a bus.
pub(crate) struct EventLog {
    events: Rc<RefCell<Vec<LibraryEvent>>>,
}

impl EventLog {
    pub(crate) fn attach(bus: &EventBus) -> Self {
        let events: Rc<RefCell<Vec<LibraryEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let listener: ListenerRef = Rc::new(move |e: &LibraryEvent| sink.borrow_mut().push(e.clone()));
        bus.register_all(listener);
        Self { events }
    }

    pub(crate) fn events(&self) -> Vec<LibraryEvent> {
        self.events.borrow().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(LibraryEvent::kind).collect()
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    pub(crate) fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// What a `FakePlayback` was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlayerCall {
    Load(PathBuf),
    Play,
    Pause,
    Stop,
    Seek(Duration),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<PlayerCall>,
    broken: HashSet<PathBuf>,
    loaded: Option<PathBuf>,
    position: Duration,
    done: bool,
}

/// In-memory `Playback`. Clones share state so a test can keep one handle
/// while the session owns another.
#[derive(Clone, Default)]
pub(crate) struct FakePlayback {
    state: Rc<RefCell<FakeState>>,
}

impl FakePlayback {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make loads of `path` fail.
    pub(crate) fn break_path(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().broken.insert(path.into());
    }

    pub(crate) fn finish(&self) {
        self.state.borrow_mut().done = true;
    }

    pub(crate) fn calls(&self) -> Vec<PlayerCall> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn loaded(&self) -> Option<PathBuf> {
        self.state.borrow().loaded.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }
}

impl Playback for FakePlayback {
    fn load(&mut self, path: &Path) -> Result<(), MediaError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(PlayerCall::Load(path.to_path_buf()));
        if state.broken.contains(path) {
            state.loaded = None;
            return Err(MediaError::Unsupported {
                path: path.to_path_buf(),
                reason: "corrupt stream".into(),
            });
        }
        state.loaded = Some(path.to_path_buf());
        state.position = Duration::ZERO;
        state.done = false;
        Ok(())
    }

    fn play(&mut self) {
        self.state.borrow_mut().calls.push(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.state.borrow_mut().calls.push(PlayerCall::Pause);
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(PlayerCall::Stop);
        state.position = Duration::ZERO;
    }

    fn duration(&self) -> Option<Duration> {
        self.state
            .borrow()
            .loaded
            .as_ref()
            .map(|_| Duration::from_secs(180))
    }

    fn set_time(&mut self, to: Duration) -> Result<(), MediaError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(PlayerCall::Seek(to));
        state.position = to;
        Ok(())
    }

    fn time(&self) -> Duration {
        self.state.borrow().position
    }

    fn is_done(&self) -> bool {
        self.state.borrow().done
    }
}

/// Tag reader that derives metadata from the file name (`Artist - Title.ext`)
/// and rejects files whose stem starts with `bad`.
pub(crate) fn name_tags(path: &Path) -> Result<TrackMetadata, MediaError> {
    if !path.exists() {
        return Err(MediaError::Missing(path.to_path_buf()));
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    if stem.starts_with("bad") {
        return Err(MediaError::Unsupported {
            path: path.to_path_buf(),
            reason: "not audio".into(),
        });
    }
    if stem.starts_with("untagged") {
        return Err(MediaError::Untagged(path.to_path_buf()));
    }
    let (artist, title) = stem.split_once(" - ").unwrap_or(("Someone", stem.as_str()));
    Ok(TrackMetadata::new(path)
        .artist(artist)
        .title(title)
        .album("Tests"))
}
