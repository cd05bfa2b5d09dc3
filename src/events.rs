//! Synchronous event bus connecting the engines to whoever presents them.
//!
//! Listeners are registered per `EventKind` and called in registration
//! order, on the publisher's stack. Publishing an event nobody listens to is a
//! no-op. Registering the same listener twice delivers twice; `unregister`
//! removes one registration at a time, matched by `Rc` identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::audio::PlaybackState;
use crate::cursor::Direction;
use crate::library::{TrackId, TrackRecord};
use crate::view::{SortAxis, SortState};

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    TrackAdded(TrackRecord),
    TrackUpdated(TrackRecord),
    TrackRemoved(TrackRecord),
    ActiveTrackChanged {
        previous: Option<TrackId>,
        current: Option<TrackId>,
    },
    /// The cursor stepped from one track to another.
    ActiveTrackCycled {
        from: Option<TrackId>,
        to: TrackId,
        direction: Direction,
    },
    SelectedTrackChanged(Option<TrackId>),
    /// A step ran past either end of the active view.
    TrackListEnd(Direction),
    /// `None` when no track context was available.
    TrackSkipped(Option<TrackRecord>),
    CollectionReordered(Vec<TrackId>),
    SortChanged {
        axis: SortAxis,
        state: SortState,
    },
    SearchResultsFound {
        query: String,
        count: usize,
    },
    NoSearchResults {
        query: String,
    },
    SearchCleared,
    PlaybackStateChanged(PlaybackState),
    AudioFileError {
        path: Option<PathBuf>,
        message: String,
    },
    /// An import batch finished. `skipped` counts readable files with no tags.
    AllTracksLoaded {
        loaded: usize,
        skipped: usize,
        failed: usize,
    },
    CommandFailed(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrackAdded,
    TrackUpdated,
    TrackRemoved,
    ActiveTrackChanged,
    ActiveTrackCycled,
    SelectedTrackChanged,
    TrackListEnd,
    TrackSkipped,
    CollectionReordered,
    SortChanged,
    SearchResultsFound,
    NoSearchResults,
    SearchCleared,
    PlaybackStateChanged,
    AudioFileError,
    AllTracksLoaded,
    CommandFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 17] = [
        EventKind::TrackAdded,
        EventKind::TrackUpdated,
        EventKind::TrackRemoved,
        EventKind::ActiveTrackChanged,
        EventKind::ActiveTrackCycled,
        EventKind::SelectedTrackChanged,
        EventKind::TrackListEnd,
        EventKind::TrackSkipped,
        EventKind::CollectionReordered,
        EventKind::SortChanged,
        EventKind::SearchResultsFound,
        EventKind::NoSearchResults,
        EventKind::SearchCleared,
        EventKind::PlaybackStateChanged,
        EventKind::AudioFileError,
        EventKind::AllTracksLoaded,
        EventKind::CommandFailed,
    ];
}

impl LibraryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LibraryEvent::TrackAdded(_) => EventKind::TrackAdded,
            LibraryEvent::TrackUpdated(_) => EventKind::TrackUpdated,
            LibraryEvent::TrackRemoved(_) => EventKind::TrackRemoved,
            LibraryEvent::ActiveTrackChanged { .. } => EventKind::ActiveTrackChanged,
            LibraryEvent::ActiveTrackCycled { .. } => EventKind::ActiveTrackCycled,
            LibraryEvent::SelectedTrackChanged(_) => EventKind::SelectedTrackChanged,
            LibraryEvent::TrackListEnd(_) => EventKind::TrackListEnd,
            LibraryEvent::TrackSkipped(_) => EventKind::TrackSkipped,
            LibraryEvent::CollectionReordered(_) => EventKind::CollectionReordered,
            LibraryEvent::SortChanged { .. } => EventKind::SortChanged,
            LibraryEvent::SearchResultsFound { .. } => EventKind::SearchResultsFound,
            LibraryEvent::NoSearchResults { .. } => EventKind::NoSearchResults,
            LibraryEvent::SearchCleared => EventKind::SearchCleared,
            LibraryEvent::PlaybackStateChanged(_) => EventKind::PlaybackStateChanged,
            LibraryEvent::AudioFileError { .. } => EventKind::AudioFileError,
            LibraryEvent::AllTracksLoaded { .. } => EventKind::AllTracksLoaded,
            LibraryEvent::CommandFailed(_) => EventKind::CommandFailed,
        }
    }
}

/// Something that wants to hear about library events.
pub trait Listener {
    fn on_event(&self, event: &LibraryEvent);
}

impl<F> Listener for F
where
    F: Fn(&LibraryEvent),
{
    fn on_event(&self, event: &LibraryEvent) {
        self(event)
    }
}

pub type ListenerRef = Rc<dyn Listener>;

#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventKind, Vec<ListenerRef>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: EventKind, listener: ListenerRef) {
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(listener);
    }

    /// Register `listener` for every event kind.
    pub fn register_all(&self, listener: ListenerRef) {
        for kind in EventKind::ALL {
            self.register(kind, listener.clone());
        }
    }

    /// Remove the most recent registration of `listener` for `kind`.
    /// Returns `false` when it was not registered.
    pub fn unregister(&self, kind: EventKind, listener: &ListenerRef) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        match list.iter().rposition(|l| Rc::ptr_eq(l, listener)) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn publish(&self, event: LibraryEvent) {
        // Snapshot so listeners may register/unregister while being called.
        let targets: Vec<ListenerRef> = match self.listeners.borrow().get(&event.kind()) {
            Some(list) => list.clone(),
            None => return,
        };
        tracing::trace!(kind = ?event.kind(), listeners = targets.len(), "publish");
        for listener in targets {
            listener.on_event(&event);
        }
    }
}
