use std::cell::{Cell, RefCell};

use crate::cursor::Direction;
use crate::events::{LibraryEvent, Listener};
use crate::view::SortState;

/// Bus listener that turns engine events into what the TUI shows: a one-line
/// status message and a flag telling the loop to reload its rows.
pub struct StatusFeed {
    message: RefCell<Option<String>>,
    rows_dirty: Cell<bool>,
}

impl StatusFeed {
    pub fn new() -> Self {
        Self {
            message: RefCell::new(None),
            rows_dirty: Cell::new(true),
        }
    }

    pub fn message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    /// Whether rows need reloading since the last call. Resets the flag.
    pub fn take_rows_dirty(&self) -> bool {
        self.rows_dirty.replace(false)
    }

    fn say(&self, text: String) {
        *self.message.borrow_mut() = Some(text);
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for StatusFeed {
    fn on_event(&self, event: &LibraryEvent) {
        match event {
            LibraryEvent::TrackAdded(_) | LibraryEvent::TrackUpdated(_) => {
                self.rows_dirty.set(true);
            }
            LibraryEvent::TrackRemoved(record) => {
                self.rows_dirty.set(true);
                self.say(format!("removed {}", record.display()));
            }
            LibraryEvent::CollectionReordered(_) => self.rows_dirty.set(true),
            LibraryEvent::SortChanged { axis, state } => self.say(match state {
                SortState::Default => "sort: default".to_string(),
                SortState::Forward => format!("sort: {axis} asc"),
                SortState::Reverse => format!("sort: {axis} desc"),
            }),
            LibraryEvent::SearchResultsFound { query, count } => {
                self.say(format!("{count} match(es) for \"{query}\""));
            }
            LibraryEvent::NoSearchResults { query } => {
                self.say(format!("no matches for \"{query}\""));
            }
            LibraryEvent::SearchCleared => self.say("search cleared".to_string()),
            LibraryEvent::TrackListEnd(Direction::Next) => self.say("end of list".to_string()),
            LibraryEvent::TrackListEnd(Direction::Previous) => {
                self.say("start of list".to_string());
            }
            LibraryEvent::TrackSkipped(Some(record)) => {
                self.say(format!("skipped {}", record.display()));
            }
            LibraryEvent::TrackSkipped(None) => self.say("skipped".to_string()),
            LibraryEvent::AudioFileError { message, .. } => self.say(message.clone()),
            LibraryEvent::AllTracksLoaded {
                loaded,
                skipped,
                failed,
            } => self.say(format!(
                "loaded {loaded} track(s), {skipped} untagged, {failed} failed"
            )),
            LibraryEvent::CommandFailed(message) => self.say(message.clone()),
            LibraryEvent::ActiveTrackChanged { .. }
            | LibraryEvent::ActiveTrackCycled { .. }
            | LibraryEvent::SelectedTrackChanged(_)
            | LibraryEvent::PlaybackStateChanged(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::SortAxis;

    #[test]
    fn starts_dirty_and_resets_on_take() {
        let feed = StatusFeed::new();
        assert!(feed.take_rows_dirty());
        assert!(!feed.take_rows_dirty());

        feed.on_event(&LibraryEvent::CollectionReordered(Vec::new()));
        assert!(feed.take_rows_dirty());
    }

    #[test]
    fn describes_the_latest_event() {
        let feed = StatusFeed::new();
        feed.on_event(&LibraryEvent::SortChanged {
            axis: SortAxis::Title,
            state: SortState::Reverse,
        });
        assert_eq!(feed.message().as_deref(), Some("sort: Title desc"));

        feed.on_event(&LibraryEvent::AllTracksLoaded {
            loaded: 3,
            skipped: 1,
            failed: 0,
        });
        assert_eq!(
            feed.message().as_deref(),
            Some("loaded 3 track(s), 1 untagged, 0 failed")
        );
    }

    #[test]
    fn cursor_events_leave_the_message_alone() {
        let feed = StatusFeed::new();
        feed.on_event(&LibraryEvent::SearchCleared);
        feed.on_event(&LibraryEvent::SelectedTrackChanged(None));
        assert_eq!(feed.message().as_deref(), Some("search cleared"));
    }
}
