//! Navigation cursor over the active view.
//!
//! Holds the active (playing) and selected track ids. Positions are looked
//! up fresh on every step, so the cursor survives re-sorts and filter
//! changes as long as its track is still in the view.

use std::fmt;

use tracing::{debug, warn};

use crate::audio::Playback;
use crate::error::StoreError;
use crate::events::{EventBus, LibraryEvent};
use crate::library::{TrackId, TrackRecord};
use crate::view::{ActiveView, within_bounds};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Next => Direction::Previous,
            Direction::Previous => Direction::Next,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Next => f.write_str("next"),
            Direction::Previous => f.write_str("previous"),
        }
    }
}

/// Result of moving the active track.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// `ActiveTrack` changed and playback started.
    Moved(TrackId),
    /// Nothing beyond this end of the view. `ActiveTrack` is unchanged.
    Boundary(Direction),
    /// `ActiveTrack` changed but its file could not be played.
    Unplayable(TrackId),
}

#[derive(Debug, Default)]
pub struct Cursor {
    active: Option<TrackId>,
    selected: Option<TrackId>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<TrackId> {
        self.active
    }

    pub fn selected(&self) -> Option<TrackId> {
        self.selected
    }

    pub fn next(
        &mut self,
        view: &ActiveView<'_>,
        player: &mut dyn Playback,
        bus: &EventBus,
    ) -> Result<Step, StoreError> {
        self.step(Direction::Next, view, player, bus)
    }

    pub fn previous(
        &mut self,
        view: &ActiveView<'_>,
        player: &mut dyn Playback,
        bus: &EventBus,
    ) -> Result<Step, StoreError> {
        self.step(Direction::Previous, view, player, bus)
    }

    /// Leave the active track: try `Next`, fall back to `Previous`. Publishes
    /// exactly one `TrackSkipped` whatever happens.
    pub fn skip(
        &mut self,
        view: &ActiveView<'_>,
        player: &mut dyn Playback,
        bus: &EventBus,
    ) -> Result<Step, StoreError> {
        let skipped = match self.active {
            Some(id) => view.store().get(id).ok(),
            None => None,
        };
        let outcome = match self.next(view, player, bus) {
            Ok(Step::Boundary(_)) => self.previous(view, player, bus),
            other => other,
        };
        bus.publish(LibraryEvent::TrackSkipped(skipped));
        outcome
    }

    /// Make `id` the active track and start it, regardless of position.
    pub fn activate(
        &mut self,
        id: TrackId,
        view: &ActiveView<'_>,
        player: &mut dyn Playback,
        bus: &EventBus,
    ) -> Result<Step, StoreError> {
        let record = view.store().get(id)?;
        player.stop();
        let previous = self.active.replace(id);
        bus.publish(LibraryEvent::ActiveTrackChanged {
            previous,
            current: Some(id),
        });
        Ok(start(player, &record, bus))
    }

    fn step(
        &mut self,
        direction: Direction,
        view: &ActiveView<'_>,
        player: &mut dyn Playback,
        bus: &EventBus,
    ) -> Result<Step, StoreError> {
        let len = view.len()?;
        let shifted = match self.active {
            Some(id) => view.index_of(id, Some(direction))?,
            None => None,
        };
        // Without an active track in view, Next starts at the top and
        // Previous at the bottom.
        let target = match (shifted, direction) {
            (Some(p), _) => p,
            (None, Direction::Next) => 1,
            (None, Direction::Previous) => len,
        };

        let id = match view.id_at_index(target)? {
            Some(id) if within_bounds(target, len) => id,
            _ => {
                debug!(%direction, position = target, len, "end of list");
                bus.publish(LibraryEvent::TrackListEnd(direction));
                return Ok(Step::Boundary(direction));
            }
        };
        let record = view.store().get(id)?;
        player.stop();
        let previous = self.active.replace(id);
        bus.publish(LibraryEvent::ActiveTrackChanged {
            previous,
            current: Some(id),
        });
        bus.publish(LibraryEvent::ActiveTrackCycled {
            from: previous,
            to: id,
            direction,
        });
        Ok(start(player, &record, bus))
    }

    /// Point the selection at `id`, or clear it.
    pub fn select(&mut self, id: Option<TrackId>, bus: &EventBus) {
        if self.selected != id {
            self.selected = id;
            bus.publish(LibraryEvent::SelectedTrackChanged(id));
        }
    }

    /// Move the selection one row in `direction`, stopping at either end.
    /// With nothing selected the first (or last) row is picked.
    pub fn select_step(
        &mut self,
        direction: Direction,
        view: &ActiveView<'_>,
        bus: &EventBus,
    ) -> Result<Option<TrackId>, StoreError> {
        let order = view.materialize()?;
        let current = self
            .selected
            .and_then(|id| order.iter().position(|t| *t == id));
        let index = match (current, direction) {
            (_, _) if order.is_empty() => return Ok(None),
            (Some(i), Direction::Next) => (i + 1).min(order.len() - 1),
            (Some(i), Direction::Previous) => i.saturating_sub(1),
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => order.len() - 1,
        };
        self.select(Some(order[index]), bus);
        Ok(self.selected)
    }

    /// Forget `id` after it left the store. Returns `true` if it was active.
    pub fn forget(&mut self, id: TrackId, bus: &EventBus) -> bool {
        if self.selected == Some(id) {
            self.select(None, bus);
        }
        if self.active == Some(id) {
            self.active = None;
            bus.publish(LibraryEvent::ActiveTrackChanged {
                previous: Some(id),
                current: None,
            });
            return true;
        }
        false
    }
}

/// Load and play `record`. Media failures are published, not returned.
fn start(player: &mut dyn Playback, record: &TrackRecord, bus: &EventBus) -> Step {
    match player.load(record.path()) {
        Ok(()) => {
            player.play();
            debug!(id = %record.id, track = %record.display(), "playing");
            Step::Moved(record.id)
        }
        Err(e) => {
            warn!(id = %record.id, error = %e, "cannot play track");
            bus.publish(LibraryEvent::AudioFileError {
                path: Some(record.path.clone()),
                message: e.to_string(),
            });
            Step::Unplayable(record.id)
        }
    }
}

#[cfg(test)]
mod tests;
