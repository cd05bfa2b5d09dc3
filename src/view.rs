//! Ordered, optionally filtered view over the track store.
//!
//! `SortEngine` owns the ordering and `FilterEngine` the search results.
//! `ActiveView` combines both with the store and answers position queries.
//! Positions are 1-based and every query re-materializes the ordering.

mod filter;
mod sort;

pub use filter::*;
pub use sort::*;

use crate::cursor::Direction;
use crate::error::StoreError;
use crate::library::{TrackId, TrackStore};

/// Borrowed combination of store, ordering and filter.
#[derive(Clone, Copy)]
pub struct ActiveView<'a> {
    store: &'a TrackStore,
    sort: &'a SortEngine,
    filter: &'a FilterEngine,
}

impl<'a> ActiveView<'a> {
    pub fn new(store: &'a TrackStore, sort: &'a SortEngine, filter: &'a FilterEngine) -> Self {
        Self {
            store,
            sort,
            filter,
        }
    }

    pub fn store(&self) -> &'a TrackStore {
        self.store
    }

    /// Current ordered id sequence.
    pub fn materialize(&self) -> Result<Vec<TrackId>, StoreError> {
        self.sort
            .materialize(self.store, self.filter.current_results())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.materialize()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// 1-based position of `id`, shifted one step in `offset` if given.
    ///
    /// The shifted position is not range checked: the last track's `Next`
    /// is `len + 1` and the first track's `Previous` is `0`. Returns `None`
    /// when `id` is not in the view.
    pub fn index_of(
        &self,
        id: TrackId,
        offset: Option<Direction>,
    ) -> Result<Option<usize>, StoreError> {
        let Some(found) = self.materialize()?.iter().position(|t| *t == id) else {
            return Ok(None);
        };
        let position = found + 1;
        Ok(Some(match offset {
            None => position,
            Some(Direction::Next) => position + 1,
            Some(Direction::Previous) => position - 1,
        }))
    }

    /// Track at 1-based `position`, or `None` outside `1..=len`.
    pub fn id_at_index(&self, position: usize) -> Result<Option<TrackId>, StoreError> {
        if position == 0 {
            return Ok(None);
        }
        Ok(self.materialize()?.get(position - 1).copied())
    }
}

/// Whether `position` names a track in a view of `len` tracks.
pub fn within_bounds(position: usize, len: usize) -> bool {
    (1..=len).contains(&position)
}
