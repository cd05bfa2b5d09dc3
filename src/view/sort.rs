//! Sort state machine and the four-key ordering derived from it.
//!
//! Each axis cycles `Default -> Forward -> Reverse -> Default` on click, and
//! clicking a different axis resets every other axis to `Default`. The engine
//! keeps the derived `OrderSpec` rather than a materialized list, so every
//! lookup is re-run against the current record set.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::error::StoreError;
use crate::library::{TrackId, TrackStore};

/// Properties eligible to be the primary sort key, in their fixed order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SortAxis {
    AlbumTrackNumber,
    Title,
    Album,
    Artist,
}

impl SortAxis {
    pub const ALL: [SortAxis; 4] = [
        SortAxis::AlbumTrackNumber,
        SortAxis::Title,
        SortAxis::Album,
        SortAxis::Artist,
    ];

    fn slot(self) -> usize {
        match self {
            SortAxis::AlbumTrackNumber => 0,
            SortAxis::Title => 1,
            SortAxis::Album => 2,
            SortAxis::Artist => 3,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortAxis::AlbumTrackNumber => "album_track_number",
            SortAxis::Title => "title",
            SortAxis::Album => "album",
            SortAxis::Artist => "artist",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortAxis::AlbumTrackNumber => "#",
            SortAxis::Title => "Title",
            SortAxis::Album => "Album",
            SortAxis::Artist => "Artist",
        }
    }
}

impl fmt::Display for SortAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-axis button state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortState {
    #[default]
    Default,
    Forward,
    Reverse,
}

impl SortState {
    /// The state a click moves to.
    pub fn next(self) -> Self {
        match self {
            SortState::Default => SortState::Forward,
            SortState::Forward => SortState::Reverse,
            SortState::Reverse => SortState::Default,
        }
    }

    /// The state a click came from.
    pub fn previous(self) -> Self {
        match self {
            SortState::Forward => SortState::Default,
            SortState::Reverse => SortState::Forward,
            SortState::Default => SortState::Reverse,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub axis: SortAxis,
    pub direction: SortDirection,
}

impl SortKey {
    fn asc(axis: SortAxis) -> Self {
        Self {
            axis,
            direction: SortDirection::Ascending,
        }
    }

    fn desc(axis: SortAxis) -> Self {
        Self {
            axis,
            direction: SortDirection::Descending,
        }
    }
}

/// A complete four-column ordering. Only built from `SortAxis` values, so the
/// rendered `ORDER BY` never contains caller text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    keys: [SortKey; 4],
}

impl Default for OrderSpec {
    /// Artist, Album, AlbumTrackNumber, Title, all ascending.
    fn default() -> Self {
        Self {
            keys: [
                SortKey::asc(SortAxis::Artist),
                SortKey::asc(SortAxis::Album),
                SortKey::asc(SortAxis::AlbumTrackNumber),
                SortKey::asc(SortAxis::Title),
            ],
        }
    }
}

impl OrderSpec {
    /// Ordering for `primary` in `state`.
    ///
    /// With the remaining axes `R0, R1, R2` (fixed order minus `primary`) the
    /// columns are `[primary, R2, R0, R1]`. Reverse flips only the first two
    /// columns unless `full_reverse` is set.
    pub fn derive(primary: SortAxis, state: SortState, full_reverse: bool) -> Self {
        let rest: Vec<SortAxis> = SortAxis::ALL
            .into_iter()
            .filter(|a| *a != primary)
            .collect();
        let columns = [primary, rest[2], rest[0], rest[1]];

        let keys = match state {
            SortState::Default => return Self::default(),
            SortState::Forward => columns.map(SortKey::asc),
            SortState::Reverse if full_reverse => columns.map(SortKey::desc),
            SortState::Reverse => [
                SortKey::desc(columns[0]),
                SortKey::desc(columns[1]),
                SortKey::asc(columns[2]),
                SortKey::asc(columns[3]),
            ],
        };
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey; 4] {
        &self.keys
    }

    /// `ORDER BY` body: the four keys, then `id` so the order is total.
    pub fn order_by_clause(&self) -> String {
        let mut parts: Vec<String> = self
            .keys
            .iter()
            .map(|k| match k.axis {
                SortAxis::AlbumTrackNumber => format!("{} {}", k.axis.column(), k.direction.sql()),
                _ => format!("{} COLLATE NOCASE {}", k.axis.column(), k.direction.sql()),
            })
            .collect();
        parts.push("id ASC".to_string());
        parts.join(", ")
    }
}

pub struct SortEngine {
    states: [SortState; 4],
    primary: Option<SortAxis>,
    spec: OrderSpec,
    full_reverse: bool,
}

impl SortEngine {
    pub fn new(full_reverse: bool) -> Self {
        Self {
            states: [SortState::Default; 4],
            primary: None,
            spec: OrderSpec::default(),
            full_reverse,
        }
    }

    /// Register a click on `axis` and return its new state.
    pub fn click(&mut self, axis: SortAxis) -> SortState {
        let next = self.state(axis).next();
        self.set_state(axis, next);
        next
    }

    /// Put `axis` into `state` directly, resetting the other axes.
    pub fn set_state(&mut self, axis: SortAxis, state: SortState) {
        self.states = [SortState::Default; 4];
        self.states[axis.slot()] = state;
        self.primary = (state != SortState::Default).then_some(axis);
        self.spec = OrderSpec::derive(axis, state, self.full_reverse);
        debug!(%axis, ?state, order = %self.spec.order_by_clause(), "sort changed");
    }

    pub fn state(&self, axis: SortAxis) -> SortState {
        self.states[axis.slot()]
    }

    /// The axis currently driving the order, if any.
    pub fn primary(&self) -> Option<SortAxis> {
        self.primary
    }

    pub fn spec(&self) -> &OrderSpec {
        &self.spec
    }

    /// Run the cached ordering against the store, keeping only members of
    /// `filter` when one is given.
    pub fn materialize(
        &self,
        store: &TrackStore,
        filter: Option<&[TrackId]>,
    ) -> Result<Vec<TrackId>, StoreError> {
        let ordered = store.ids_ordered_by(&self.spec)?;
        Ok(match filter {
            None => ordered,
            Some(members) => {
                let members: HashSet<TrackId> = members.iter().copied().collect();
                ordered.into_iter().filter(|id| members.contains(id)).collect()
            }
        })
    }
}

impl Default for SortEngine {
    fn default() -> Self {
        Self::new(false)
    }
}
