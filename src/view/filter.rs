use std::collections::HashSet;

use tracing::debug;

use crate::error::StoreError;
use crate::library::{TrackId, TrackStore};

/// What a search did to the active view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query was empty; filtering is off.
    Cleared,
    Found(Vec<TrackId>),
    /// Filtering is on and the view is empty.
    NoResults,
}

/// Holds the current search query and the ids it matched.
///
/// While a query is set the active view is exactly `results`, including when
/// `results` is empty.
#[derive(Debug, Default)]
pub struct FilterEngine {
    query: Option<String>,
    results: Vec<TrackId>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `query` as a case-insensitive substring of title, artist or
    /// album. Whitespace-only input clears the filter.
    pub fn search(
        &mut self,
        store: &TrackStore,
        query: &str,
    ) -> Result<SearchOutcome, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            self.clear();
            return Ok(SearchOutcome::Cleared);
        }

        let results = store.search_ids(query)?;
        debug!(query, matches = results.len(), "search");
        self.query = Some(query.to_string());
        self.results = results.clone();
        Ok(if results.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Found(results)
        })
    }

    /// Re-run the current query, picking up records added since.
    pub fn refresh(&mut self, store: &TrackStore) -> Result<(), StoreError> {
        if let Some(query) = self.query.clone() {
            self.search(store, &query)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.results.clear();
    }

    pub fn is_filtered(&self) -> bool {
        self.query.is_some()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Matched ids when filtering, `None` otherwise.
    pub fn current_results(&self) -> Option<&[TrackId]> {
        self.query.as_ref().map(|_| self.results.as_slice())
    }

    pub fn has_no_results(&self) -> bool {
        self.is_filtered() && self.results.is_empty()
    }

    /// Drop a deleted id from the cached results.
    pub fn on_track_removed(&mut self, id: TrackId) -> bool {
        let before = self.results.len();
        self.results.retain(|r| *r != id);
        before != self.results.len()
    }

    /// Take the new order of the matched ids. Ids outside the current match
    /// set are ignored so membership never changes here.
    pub fn on_collection_reordered(&mut self, ordered: &[TrackId]) {
        if !self.is_filtered() {
            return;
        }
        let members: HashSet<TrackId> = self.results.iter().copied().collect();
        self.results = ordered
            .iter()
            .copied()
            .filter(|id| members.contains(id))
            .collect();
    }
}
