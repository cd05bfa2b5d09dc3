//! The object graph for one interactive session.
//!
//! `Session` is built once at startup and owns the store, both view engines,
//! the cursor and the player, all sharing one `EventBus`. Everything that
//! mutates engine state goes through here on the control thread.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::audio::{Playback, PlaybackState};
use crate::cursor::{Cursor, Direction, Step};
use crate::error::{MediaError, StoreError};
use crate::events::{EventBus, LibraryEvent};
use crate::library::{
    ImportBatch, ImportResult, Polled, Settled, TagReader, TrackId, TrackMetadata, TrackRecord,
    TrackStore, scan,
};
use crate::view::{ActiveView, FilterEngine, SearchOutcome, SortAxis, SortEngine, SortState};

pub struct Session {
    store: TrackStore,
    sort: SortEngine,
    filter: FilterEngine,
    cursor: Cursor,
    bus: Rc<EventBus>,
    player: Box<dyn Playback>,
    state: PlaybackState,
    import_workers: usize,
    tag_reader: TagReader,
}

impl Session {
    pub fn new(store: TrackStore, sort: SortEngine, player: Box<dyn Playback>) -> Self {
        let bus = store.bus().clone();
        Self {
            store,
            sort,
            filter: FilterEngine::new(),
            cursor: Cursor::new(),
            bus,
            player,
            state: PlaybackState::Stopped,
            import_workers: 1,
            tag_reader: scan::read_tags,
        }
    }

    pub fn with_import_workers(mut self, workers: usize) -> Self {
        self.import_workers = workers.max(1);
        self
    }

    pub fn with_tag_reader(mut self, reader: TagReader) -> Self {
        self.tag_reader = reader;
        self
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn sort(&self) -> &SortEngine {
        &self.sort
    }

    pub fn filter(&self) -> &FilterEngine {
        &self.filter
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn player(&self) -> &dyn Playback {
        self.player.as_ref()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub fn view(&self) -> ActiveView<'_> {
        ActiveView::new(&self.store, &self.sort, &self.filter)
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.bus.publish(LibraryEvent::PlaybackStateChanged(state));
        }
    }

    /// Click a sort button. Returns the axis' new state.
    pub fn click_sort(&mut self, axis: SortAxis) -> Result<SortState, StoreError> {
        let state = self.sort.click(axis);
        self.sort_changed(axis, state)?;
        Ok(state)
    }

    /// Put `axis` straight into `state`.
    pub fn set_sort(&mut self, axis: SortAxis, state: SortState) -> Result<(), StoreError> {
        self.sort.set_state(axis, state);
        self.sort_changed(axis, state)
    }

    fn sort_changed(&mut self, axis: SortAxis, state: SortState) -> Result<(), StoreError> {
        self.bus.publish(LibraryEvent::SortChanged { axis, state });
        self.reordered()
    }

    fn reordered(&mut self) -> Result<(), StoreError> {
        let ids = self.view().materialize()?;
        self.filter.on_collection_reordered(&ids);
        self.bus.publish(LibraryEvent::CollectionReordered(ids));
        Ok(())
    }

    pub fn search(&mut self, query: &str) -> Result<SearchOutcome, StoreError> {
        let outcome = self.filter.search(&self.store, query)?;
        let event = match &outcome {
            SearchOutcome::Cleared => LibraryEvent::SearchCleared,
            SearchOutcome::Found(ids) => LibraryEvent::SearchResultsFound {
                query: query.trim().to_string(),
                count: ids.len(),
            },
            SearchOutcome::NoResults => LibraryEvent::NoSearchResults {
                query: query.trim().to_string(),
            },
        };
        self.bus.publish(event);
        self.reordered()?;
        Ok(outcome)
    }

    /// Upsert one record. Returns its id and whether it was newly inserted.
    pub fn add_track(&mut self, meta: &TrackMetadata) -> Result<(TrackId, bool), StoreError> {
        let existed = self.store.find_by_path(&meta.path)?.is_some();
        let id = self.store.upsert(meta)?;
        if self.filter.is_filtered() {
            self.filter.refresh(&self.store)?;
        }
        Ok((id, !existed))
    }

    /// Delete a record and drop every pointer to it. Removing the active
    /// track stops playback.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Option<TrackRecord>, StoreError> {
        let Some(removed) = self.store.delete(id)? else {
            return Ok(None);
        };
        self.filter.on_track_removed(id);
        if self.cursor.forget(id, &self.bus) {
            self.player.stop();
            self.set_state(PlaybackState::Stopped);
        }
        Ok(Some(removed))
    }

    pub fn start_import(&self, paths: Vec<PathBuf>) -> ImportBatch {
        info!(files = paths.len(), workers = self.import_workers, "importing");
        ImportBatch::spawn_with(paths, self.import_workers, self.tag_reader)
    }

    /// Apply whatever results `batch` has ready, or all of them when `wait`
    /// is set. Publishes `AllTracksLoaded` once the batch is settled.
    /// Returns the ids of newly inserted records.
    pub fn drain_import(&mut self, batch: &mut ImportBatch, wait: bool) -> Vec<TrackId> {
        let mut inserted = Vec::new();
        loop {
            let polled = if wait { batch.wait() } else { batch.poll() };
            match polled {
                Polled::Result(result) => {
                    let (settled, new_id) = self.apply_import(result);
                    batch.settle(settled);
                    inserted.extend(new_id);
                }
                Polled::Empty => break,
                Polled::Closed => {
                    batch.abandon();
                    break;
                }
            }
        }
        if let Some(tally) = batch.finish() {
            info!(
                loaded = tally.loaded,
                skipped = tally.skipped,
                failed = tally.failed,
                "import finished"
            );
            self.bus.publish(LibraryEvent::AllTracksLoaded {
                loaded: tally.loaded,
                skipped: tally.skipped,
                failed: tally.failed,
            });
        }
        inserted
    }

    /// Apply one import result on the control thread.
    pub fn apply_import(&mut self, result: ImportResult) -> (Settled, Option<TrackId>) {
        let ImportResult { path, outcome } = result;
        let meta = match outcome {
            Ok(meta) => meta,
            Err(MediaError::Untagged(_)) => {
                warn!(path = %path.display(), "no tags, not imported");
                return (Settled::Skipped, None);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "import failed");
                self.bus.publish(LibraryEvent::AudioFileError {
                    path: Some(path),
                    message: e.to_string(),
                });
                return (Settled::Failed, None);
            }
        };
        match self.add_track(&meta) {
            Ok((id, true)) => (Settled::Loaded, Some(id)),
            Ok((_, false)) => (Settled::Loaded, None),
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot store imported track");
                self.bus.publish(LibraryEvent::AudioFileError {
                    path: Some(path),
                    message: e.to_string(),
                });
                (Settled::Failed, None)
            }
        }
    }

    /// Import `paths` and wait for every result.
    pub fn import_blocking(&mut self, paths: Vec<PathBuf>) -> Vec<TrackId> {
        let mut batch = self.start_import(paths);
        self.drain_import(&mut batch, true)
    }

    fn after_step(&mut self, step: Step) -> Step {
        match step {
            Step::Moved(_) => self.set_state(PlaybackState::Playing),
            Step::Unplayable(_) => self.set_state(PlaybackState::Stopped),
            Step::Boundary(_) => {}
        }
        step
    }

    /// Play `id`, or resume / start something sensible when `None`.
    ///
    /// With no id: a paused track resumes, a stopped active track restarts,
    /// otherwise the selection (or the first track) starts.
    pub fn play(&mut self, id: Option<TrackId>) -> Result<Option<Step>, StoreError> {
        let target = match (id, self.state, self.cursor.active()) {
            (Some(id), _, _) => Some(id),
            (None, PlaybackState::Paused, Some(_)) => {
                self.player.play();
                self.set_state(PlaybackState::Playing);
                return Ok(None);
            }
            (None, PlaybackState::Playing, Some(_)) => return Ok(None),
            (None, PlaybackState::Stopped, Some(active)) => Some(active),
            (None, _, None) => self.cursor.selected(),
        };

        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        let step = match target {
            Some(id) => self
                .cursor
                .activate(id, &view, self.player.as_mut(), &self.bus)?,
            None => self.cursor.next(&view, self.player.as_mut(), &self.bus)?,
        };
        Ok(Some(self.after_step(step)))
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.player.pause();
            self.set_state(PlaybackState::Paused);
        }
    }

    pub fn stop(&mut self) {
        self.player.stop();
        self.set_state(PlaybackState::Stopped);
    }

    pub fn position(&self) -> Duration {
        self.player.time()
    }

    /// Jump within the loaded clip. A no-op while stopped.
    pub fn seek(&mut self, to: Duration) -> Result<(), MediaError> {
        if self.state == PlaybackState::Stopped {
            return Ok(());
        }
        let to = match self.player.duration() {
            Some(total) => to.min(total),
            None => to,
        };
        self.player.set_time(to)
    }

    pub fn next(&mut self) -> Result<Step, StoreError> {
        self.navigate(Direction::Next)
    }

    pub fn previous(&mut self) -> Result<Step, StoreError> {
        self.navigate(Direction::Previous)
    }

    fn navigate(&mut self, direction: Direction) -> Result<Step, StoreError> {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        let player = self.player.as_mut();
        let step = match direction {
            Direction::Next => self.cursor.next(&view, player, &self.bus)?,
            Direction::Previous => self.cursor.previous(&view, player, &self.bus)?,
        };
        Ok(self.after_step(step))
    }

    pub fn skip(&mut self) -> Result<Step, StoreError> {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        let step = self
            .cursor
            .skip(&view, self.player.as_mut(), &self.bus)?;
        Ok(self.after_step(step))
    }

    /// Move on when the playing clip has ended; stop at the end of the list.
    pub fn advance_if_finished(&mut self) -> Result<Option<Step>, StoreError> {
        if self.state != PlaybackState::Playing || !self.player.is_done() {
            return Ok(None);
        }
        let step = self.next()?;
        if let Step::Boundary(_) = step {
            self.stop();
        }
        Ok(Some(step))
    }

    pub fn select(&mut self, id: Option<TrackId>) {
        self.cursor.select(id, &self.bus);
    }

    pub fn select_step(&mut self, direction: Direction) -> Result<Option<TrackId>, StoreError> {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor.select_step(direction, &view, &self.bus)
    }
}
