use super::*;
use crate::events::EventKind;
use crate::library::TrackStore;
use crate::testing::{EventLog, FakePlayback, PlayerCall, add, memory_store};
use crate::view::{FilterEngine, SortEngine};

struct Fixture {
    store: TrackStore,
    sort: SortEngine,
    filter: FilterEngine,
    cursor: Cursor,
    player: FakePlayback,
    log: EventLog,
}

impl Fixture {
    fn new(titles: &[&str]) -> (Self, Vec<TrackId>) {
        let mut store = memory_store();
        let ids = titles
            .iter()
            .enumerate()
            .map(|(i, t)| add(&mut store, "Artist", "Album", i as u32 + 1, t))
            .collect();
        let log = EventLog::attach(store.bus());
        (
            Self {
                store,
                sort: SortEngine::default(),
                filter: FilterEngine::new(),
                cursor: Cursor::new(),
                player: FakePlayback::new(),
                log,
            },
            ids,
        )
    }

    fn next(&mut self) -> Step {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor
            .next(&view, &mut self.player, self.store.bus())
            .unwrap()
    }

    fn previous(&mut self) -> Step {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor
            .previous(&view, &mut self.player, self.store.bus())
            .unwrap()
    }

    fn skip(&mut self) -> Step {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor
            .skip(&view, &mut self.player, self.store.bus())
            .unwrap()
    }

    fn activate(&mut self, id: TrackId) -> Step {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor
            .activate(id, &view, &mut self.player, self.store.bus())
            .unwrap()
    }

    fn select_step(&mut self, direction: Direction) -> Option<TrackId> {
        let view = ActiveView::new(&self.store, &self.sort, &self.filter);
        self.cursor
            .select_step(direction, &view, self.store.bus())
            .unwrap()
    }
}

#[test]
fn next_without_active_starts_at_first_position() {
    let (mut f, ids) = Fixture::new(&["a", "b", "c"]);
    assert_eq!(f.next(), Step::Moved(ids[0]));
    assert_eq!(f.cursor.active(), Some(ids[0]));
    assert_eq!(f.player.loaded(), Some(f.store.get(ids[0]).unwrap().path));
}

#[test]
fn previous_without_active_starts_at_last_position() {
    let (mut f, ids) = Fixture::new(&["a", "b", "c"]);
    assert_eq!(f.previous(), Step::Moved(ids[2]));
}

#[test]
fn next_walks_the_view_in_order() {
    let (mut f, ids) = Fixture::new(&["a", "b", "c"]);
    f.next();
    f.log.clear();

    assert_eq!(f.next(), Step::Moved(ids[1]));
    assert_eq!(
        f.log.events(),
        vec![
            LibraryEvent::ActiveTrackChanged {
                previous: Some(ids[0]),
                current: Some(ids[1])
            },
            LibraryEvent::ActiveTrackCycled {
                from: Some(ids[0]),
                to: ids[1],
                direction: Direction::Next
            },
        ]
    );
}

#[test]
fn next_at_last_position_is_a_boundary() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.activate(ids[1]);
    f.log.clear();
    f.player.clear_calls();

    assert_eq!(f.next(), Step::Boundary(Direction::Next));
    assert_eq!(f.cursor.active(), Some(ids[1]));
    assert_eq!(f.log.kinds(), vec![EventKind::TrackListEnd]);
    assert!(f.player.calls().is_empty());
}

#[test]
fn previous_at_first_position_is_a_boundary() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.activate(ids[0]);
    f.log.clear();

    assert_eq!(f.previous(), Step::Boundary(Direction::Previous));
    assert_eq!(f.cursor.active(), Some(ids[0]));
    assert_eq!(
        f.log.events(),
        vec![LibraryEvent::TrackListEnd(Direction::Previous)]
    );
}

#[test]
fn stepping_on_an_empty_view_is_a_boundary() {
    let (mut f, _) = Fixture::new(&[]);
    assert_eq!(f.next(), Step::Boundary(Direction::Next));
    assert_eq!(f.previous(), Step::Boundary(Direction::Previous));
    assert_eq!(f.cursor.active(), None);
}

#[test]
fn skip_on_single_track_fails_both_ways_and_reports_once() {
    let (mut f, ids) = Fixture::new(&["only"]);
    f.activate(ids[0]);
    f.log.clear();

    assert_eq!(f.skip(), Step::Boundary(Direction::Previous));
    assert_eq!(f.log.count(EventKind::TrackSkipped), 1);
    assert_eq!(f.log.count(EventKind::TrackListEnd), 2);
    assert_eq!(f.cursor.active(), Some(ids[0]));
    match f.log.events().last() {
        Some(LibraryEvent::TrackSkipped(Some(record))) => assert_eq!(record.id, ids[0]),
        other => panic!("expected skip event, got {other:?}"),
    }
}

#[test]
fn skip_at_end_falls_back_to_previous() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.activate(ids[1]);

    assert_eq!(f.skip(), Step::Moved(ids[0]));
}

#[test]
fn skip_without_context_reports_none() {
    let (mut f, ids) = Fixture::new(&["a"]);
    assert_eq!(f.skip(), Step::Moved(ids[0]));
    assert!(f.log.events().contains(&LibraryEvent::TrackSkipped(None)));
}

#[test]
fn navigation_follows_the_current_sort() {
    let (mut f, ids) = Fixture::new(&["c", "a", "b"]);
    f.sort.click(crate::view::SortAxis::Title);
    f.activate(ids[1]);

    assert_eq!(f.next(), Step::Moved(ids[2]));
    assert_eq!(f.next(), Step::Moved(ids[0]));
    assert_eq!(f.next(), Step::Boundary(Direction::Next));
}

#[test]
fn active_track_outside_filter_restarts_from_the_top() {
    let (mut f, ids) = Fixture::new(&["keep one", "drop", "keep two"]);
    f.activate(ids[1]);
    f.filter.search(&f.store, "keep").unwrap();

    assert_eq!(f.next(), Step::Moved(ids[0]));
}

#[test]
fn unplayable_track_still_becomes_active() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.player.break_path(f.store.get(ids[0]).unwrap().path);

    assert_eq!(f.next(), Step::Unplayable(ids[0]));
    assert_eq!(f.cursor.active(), Some(ids[0]));
    assert_eq!(f.log.count(EventKind::AudioFileError), 1);
    assert!(!f.player.calls().contains(&PlayerCall::Play));

    assert_eq!(f.next(), Step::Moved(ids[1]));
}

#[test]
fn activate_unknown_track_is_not_found() {
    let (mut f, _) = Fixture::new(&["a"]);
    let view = ActiveView::new(&f.store, &f.sort, &f.filter);
    let err = f
        .cursor
        .activate(TrackId(404), &view, &mut f.player, f.store.bus())
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(TrackId(404))));
    assert_eq!(f.cursor.active(), None);
}

#[test]
fn selection_moves_independently_and_clamps() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.activate(ids[0]);

    assert_eq!(f.select_step(Direction::Next), Some(ids[0]));
    assert_eq!(f.select_step(Direction::Next), Some(ids[1]));
    assert_eq!(f.select_step(Direction::Next), Some(ids[1]));
    assert_eq!(f.select_step(Direction::Previous), Some(ids[0]));
    assert_eq!(f.select_step(Direction::Previous), Some(ids[0]));
    assert_eq!(f.cursor.active(), Some(ids[0]));
}

#[test]
fn select_only_publishes_changes() {
    let (mut f, ids) = Fixture::new(&["a"]);
    f.cursor.select(Some(ids[0]), f.store.bus());
    f.cursor.select(Some(ids[0]), f.store.bus());

    assert_eq!(f.log.count(EventKind::SelectedTrackChanged), 1);
}

#[test]
fn forget_clears_pointers() {
    let (mut f, ids) = Fixture::new(&["a", "b"]);
    f.activate(ids[0]);
    f.cursor.select(Some(ids[0]), f.store.bus());
    f.log.clear();

    assert!(f.cursor.forget(ids[0], f.store.bus()));
    assert_eq!(f.cursor.active(), None);
    assert_eq!(f.cursor.selected(), None);
    assert_eq!(
        f.log.kinds(),
        vec![EventKind::SelectedTrackChanged, EventKind::ActiveTrackChanged]
    );
    assert!(!f.cursor.forget(ids[1], f.store.bus()));
}
