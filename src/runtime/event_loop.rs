use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, error, warn};

use crate::audio::PlaybackState;
use crate::command::{Command, dispatch};
use crate::config;
use crate::cursor::{Direction, Step};
use crate::library::{ImportBatch, TrackRecord};
use crate::session::Session;
use crate::ui::{self, ViewModel};
use crate::view::{SortAxis, SortState};

use super::feed::StatusFeed;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum InputMode {
    Browse,
    /// Typing a query. Holds the filter that was active before.
    Search,
}

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    feed: Rc<StatusFeed>,
    import: Option<ImportBatch>,
    mode: InputMode,
    query: String,
    search_origin: Option<String>,
    /// The one command `u` can undo.
    last: Option<Command>,
    rows: Vec<TrackRecord>,
    dir: PathBuf,
    details: bool,
    pending_gg: bool,
}

impl EventLoopState {
    pub fn new(feed: Rc<StatusFeed>, import: Option<ImportBatch>, dir: PathBuf) -> Self {
        Self {
            feed,
            import,
            mode: InputMode::Browse,
            query: String::new(),
            search_origin: None,
            last: None,
            rows: Vec::new(),
            dir,
            details: false,
            pending_gg: false,
        }
    }
}

/// Main terminal event loop: applies import results, auto-advances, draws and
/// handles input. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    session: &mut Session,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if let Some(batch) = state.import.as_mut() {
            session.drain_import(batch, false);
            if batch.in_flight() == 0 {
                state.import = None;
            }
        }

        match session.advance_if_finished() {
            Ok(Some(step)) => settle_step(session, step),
            Ok(None) => {}
            Err(e) => error!(error = %e, "auto-advance failed"),
        }

        if state.feed.take_rows_dirty() {
            state.rows = load_rows(session);
        }

        let vm = view_model(session, state);
        terminal.draw(|f| ui::draw(f, &vm, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, session, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn load_rows(session: &Session) -> Vec<TrackRecord> {
    let ids = match session.view().materialize() {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "cannot materialize view");
            return Vec::new();
        }
    };
    ids.into_iter()
        .filter_map(|id| session.store().get(id).ok())
        .collect()
}

fn sort_label(session: &Session) -> String {
    match session.sort().primary() {
        None => "SORT: default".to_string(),
        Some(axis) => match session.sort().state(axis) {
            SortState::Reverse => format!("SORT: {axis} desc"),
            _ => format!("SORT: {axis} asc"),
        },
    }
}

fn view_model<'a>(session: &'a Session, state: &'a EventLoopState) -> ViewModel<'a> {
    let active = session.cursor().active();
    let now_playing = active
        .and_then(|id| session.store().get(id).ok())
        .map(|r| r.display());
    let playing = session.playback_state() != PlaybackState::Stopped;
    ViewModel {
        rows: &state.rows,
        selected: session.cursor().selected(),
        active,
        now_playing: now_playing.filter(|_| playing),
        playback: session.playback_state(),
        elapsed: session.position(),
        total: session.player().duration(),
        sort: sort_label(session),
        filter: session.filter().query(),
        no_results: session.filter().has_no_results(),
        search_input: (state.mode == InputMode::Search).then_some(state.query.as_str()),
        message: state.feed.message(),
        importing: state.import.as_ref().map(ImportBatch::in_flight),
        dir: &state.dir,
        details: state.details,
    }
}

/// Follow an unplayable step with skips until something plays or the view
/// runs out. At most one skip per track in the view.
fn settle_step(session: &mut Session, step: Step) {
    let mut step = step;
    let mut budget = session.view().len().unwrap_or(0);
    while let Step::Unplayable(id) = step {
        if budget == 0 {
            warn!(%id, "no playable track left");
            session.stop();
            return;
        }
        budget -= 1;
        step = match session.skip() {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "skip failed");
                return;
            }
        };
    }
}

/// Run `command` and keep it in the undo slot if it succeeded.
fn execute(session: &mut Session, state: &mut EventLoopState, mut command: Command) {
    match dispatch(&mut command, false, session) {
        Ok(step) => {
            if let Some(step) = step {
                settle_step(session, step);
            }
            state.last = Some(command);
        }
        Err(e) => debug!(error = %e, "command not recorded"),
    }
}

fn undo(session: &mut Session, state: &mut EventLoopState) {
    let Some(mut command) = state.last.take() else {
        return;
    };
    match dispatch(&mut command, true, session) {
        Ok(Some(step)) => settle_step(session, step),
        Ok(None) => {}
        Err(e) => {
            debug!(error = %e, "undo failed, command kept");
            state.last = Some(command);
        }
    }
}

fn select_edge(session: &mut Session, state: &EventLoopState, first: bool) {
    let edge = if first {
        state.rows.first()
    } else {
        state.rows.last()
    };
    if let Some(record) = edge {
        session.select(Some(record.id));
    }
}

fn handle_search_key(key: KeyEvent, session: &mut Session, state: &mut EventLoopState) {
    let live = |session: &mut Session, query: &str| {
        if let Err(e) = session.search(query) {
            error!(error = %e, "search failed");
        }
    };
    match key.code {
        KeyCode::Esc => {
            let origin = state.search_origin.take().unwrap_or_default();
            live(session, &origin);
            state.mode = InputMode::Browse;
        }
        KeyCode::Enter => {
            state.mode = InputMode::Browse;
            state.last = Some(Command::Search {
                query: state.query.clone(),
                previous: state.search_origin.take(),
            });
        }
        KeyCode::Backspace => {
            state.query.pop();
            live(session, &state.query);
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let _ = session.select_step(Direction::Next);
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let _ = session.select_step(Direction::Previous);
        }
        KeyCode::Char(c) if !c.is_control() => {
            state.query.push(c);
            live(session, &state.query);
        }
        _ => {}
    }
}

/// Returns `true` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    session: &mut Session,
    state: &mut EventLoopState,
) -> bool {
    if state.mode == InputMode::Search {
        handle_search_key(key, session, state);
        return false;
    }

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }
    let scrub = Duration::from_secs(settings.controls.scrub_seconds);

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('/') => {
            state.search_origin = session.filter().query().map(str::to_string);
            state.query = state.search_origin.clone().unwrap_or_default();
            state.mode = InputMode::Search;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let _ = session.select_step(Direction::Next);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let _ = session.select_step(Direction::Previous);
        }
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                select_edge(session, state, true);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => select_edge(session, state, false),
        KeyCode::Enter => {
            let selected = session.cursor().selected();
            execute(session, state, Command::play(selected));
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let command = match session.playback_state() {
                PlaybackState::Playing => Command::Pause,
                PlaybackState::Paused | PlaybackState::Stopped => Command::play(None),
            };
            execute(session, state, command);
        }
        KeyCode::Char('s') => execute(session, state, Command::Stop),
        KeyCode::Char('l') => execute(session, state, Command::Next),
        KeyCode::Char('h') => execute(session, state, Command::Previous),
        KeyCode::Char('L') => {
            let from = session.position();
            execute(session, state, Command::seek(from + scrub, from));
        }
        KeyCode::Char('H') => {
            let from = session.position();
            execute(session, state, Command::seek(from.saturating_sub(scrub), from));
        }
        KeyCode::Char(c @ '1'..='4') => {
            let axis = SortAxis::ALL[(c as u8 - b'1') as usize];
            execute(session, state, Command::sort(axis));
        }
        KeyCode::Char('d') => {
            if let Some(id) = session.cursor().selected() {
                execute(session, state, Command::remove_track(id));
            }
        }
        KeyCode::Char('u') => undo(session, state),
        KeyCode::Char('K') => state.details = !state.details,
        _ => {}
    }

    false
}
