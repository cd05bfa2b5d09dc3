//! User intents as values that can be executed and undone.
//!
//! `dispatch` routes on `(kind, undo)`. Commands record whatever they need
//! to reverse themselves (the track they started, the ids they added, the
//! record they removed) in their own fields while executing. Combinations
//! without a handler are logged and ignored.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cursor::Step;
use crate::error::CommandError;
use crate::events::LibraryEvent;
use crate::library::{TrackId, TrackRecord};
use crate::session::Session;
use crate::view::{SortAxis, SortState};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play `track`; with `None`, resume or start from the selection.
    Play { track: Option<TrackId> },
    Pause,
    Stop,
    Next,
    Previous,
    Seek { to: Duration, from: Duration },
    AddTracks {
        paths: Vec<PathBuf>,
        added: Vec<TrackId>,
    },
    RemoveTrack {
        id: TrackId,
        removed: Option<TrackRecord>,
    },
    /// Click on `axis`; `state` holds the state the click produced.
    Sort { axis: SortAxis, state: SortState },
    Search {
        query: String,
        previous: Option<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek,
    AddTracks,
    RemoveTrack,
    Sort,
    Search,
}

impl Command {
    pub fn play(track: Option<TrackId>) -> Self {
        Command::Play { track }
    }

    pub fn seek(to: Duration, from: Duration) -> Self {
        Command::Seek { to, from }
    }

    pub fn add_tracks(paths: Vec<PathBuf>) -> Self {
        Command::AddTracks {
            paths,
            added: Vec::new(),
        }
    }

    pub fn remove_track(id: TrackId) -> Self {
        Command::RemoveTrack { id, removed: None }
    }

    pub fn sort(axis: SortAxis) -> Self {
        Command::Sort {
            axis,
            state: SortState::Default,
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Command::Search {
            query: query.into(),
            previous: None,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Play { .. } => CommandKind::Play,
            Command::Pause => CommandKind::Pause,
            Command::Stop => CommandKind::Stop,
            Command::Next => CommandKind::Next,
            Command::Previous => CommandKind::Previous,
            Command::Seek { .. } => CommandKind::Seek,
            Command::AddTracks { .. } => CommandKind::AddTracks,
            Command::RemoveTrack { .. } => CommandKind::RemoveTrack,
            Command::Sort { .. } => CommandKind::Sort,
            Command::Search { .. } => CommandKind::Search,
        }
    }
}

/// Execute (`undo == false`) or reverse (`undo == true`) `command`.
///
/// Failures are published as `CommandFailed` before being returned. The
/// returned `Step` is set for commands that moved the cursor.
pub fn dispatch(
    command: &mut Command,
    undo: bool,
    session: &mut Session,
) -> Result<Option<Step>, CommandError> {
    debug!(kind = ?command.kind(), undo, "dispatch");
    let result = run(command, undo, session);
    if let Err(e) = &result {
        warn!(kind = ?command.kind(), undo, error = %e, "command failed");
        session
            .bus()
            .publish(LibraryEvent::CommandFailed(e.to_string()));
    }
    result
}

fn run(
    command: &mut Command,
    undo: bool,
    session: &mut Session,
) -> Result<Option<Step>, CommandError> {
    match (command, undo) {
        (Command::Play { track }, false) => {
            let step = session.play(*track)?;
            *track = session.cursor().active();
            Ok(step)
        }
        (Command::Play { .. }, true) | (Command::Pause, false) => {
            session.pause();
            Ok(None)
        }
        (Command::Pause, true) => Ok(session.play(None)?),
        (Command::Stop, false) => {
            session.stop();
            Ok(None)
        }
        (Command::Next, false) | (Command::Previous, true) => Ok(Some(session.next()?)),
        (Command::Previous, false) | (Command::Next, true) => Ok(Some(session.previous()?)),
        (Command::Seek { to, .. }, false) => {
            session.seek(*to)?;
            Ok(None)
        }
        (Command::Seek { from, .. }, true) => {
            session.seek(*from)?;
            Ok(None)
        }
        (Command::AddTracks { paths, added }, false) => {
            *added = session.import_blocking(paths.clone());
            Ok(None)
        }
        (Command::AddTracks { added, .. }, true) => {
            // An id leaves `added` only once it is gone, so a failed undo can be retried.
            while let Some(&id) = added.last() {
                session.remove_track(id)?;
                added.pop();
            }
            Ok(None)
        }
        (Command::RemoveTrack { id, removed }, false) => {
            *removed = session.remove_track(*id)?;
            Ok(None)
        }
        (Command::RemoveTrack { id, removed }, true) => {
            let record = removed
                .take()
                .ok_or_else(|| CommandError::UndoUnavailable(format!("track {id} was not removed")))?;
            *id = reload(session, &record).inspect_err(|_| *removed = Some(record))?;
            Ok(None)
        }
        (Command::Sort { axis, state }, false) => {
            *state = session.click_sort(*axis)?;
            Ok(None)
        }
        (Command::Sort { axis, state }, true) => {
            let back = state.previous();
            session.set_sort(*axis, back)?;
            *state = back;
            Ok(None)
        }
        (Command::Search { query, previous }, false) => {
            *previous = session.filter().query().map(str::to_string);
            session.search(query)?;
            Ok(None)
        }
        (Command::Search { previous, .. }, true) => {
            session.search(previous.as_deref().unwrap_or_default())?;
            Ok(None)
        }
        (command, undo) => {
            warn!(kind = ?command.kind(), undo, "no handler, ignored");
            Ok(None)
        }
    }
}

/// Re-import a removed record from its file. The record comes back under a
/// new id.
fn reload(session: &mut Session, record: &TrackRecord) -> Result<TrackId, CommandError> {
    let path = record.path();
    if !path.exists() {
        return Err(CommandError::UndoUnavailable(format!(
            "{} no longer exists",
            path.display()
        )));
    }
    if let Some(id) = session.import_blocking(vec![path.to_path_buf()]).first() {
        return Ok(*id);
    }
    match session.store().find_by_path(path)? {
        Some(existing) => Ok(existing.id),
        None => Err(CommandError::UndoUnavailable(format!(
            "cannot reload {}",
            path.display()
        ))),
    }
}
