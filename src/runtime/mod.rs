use std::env;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use crate::audio::AudioPlayer;
use crate::config::StoreSettings;
use crate::events::{EventBus, ListenerRef};
use crate::library::{TrackStore, scan};
use crate::logging;
use crate::session::Session;
use crate::view::SortEngine;

mod event_loop;
mod feed;
mod settings;

pub use feed::StatusFeed;

fn open_store(
    settings: &StoreSettings,
    bus: Rc<EventBus>,
) -> Result<TrackStore, Box<dyn std::error::Error>> {
    match settings.resolved_database_path() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            info!(db = %path.display(), "opening library");
            Ok(TrackStore::open(&path, bus)?)
        }
        None => {
            error!("no data directory, library will not persist");
            Ok(TrackStore::open_in_memory(bus)?)
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    let _log_guard = match logging::init_logging(&settings.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("vinyl: logging disabled: {e}");
            None
        }
    };

    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"));

    let bus = Rc::new(EventBus::new());
    let feed = Rc::new(StatusFeed::new());
    let listener: ListenerRef = feed.clone();
    bus.register_all(listener);

    let store = open_store(&settings.store, bus)?;
    let player = AudioPlayer::spawn()?;
    let mut session = Session::new(
        store,
        SortEngine::new(settings.sort.full_reverse),
        Box::new(player),
    )
    .with_import_workers(settings.library.import_workers);

    let files = scan::collect_audio_files(&dir, &settings.library);
    let import = session.start_import(files);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::new(feed, Some(import), dir);
    let run_result = event_loop::run(&mut terminal, &settings, &mut session, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("bye");
    run_result
}
