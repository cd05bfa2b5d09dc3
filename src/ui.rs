//! UI rendering helpers for the terminal user interface.
//!
//! `draw` renders a `ViewModel` assembled by the runtime each frame; nothing
//! here touches the engines directly.

use std::path::Path;
use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::audio::PlaybackState;
use crate::config::{ControlsSettings, UiSettings};
use crate::library::{TrackId, TrackRecord};

/// Key hints shown in the footer, in display order.
const CONTROLS: [(&str, &str); 12] = [
    ("j/k", "select"),
    ("gg/G", "top/bottom"),
    ("enter", "play selected"),
    ("space/p", "play/pause"),
    ("s", "stop"),
    ("h/l", "prev/next"),
    ("1-4", "sort #/title/album/artist"),
    ("/", "search"),
    ("d", "remove"),
    ("u", "undo"),
    ("K", "details"),
    ("q", "quit"),
];

/// Everything one frame needs.
pub struct ViewModel<'a> {
    pub rows: &'a [TrackRecord],
    pub selected: Option<TrackId>,
    pub active: Option<TrackId>,
    pub now_playing: Option<String>,
    pub playback: PlaybackState,
    pub elapsed: Duration,
    pub total: Option<Duration>,
    pub sort: String,
    pub filter: Option<&'a str>,
    pub no_results: bool,
    /// Query being typed, while in search mode.
    pub search_input: Option<&'a str>,
    pub message: Option<String>,
    pub importing: Option<usize>,
    pub dir: &'a Path,
    pub details: bool,
}

fn controls_text(scrub_seconds: u64) -> String {
    let mut parts: Vec<String> = CONTROLS
        .iter()
        .map(|(k, v)| format!("[{k}] {v}"))
        .collect();
    parts.insert(6, format!("[H/L] seek -/+{scrub_seconds}s"));
    parts.join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn status_text(vm: &ViewModel<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    match &vm.now_playing {
        Some(song) => {
            let time = match vm.total {
                Some(total) => format!("{}/{}", format_mmss(vm.elapsed), format_mmss(total)),
                None => format_mmss(vm.elapsed),
            };
            parts.push(format!("{}: {song} [{time}]", vm.playback.label()));
        }
        None => parts.push(vm.playback.label().to_string()),
    }

    parts.push(vm.sort.clone());

    if let Some(input) = vm.search_input {
        parts.push(format!("SEARCH: {input}_"));
    } else if let Some(q) = vm.filter {
        if vm.no_results {
            parts.push(format!("FILTER: {q} (no results)"));
        } else {
            parts.push(format!("FILTER: {q}"));
        }
    }

    if let Some(n) = vm.importing {
        parts.push(format!("importing {n}..."));
    }

    parts.push(format!("Dir: {}", vm.dir.display()));

    if let Some(msg) = &vm.message {
        parts.push(msg.clone());
    }

    parts.join(" • ")
}

fn row_text(record: &TrackRecord, active: bool) -> String {
    let marker = if active { "▶ " } else { "  " };
    format!(
        "{marker}{:>3}  {}  ·  {}  ·  {}  {}",
        record.album_track_number, record.title, record.artist, record.album, record.duration
    )
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Visible slice `[start, end)` of `total` rows keeping `selected` centered
/// where possible.
fn window(total: usize, height: usize, selected: usize) -> (usize, usize) {
    if total <= height || height == 0 {
        return (0, total);
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn details_text(record: &TrackRecord) -> String {
    let bpm = record
        .bpm
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());
    let genius = record.enrichment.genius_url.as_deref().unwrap_or("-");
    format!(
        "Title: {}\nArtist: {}\nAlbum: {} (#{})\nDuration: {}  BPM: {bpm}\nGenius: {genius}\nPath: {}",
        record.title,
        record.artist,
        record.album,
        record.album_track_number,
        record.duration,
        record.path.display()
    )
}

/// Render the entire UI into `frame`.
pub fn draw(
    frame: &mut Frame,
    vm: &ViewModel<'_>,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" vinyl ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_text(vm))
        .block(
            Block::bordered()
                .padding(Padding::left(1))
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    // Only build items for the visible window.
    let selected_pos = vm
        .selected
        .and_then(|id| vm.rows.iter().position(|r| r.id == id));
    let (start, end) = window(
        vm.rows.len(),
        chunks[2].height.saturating_sub(2) as usize,
        selected_pos.unwrap_or(0),
    );
    let items: Vec<ListItem> = vm.rows[start..end]
        .iter()
        .map(|r| {
            let item = ListItem::new(row_text(r, vm.active == Some(r.id)));
            if vm.active == Some(r.id) {
                item.bold()
            } else {
                item
            }
        })
        .collect();
    let title = format!(" tracks ({}) ", vm.rows.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(selected_pos.map(|p| p - start));
    frame.render_stateful_widget(list, chunks[2], &mut state);

    if vm.details {
        let popup = centered_rect_sized(80, 9, chunks[2]);
        frame.render_widget(Clear, popup);
        let text = selected_pos
            .map(|p| details_text(&vm.rows[p]))
            .unwrap_or_else(|| "No track selected".to_string());
        let details = Paragraph::new(text)
            .block(
                Block::default()
                    .padding(Padding::left(1))
                    .borders(Borders::ALL)
                    .title(" details (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(details, popup);
    }

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding::left(1)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmss_pads_minutes_and_seconds() {
        assert_eq!(format_mmss(Duration::from_secs(0)), "00:00");
        assert_eq!(format_mmss(Duration::from_secs(754)), "12:34");
    }

    #[test]
    fn window_keeps_selection_centered_and_in_range() {
        assert_eq!(window(5, 10, 3), (0, 5));
        assert_eq!(window(100, 10, 50), (45, 55));
        assert_eq!(window(100, 10, 2), (0, 10));
        assert_eq!(window(100, 10, 99), (90, 100));
    }

    #[test]
    fn controls_include_scrub_amount() {
        let text = controls_text(7);
        assert!(text.contains("[H/L] seek -/+7s"));
        assert!(text.starts_with("[j/k] select"));
    }
}
