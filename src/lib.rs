//! vinyl: a music library with sortable, searchable navigation.
//!
//! The engines (`library`, `view`, `cursor`, `command`) share one
//! `events::EventBus` and are owned together by `session::Session`. The
//! `runtime` drives them from a crossterm loop and renders with `ui`.

pub mod audio;
pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod events;
pub mod library;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
