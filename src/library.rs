//! Track records, their SQLite store and the file import side.
//!
//! `store::TrackStore` is the only owner of persisted records. `scan` finds
//! audio files and reads their tags; `import` fans that work out to worker
//! threads for large directories.

mod import;
mod model;
pub mod scan;
mod store;

pub use import::*;
pub use model::*;
pub use store::TrackStore;
