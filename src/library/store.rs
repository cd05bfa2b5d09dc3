//! SQLite-backed track store.
//!
//! One table of track records keyed by an `AUTOINCREMENT` id, so ids are
//! never handed out twice even after deletes. `path` is unique: re-importing
//! a known file updates the existing row instead of adding another one.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, Row, params};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::events::{EventBus, LibraryEvent};
use crate::view::OrderSpec;

use super::model::{
    Enrichment, PropertyValue, TrackId, TrackMetadata, TrackProperty, TrackRecord, join_list,
    split_list,
};

const TRACK_SELECT: &str = "
SELECT
    id,
    title,
    artist,
    album,
    duration,
    bpm,
    path,
    album_track_number,
    genius_url,
    genius_song_id,
    samples,
    sampled_bys
FROM tracks
";

pub struct TrackStore {
    conn: Connection,
    bus: Rc<EventBus>,
}

impl TrackStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path, bus: Rc<EventBus>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Validation(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn, bus };
        store.register_functions()?;
        store.initialize_schema()?;
        info!(path = %path.display(), tracks = store.count()?, "opened track store");
        Ok(store)
    }

    pub fn open_in_memory(bus: Rc<EventBus>) -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            bus,
        };
        store.register_functions()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// `fold_case(text)` lowercases with full Unicode rules; SQLite's own
    /// `lower` and `LIKE` only fold ASCII.
    fn register_functions(&self) -> Result<(), StoreError> {
        self.conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
        )?;
        Ok(())
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                album TEXT NOT NULL,
                duration TEXT NOT NULL,
                bpm INTEGER,
                path TEXT NOT NULL UNIQUE,
                album_track_number INTEGER NOT NULL DEFAULT 0,
                genius_url TEXT,
                genius_song_id INTEGER,
                samples TEXT,
                sampled_bys TEXT
            );",
        )?;
        Ok(())
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Insert a new record, filling placeholders for missing fields.
    pub fn insert(&mut self, meta: &TrackMetadata) -> Result<TrackId, StoreError> {
        let path = path_text(meta)?;
        self.conn
            .execute(
                "INSERT INTO tracks (title, artist, album, duration, bpm, path, album_track_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    meta.resolved_title(),
                    meta.resolved_artist(),
                    meta.resolved_album(),
                    meta.resolved_duration(),
                    meta.bpm,
                    path,
                    meta.album_track_number.unwrap_or(0),
                ],
            )
            .map_err(|e| map_constraint(e, &path))?;
        let id = TrackId(self.conn.last_insert_rowid());
        let record = self.get(id)?;
        debug!(%id, path = %record.path.display(), "inserted track");
        self.bus.publish(LibraryEvent::TrackAdded(record));
        Ok(id)
    }

    /// Update the record stored under `meta.path` or insert a new one.
    pub fn upsert(&mut self, meta: &TrackMetadata) -> Result<TrackId, StoreError> {
        let path = path_text(meta)?;
        let Some(existing) = self.find_by_path(&meta.path)? else {
            return self.insert(meta);
        };

        self.conn.execute(
            "UPDATE tracks
             SET title = ?1, artist = ?2, album = ?3, duration = ?4, bpm = ?5, album_track_number = ?6
             WHERE id = ?7",
            params![
                meta.resolved_title(),
                meta.resolved_artist(),
                meta.resolved_album(),
                meta.resolved_duration(),
                meta.bpm,
                meta.album_track_number.unwrap_or(0),
                existing.id,
            ],
        )?;
        let record = self.get(existing.id)?;
        debug!(id = %record.id, path = %path, "updated track from re-import");
        self.bus.publish(LibraryEvent::TrackUpdated(record));
        Ok(existing.id)
    }

    pub fn get(&self, id: TrackId) -> Result<TrackRecord, StoreError> {
        match self.conn.query_row(
            &format!("{TRACK_SELECT} WHERE id = ?1"),
            params![id],
            row_to_record,
        ) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, id: TrackId) -> Result<bool, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn find_by_path(&self, path: &Path) -> Result<Option<TrackRecord>, StoreError> {
        match self.conn.query_row(
            &format!("{TRACK_SELECT} WHERE path = ?1"),
            params![path.to_string_lossy()],
            row_to_record,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_property(&self, id: TrackId, name: &str) -> Result<PropertyValue, StoreError> {
        let property: TrackProperty = name.parse()?;
        let sql = format!("SELECT {} FROM tracks WHERE id = ?1", property.column());
        match self.conn.query_row(&sql, params![id], |r| r.get(0)) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_property(
        &mut self,
        id: TrackId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        let property: TrackProperty = name.parse()?;
        if property == TrackProperty::TrackId {
            return Err(StoreError::InvalidProperty(name.to_string()));
        }
        match (&value, property.is_integer()) {
            (PropertyValue::Null, _) if !property.is_nullable() => {
                return Err(StoreError::Validation(format!("{property} cannot be empty")));
            }
            (PropertyValue::Text(_), true) => {
                return Err(StoreError::Validation(format!("{property} expects an integer")));
            }
            (PropertyValue::Integer(_), false) => {
                return Err(StoreError::Validation(format!("{property} expects text")));
            }
            (PropertyValue::Integer(n), true)
                if matches!(property, TrackProperty::Bpm | TrackProperty::AlbumTrackNumber)
                    && u32::try_from(*n).is_err() =>
            {
                return Err(StoreError::Validation(format!(
                    "{property} out of range: {n}"
                )));
            }
            (PropertyValue::Text(s), false) if property == TrackProperty::Path && s.is_empty() => {
                return Err(StoreError::Validation("path must not be empty".to_string()));
            }
            _ => {}
        }

        let sql = format!("UPDATE tracks SET {} = ?1 WHERE id = ?2", property.column());
        let changed = self
            .conn
            .execute(&sql, params![value, id])
            .map_err(|e| map_constraint(e, value.as_text().unwrap_or_default()))?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Remove a record. Deleting an absent id is not an error: it is logged
    /// and reported as `Ok(None)`, so repeated undo paths stay harmless.
    pub fn delete(&mut self, id: TrackId) -> Result<Option<TrackRecord>, StoreError> {
        let record = match self.get(id) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                warn!(%id, "delete of absent track ignored");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.conn
            .execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        debug!(%id, "deleted track");
        self.bus.publish(LibraryEvent::TrackRemoved(record.clone()));
        Ok(Some(record))
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn all(&self) -> Result<Vec<TrackRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{TRACK_SELECT} ORDER BY id ASC"))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Every id, ordered by `spec` (ties broken by id).
    pub fn ids_ordered_by(&self, spec: &OrderSpec) -> Result<Vec<TrackId>, StoreError> {
        let sql = format!("SELECT id FROM tracks ORDER BY {}", spec.order_by_clause());
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<TrackId>, _>>()?;
        Ok(ids)
    }

    /// Ids whose title, artist or album contains `needle` ignoring case,
    /// de-duplicated.
    pub fn search_ids(&self, needle: &str) -> Result<Vec<TrackId>, StoreError> {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        let mut stmt = self.conn.prepare_cached(
            r"SELECT id FROM tracks WHERE fold_case(title) LIKE ?1 ESCAPE '\'
              UNION SELECT id FROM tracks WHERE fold_case(artist) LIKE ?1 ESCAPE '\'
              UNION SELECT id FROM tracks WHERE fold_case(album) LIKE ?1 ESCAPE '\'",
        )?;
        let ids = stmt
            .query_map(params![pattern], |r| r.get(0))?
            .collect::<Result<Vec<TrackId>, _>>()?;
        Ok(ids)
    }

    /// Fill only the enrichment fields that are still empty.
    /// Returns `true` if anything was written.
    pub fn cache_enrichment(
        &mut self,
        id: TrackId,
        found: &Enrichment,
    ) -> Result<bool, StoreError> {
        let current = self.get(id)?.enrichment;
        let mut writes: Vec<(TrackProperty, PropertyValue)> = Vec::new();

        if current.genius_url.is_none() {
            if let Some(url) = found.genius_url.as_deref().filter(|s| !s.is_empty()) {
                writes.push((TrackProperty::GeniusUrl, url.into()));
            }
        }
        if current.genius_song_id.is_none() {
            if let Some(song_id) = found.genius_song_id {
                writes.push((TrackProperty::GeniusSongId, song_id.into()));
            }
        }
        if current.samples.is_empty() {
            if let Some(list) = join_list(&found.samples) {
                writes.push((TrackProperty::Samples, list.into()));
            }
        }
        if current.sampled_bys.is_empty() {
            if let Some(list) = join_list(&found.sampled_bys) {
                writes.push((TrackProperty::SampledBys, list.into()));
            }
        }

        let wrote = !writes.is_empty();
        for (property, value) in writes {
            self.set_property(id, property.name(), value)?;
        }
        if wrote {
            debug!(%id, "cached enrichment");
        }
        Ok(wrote)
    }

    pub fn needs_enrichment(&self, id: TrackId) -> Result<bool, StoreError> {
        Ok(!self.get(id)?.enrichment.is_complete())
    }
}

fn path_text(meta: &TrackMetadata) -> Result<String, StoreError> {
    if meta.path.as_os_str().is_empty() {
        return Err(StoreError::Validation("path must not be empty".to_string()));
    }
    Ok(meta.path.to_string_lossy().into_owned())
}

fn map_constraint(e: rusqlite::Error, path: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Validation(format!("a track with path {path} already exists"))
        }
        other => other.into(),
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn row_to_record(row: &Row) -> rusqlite::Result<TrackRecord> {
    let path: String = row.get("path")?;
    Ok(TrackRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        artist: row.get("artist")?,
        album: row.get("album")?,
        duration: row.get("duration")?,
        bpm: row.get("bpm")?,
        path: path.into(),
        album_track_number: row.get("album_track_number")?,
        enrichment: Enrichment {
            genius_url: row.get("genius_url")?,
            genius_song_id: row.get("genius_song_id")?,
            samples: split_list(row.get("samples")?),
            sampled_bys: split_list(row.get("sampled_bys")?),
        },
    })
}
