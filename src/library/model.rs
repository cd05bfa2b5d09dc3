use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::StoreError;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_DURATION: &str = "0:00";

/// Store-assigned identifier of a track record. Never reused after deletion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl ToSql for TrackId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for TrackId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(TrackId)
    }
}

/// Raw metadata handed to the store by the import side.
///
/// Missing fields are replaced by placeholders when the record is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub path: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub bpm: Option<u32>,
    pub album_track_number: Option<u32>,
}

impl TrackMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn album_track_number(mut self, n: u32) -> Self {
        self.album_track_number = Some(n);
        self
    }

    pub fn duration(mut self, d: Duration) -> Self {
        self.duration = Some(d);
        self
    }

    pub fn bpm(mut self, bpm: u32) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub(crate) fn resolved_title(&self) -> String {
        non_blank(self.title.as_deref())
            .or_else(|| {
                self.path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or(UNKNOWN_TITLE)
            .to_string()
    }

    pub(crate) fn resolved_artist(&self) -> String {
        non_blank(self.artist.as_deref())
            .unwrap_or(UNKNOWN_ARTIST)
            .to_string()
    }

    pub(crate) fn resolved_album(&self) -> String {
        non_blank(self.album.as_deref())
            .unwrap_or(UNKNOWN_ALBUM)
            .to_string()
    }

    pub(crate) fn resolved_duration(&self) -> String {
        self.duration
            .map(format_duration)
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Format a `Duration` as `m:ss`, the form stored on the record.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// A persisted track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub bpm: Option<u32>,
    pub path: PathBuf,
    pub album_track_number: u32,
    pub enrichment: Enrichment,
}

impl TrackRecord {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Artist - Title`, used by the list view and log lines.
    pub fn display(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Lazily resolved lookup data. Once a field is non-empty it is cached truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub genius_url: Option<String>,
    pub genius_song_id: Option<i64>,
    pub samples: Vec<String>,
    pub sampled_bys: Vec<String>,
}

impl Enrichment {
    pub fn is_complete(&self) -> bool {
        self.genius_url.is_some()
            && self.genius_song_id.is_some()
            && !self.samples.is_empty()
            && !self.sampled_bys.is_empty()
    }
}

pub(crate) fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join("\n"))
    }
}

pub(crate) fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// The closed set of record fields reachable through property access.
///
/// Column names only ever come from this enum, so no caller-supplied text
/// reaches the SQL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    TrackId,
    Title,
    Artist,
    Album,
    Duration,
    Bpm,
    Path,
    AlbumTrackNumber,
    GeniusUrl,
    GeniusSongId,
    Samples,
    SampledBys,
}

impl TrackProperty {
    pub const ALL: [TrackProperty; 12] = [
        TrackProperty::TrackId,
        TrackProperty::Title,
        TrackProperty::Artist,
        TrackProperty::Album,
        TrackProperty::Duration,
        TrackProperty::Bpm,
        TrackProperty::Path,
        TrackProperty::AlbumTrackNumber,
        TrackProperty::GeniusUrl,
        TrackProperty::GeniusSongId,
        TrackProperty::Samples,
        TrackProperty::SampledBys,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackProperty::TrackId => "TrackID",
            TrackProperty::Title => "Title",
            TrackProperty::Artist => "Artist",
            TrackProperty::Album => "Album",
            TrackProperty::Duration => "Duration",
            TrackProperty::Bpm => "BPM",
            TrackProperty::Path => "Path",
            TrackProperty::AlbumTrackNumber => "AlbumTrackNumber",
            TrackProperty::GeniusUrl => "GeniusUrl",
            TrackProperty::GeniusSongId => "GeniusSongID",
            TrackProperty::Samples => "Samples",
            TrackProperty::SampledBys => "SampledBys",
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            TrackProperty::TrackId => "id",
            TrackProperty::Title => "title",
            TrackProperty::Artist => "artist",
            TrackProperty::Album => "album",
            TrackProperty::Duration => "duration",
            TrackProperty::Bpm => "bpm",
            TrackProperty::Path => "path",
            TrackProperty::AlbumTrackNumber => "album_track_number",
            TrackProperty::GeniusUrl => "genius_url",
            TrackProperty::GeniusSongId => "genius_song_id",
            TrackProperty::Samples => "samples",
            TrackProperty::SampledBys => "sampled_bys",
        }
    }

    pub(crate) fn is_integer(self) -> bool {
        matches!(
            self,
            TrackProperty::TrackId
                | TrackProperty::Bpm
                | TrackProperty::AlbumTrackNumber
                | TrackProperty::GeniusSongId
        )
    }

    pub(crate) fn is_nullable(self) -> bool {
        matches!(
            self,
            TrackProperty::Bpm
                | TrackProperty::GeniusUrl
                | TrackProperty::GeniusSongId
                | TrackProperty::Samples
                | TrackProperty::SampledBys
        )
    }
}

impl fmt::Display for TrackProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackProperty {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TrackProperty::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted) || p.column() == wanted)
            .ok_or_else(|| StoreError::InvalidProperty(s.to_string()))
    }
}

/// A single field value read from or written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Null,
    Integer(i64),
    Text(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl ToSql for PropertyValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            PropertyValue::Null => Ok(ToSqlOutput::from(rusqlite::types::Null)),
            PropertyValue::Integer(n) => Ok(ToSqlOutput::from(*n)),
            PropertyValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl FromSql for PropertyValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(PropertyValue::Null),
            ValueRef::Integer(n) => Ok(PropertyValue::Integer(n)),
            ValueRef::Text(_) => String::column_result(value).map(PropertyValue::Text),
            ValueRef::Real(_) | ValueRef::Blob(_) => {
                Err(rusqlite::types::FromSqlError::InvalidType)
            }
        }
    }
}
