use std::path::{Path, PathBuf};

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::{Accessor, ItemKey};
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::MediaError;

use super::model::TrackMetadata;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Audio files under `dir`, sorted by path.
pub fn collect_audio_files(dir: &Path, settings: &LibrarySettings) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() || e.path().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_audio_file(p, settings))
        .collect();

    files.sort();
    files
}

/// Read the tags of one file.
///
/// Files lofty cannot parse are `Unsupported`; files it parses but that
/// carry no tag at all are `Untagged` and are not imported.
pub fn read_tags(path: &Path) -> Result<TrackMetadata, MediaError> {
    if !path.exists() {
        return Err(MediaError::Missing(path.to_path_buf()));
    }
    let tagged = lofty::read_from_path(path).map_err(|e| MediaError::Unsupported {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Err(MediaError::Untagged(path.to_path_buf()));
    };

    let mut meta = TrackMetadata::new(path).duration(tagged.properties().duration());
    meta.title = tag.title().map(|v| v.trim().to_string());
    meta.artist = tag.artist().map(|v| v.trim().to_string());
    meta.album = tag.album().map(|v| v.trim().to_string());
    meta.album_track_number = tag.track();
    meta.bpm = tag
        .items()
        .find(|item| matches!(item.key(), ItemKey::Bpm))
        .and_then(|item| item.value().text())
        .and_then(parse_bpm);
    Ok(meta)
}

fn parse_bpm(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v.round() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_string))
            .collect()
    }

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));

        let dotted = LibrarySettings {
            extensions: vec![".OPUS".into()],
            ..LibrarySettings::default()
        };
        assert!(is_audio_file(Path::new("/tmp/a.opus"), &dotted));
    }

    #[test]
    fn collect_filters_non_audio_and_sorts_by_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("a.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();

        let files = collect_audio_files(dir.path(), &LibrarySettings::default());
        assert_eq!(names(&files), vec!["a.ogg", "b.MP3"]);
    }

    #[test]
    fn collect_skips_hidden_by_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();
        let hidden_dir = dir.path().join(".cache");
        fs::create_dir_all(&hidden_dir).unwrap();
        fs::write(hidden_dir.join("inner.mp3"), b"not real").unwrap();

        let files = collect_audio_files(dir.path(), &LibrarySettings::default());
        assert_eq!(names(&files), vec!["visible.mp3"]);

        let settings = LibrarySettings {
            include_hidden: true,
            ..LibrarySettings::default()
        };
        assert_eq!(collect_audio_files(dir.path(), &settings).len(), 3);
    }

    #[test]
    fn collect_respects_recursive_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("child.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            recursive: false,
            ..LibrarySettings::default()
        };
        assert_eq!(names(&collect_audio_files(dir.path(), &settings)), vec!["root.mp3"]);
    }

    #[test]
    fn collect_respects_max_depth() {
        let dir = tempdir().unwrap();
        let d1 = dir.path().join("d1");
        let d2 = d1.join("d2");
        fs::create_dir_all(&d2).unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        fs::write(d1.join("one.mp3"), b"not real").unwrap();
        fs::write(d2.join("two.mp3"), b"not real").unwrap();

        // WalkDir depth counts root as 0, children as 1, grandchildren as 2.
        let settings = LibrarySettings {
            max_depth: Some(2),
            ..LibrarySettings::default()
        };
        let found = names(&collect_audio_files(dir.path(), &settings));
        assert!(found.contains(&"root.mp3".to_string()));
        assert!(found.contains(&"one.mp3".to_string()));
        assert!(!found.contains(&"two.mp3".to_string()));
    }

    #[test]
    fn read_tags_reports_missing_file() {
        let err = read_tags(Path::new("/definitely/not/here.mp3")).unwrap_err();
        assert!(matches!(err, MediaError::Missing(_)));
    }

    #[test]
    fn read_tags_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        fs::write(&path, b"definitely not audio").unwrap();

        let err = read_tags(&path).unwrap_err();
        assert!(matches!(err, MediaError::Unsupported { .. }));
        assert_eq!(err.path(), Some(&path));
    }

    #[test]
    fn bpm_accepts_integers_and_decimals() {
        assert_eq!(parse_bpm("120"), Some(120));
        assert_eq!(parse_bpm(" 97.6 "), Some(98));
        assert_eq!(parse_bpm("fast"), None);
        assert_eq!(parse_bpm("-3"), None);
    }
}
