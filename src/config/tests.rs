use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_vinyl_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("VINYL_CONFIG_PATH", "/tmp/vinyl-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        PathBuf::from("/tmp/vinyl-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home")
            .join("vinyl")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("vinyl")
            .join("config.toml")
    );
}

#[test]
fn database_defaults_under_xdg_data_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data");

    assert_eq!(default_data_dir().unwrap(), PathBuf::from("/tmp/xdg-data/vinyl"));
    assert_eq!(
        StoreSettings::default().resolved_database_path().unwrap(),
        PathBuf::from("/tmp/xdg-data/vinyl/library.db")
    );
    assert_eq!(
        LoggingSettings::default().resolved_directory().unwrap(),
        PathBuf::from("/tmp/xdg-data/vinyl/logs")
    );
}

#[test]
fn database_defaults_under_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        StoreSettings::default().resolved_database_path().unwrap(),
        PathBuf::from("/tmp/home-dir/.local/share/vinyl/library.db")
    );
}

#[test]
fn explicit_database_path_wins() {
    let settings = StoreSettings {
        database_path: Some(PathBuf::from("/srv/music.db")),
    };
    assert_eq!(
        settings.resolved_database_path().unwrap(),
        PathBuf::from("/srv/music.db")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[library]
extensions = ["mp3"]
recursive = false
include_hidden = true
follow_links = false
max_depth = 3
import_workers = 2

[store]
database_path = "/tmp/vinyl.db"

[sort]
full_reverse = true

[controls]
scrub_seconds = 9

[ui]
header_text = "hello"

[logging]
directory = "/tmp/vinyl-logs"
filter = "vinyl=debug"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VINYL_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("VINYL__CONTROLS__SCRUB_SECONDS");

    let s = Settings::load().unwrap();
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.library.max_depth, Some(3));
    assert_eq!(s.library.import_workers, 2);
    assert_eq!(s.store.database_path, Some(PathBuf::from("/tmp/vinyl.db")));
    assert!(s.sort.full_reverse);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.logging.directory, Some(PathBuf::from("/tmp/vinyl-logs")));
    assert_eq!(s.logging.filter, "vinyl=debug");
    assert!(s.validate().is_ok());
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(&cfg_path, "[sort]\nfull_reverse = true\n").unwrap();
    let _g1 = EnvGuard::set("VINYL_CONFIG_PATH", cfg_path.to_str().unwrap());

    let s = Settings::load().unwrap();
    assert!(s.sort.full_reverse);
    assert_eq!(s.library.import_workers, 4);
    assert_eq!(s.controls.scrub_seconds, 5);
    assert_eq!(s.logging.filter, "vinyl=info,warn");
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[controls]
scrub_seconds = 10
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VINYL_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("VINYL__CONTROLS__SCRUB_SECONDS", "30");

    let s = Settings::load().unwrap();
    assert_eq!(s.controls.scrub_seconds, 30);
}

#[test]
fn validate_rejects_zero_workers() {
    let mut s = Settings::default();
    s.library.import_workers = 0;
    assert!(s.validate().unwrap_err().contains("import_workers"));
}

#[test]
fn validate_rejects_empty_extensions() {
    let mut s = Settings::default();
    s.library.extensions = vec![" . ".to_string()];
    assert!(s.validate().unwrap_err().contains("extensions"));
}

#[test]
fn validate_rejects_zero_scrub() {
    let mut s = Settings::default();
    s.controls.scrub_seconds = 0;
    assert!(s.validate().unwrap_err().contains("scrub_seconds"));
}

#[test]
fn defaults_validate() {
    assert!(Settings::default().validate().is_ok());
}
