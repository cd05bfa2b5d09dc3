use std::{env, path::PathBuf};

use super::schema::{LoggingSettings, Settings, StoreSettings};

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `VINYL__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("VINYL")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.library.import_workers == 0 {
            return Err("library.import_workers must be >= 1".to_string());
        }
        if self
            .library
            .extensions
            .iter()
            .all(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err("library.extensions must name at least one extension".to_string());
        }
        if self.controls.scrub_seconds == 0 {
            return Err("controls.scrub_seconds must be >= 1".to_string());
        }
        Ok(())
    }
}

impl StoreSettings {
    /// Configured database path, or the default under the data directory.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("library.db")))
    }
}

impl LoggingSettings {
    /// Configured log directory, or `logs/` under the data directory.
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        self.directory
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("logs")))
    }
}

/// Resolve the config path from `VINYL_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("VINYL_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/vinyl/config.toml`
/// or `~/.config/vinyl/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("vinyl").join("config.toml"))
}

/// `$XDG_DATA_HOME/vinyl` or `~/.local/share/vinyl`.
pub fn default_data_dir() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("vinyl"))
}
