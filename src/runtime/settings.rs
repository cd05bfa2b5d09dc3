use crate::config;

/// Load settings, falling back to defaults. Logging is not up yet, so
/// problems go to stderr.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("vinyl: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            eprintln!("vinyl: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
