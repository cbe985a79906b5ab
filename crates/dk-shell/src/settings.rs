//! Persisted UI settings
//!
//! Theme and sidebar state live under their own storage keys. Anything that
//! cannot be read or parsed falls back to the default with a warning.

use tracing::warn;

use dk_core::{KeyValueStore, ThemeMode};

pub const THEME_KEY: &str = "devkit.theme";
pub const SIDEBAR_KEY: &str = "devkit.sidebar-collapsed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub theme: ThemeMode,
    pub sidebar_collapsed: bool,
}

impl Settings {
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = read(storage, THEME_KEY) {
            match raw.parse() {
                Ok(theme) => settings.theme = theme,
                Err(e) => warn!("Ignoring stored theme: {}", e),
            }
        }
        if let Some(raw) = read(storage, SIDEBAR_KEY) {
            match raw.trim().parse() {
                Ok(collapsed) => settings.sidebar_collapsed = collapsed,
                Err(_) => warn!("Ignoring stored sidebar state {:?}", raw),
            }
        }

        settings
    }

    pub fn save_theme(storage: &dyn KeyValueStore, theme: ThemeMode) {
        write(storage, THEME_KEY, theme.as_str());
    }

    pub fn save_sidebar(storage: &dyn KeyValueStore, collapsed: bool) {
        write(storage, SIDEBAR_KEY, if collapsed { "true" } else { "false" });
    }
}

fn read(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
    storage.get(key).unwrap_or_else(|e| {
        warn!("Failed to read {}: {}", key, e);
        None
    })
}

fn write(storage: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        warn!("Failed to persist {}: {}", key, e);
    }
}
