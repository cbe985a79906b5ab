//! Shell Configuration
//!
//! Environment variables are read from the first environment file found
//! (`$DEVKIT_ENV_FILE`, `/etc/devkit/environment`, `.env`) and then folded
//! into a [`ShellConfig`]. Existing process variables always win over the file.
//!
//! ```no_run
//! use dk_core::config::{load_environment, ShellConfig};
//!
//! load_environment();
//! let config = ShellConfig::from_env();
//! assert!(config.base_path.is_empty() || config.base_path.starts_with('/'));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Alternative paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/devkit/environment", ".env"];

pub const ENV_BASE_PATH: &str = "DEVKIT_BASE_PATH";
pub const ENV_DATA_DIR: &str = "DEVKIT_DATA_DIR";
pub const ENV_CATALOG_FILE: &str = "DEVKIT_CATALOG_FILE";
pub const ENV_POPULAR_TOOLS: &str = "DEVKIT_POPULAR_TOOLS";
pub const ENV_PRELOAD_DELAY_MS: &str = "DEVKIT_PRELOAD_DELAY_MS";

/// Tools warmed up by the background preloader when nothing is configured
pub const DEFAULT_POPULAR_TOOLS: &[&str] = &["base64-encoder", "json-formatter", "hash-generator"];

/// Delay before background preloading begins
pub const DEFAULT_PRELOAD_DELAY_MS: u64 = 2000;

/// Load environment variables from the first environment file found.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("DEVKIT_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );
            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse `KEY=VALUE`, `KEY="VALUE"` or `KEY='VALUE'`.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Runtime configuration of the application shell
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// Prefix every routed path is mounted under (empty for the site root)
    pub base_path: String,
    /// Directory holding the persisted key-value file
    pub data_dir: PathBuf,
    /// Optional JSON metadata file replacing the builtin catalog
    pub catalog_file: Option<PathBuf>,
    /// Tool ids warmed up by the background preloader
    pub popular_tools: Vec<String>,
    /// Delay before background preloading begins
    pub preload_delay: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            data_dir: PathBuf::from(".devkit"),
            catalog_file: None,
            popular_tools: DEFAULT_POPULAR_TOOLS.iter().map(|s| s.to_string()).collect(),
            preload_delay: Duration::from_millis(DEFAULT_PRELOAD_DELAY_MS),
        }
    }
}

impl ShellConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(get_config_opt)
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base) = lookup(ENV_BASE_PATH) {
            config.base_path = normalize_base_path(&base);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        config.catalog_file = lookup(ENV_CATALOG_FILE).map(PathBuf::from);

        if let Some(list) = lookup(ENV_POPULAR_TOOLS) {
            config.popular_tools = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = lookup(ENV_PRELOAD_DELAY_MS) {
            match raw.parse::<u64>() {
                Ok(ms) => config.preload_delay = Duration::from_millis(ms),
                Err(_) => warn!("Ignoring invalid {}: {}", ENV_PRELOAD_DELAY_MS, raw),
            }
        }

        config
    }

    /// Path of the JSON file backing local storage
    pub fn storage_file(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

/// Base prefixes are absolute and carry no trailing slash; `/` means none.
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
