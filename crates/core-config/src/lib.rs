//! Configuration loading and parsing.
//!
//! Parses `gridlight.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [highlight]
//! gutter_width = 20        # columns reserved left of text on every grid
//! primary_grid = 1         # grid id that never maps to an editor
//! ignore_groups = ["CursorLine"]
//!
//! [log]
//! filter = "info"          # used when RUST_LOG is unset
//! ```
//!
//! Every field is optional. Unknown fields are ignored (TOML deserialization
//! tolerance) so newer files still load. A file that fails to parse falls
//! back to defaults with a warning rather than aborting startup.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "gridlight.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    #[serde(default = "HighlightConfig::default_gutter_width")]
    pub gutter_width: usize,
    #[serde(default = "HighlightConfig::default_primary_grid")]
    pub primary_grid: u64,
    /// Highlight group names rendered as plain text.
    #[serde(default)]
    pub ignore_groups: Vec<String>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            gutter_width: Self::default_gutter_width(),
            primary_grid: Self::default_primary_grid(),
            ignore_groups: Vec::new(),
        }
    }
}

impl HighlightConfig {
    const fn default_gutter_width() -> usize {
        20
    }
    const fn default_primary_grid() -> u64 {
        1
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub path: Option<PathBuf>,
    pub file: ConfigFile,
}

/// Best-effort config path: working directory first, then the platform config
/// dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("gridlight").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_absent_using_defaults");
        return Ok(Config::default());
    };
    match Config::parse(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                path: Some(path),
                file,
            })
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), error = %err, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<ConfigFile> {
        Ok(toml::from_str::<ConfigFile>(content)?)
    }

    pub fn highlight(&self) -> &HighlightConfig {
        &self.file.highlight
    }

    pub fn log_filter(&self) -> &str {
        &self.file.log.filter
    }
}
