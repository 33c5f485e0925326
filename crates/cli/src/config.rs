// CLI defaults
// Loaded from ~/.config/tabula/settings.json

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use tabula_engine::sheet::{DEFAULT_COLS, DEFAULT_ROWS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows for newly created sheets
    pub rows: usize,

    /// Columns for newly created sheets
    pub cols: usize,

    /// Invalidate the whole sheet on every edit so dependent cells never
    /// go stale
    pub auto_recalc: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            auto_recalc: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tabula").join("settings.json"))
    }

    /// Load settings, falling back to defaults when the file is missing.
    /// A malformed file is not fatal either; unknown or absent fields take
    /// their defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}
