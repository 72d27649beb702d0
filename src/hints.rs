//! String-keyed rendering hints
//!
//! Mirrors the usual hint conventions: values are plain strings, absent keys
//! fall back to documented defaults. A hint set can be saved to or loaded
//! from a JSON file for a particular setup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const HINT_VSYNC: &str = "render.vsync";
pub const HINT_SCALE_QUALITY: &str = "render.scale_quality";

/// Texture sampling quality requested by the scale-quality hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleQuality {
    /// Nearest-neighbor sampling (default)
    Nearest,
    /// Smooth (filtered) sampling
    Linear,
}

/// Renderer hint store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hints {
    values: HashMap<String, String>,
}

impl Hints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether presentation should wait for vertical blank.
    /// Enabled only when the hint value starts with '1'.
    pub fn vsync_enabled(&self) -> bool {
        matches!(self.get(HINT_VSYNC), Some(v) if v.starts_with('1'))
    }

    /// Sampling quality for scaled blits.
    /// Absent, "0" or "nearest" mean nearest-neighbor; anything else is smooth.
    pub fn scale_quality(&self) -> ScaleQuality {
        match self.get(HINT_SCALE_QUALITY) {
            None => ScaleQuality::Nearest,
            Some(v) if v == "0" || v.eq_ignore_ascii_case("nearest") => ScaleQuality::Nearest,
            Some(_) => ScaleQuality::Linear,
        }
    }

    /// Save hints to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Load hints from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| e.to_string())
    }
}
