//! Video settings loading and saving
//!
//! Uses RON (Rusty Object Notation) for a human-readable settings file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persisted renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Physical output resolution
    pub width: usize,
    pub height: usize,
    /// Extend the logical playfield to the physical aspect ratio
    pub widescreen: bool,
    /// Weight of the incoming pixel in translucent draws (0..=100)
    pub translucency_percent: u32,
    /// Zone heap budget in megabytes
    pub zone_budget_mb: usize,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            widescreen: false,
            translucency_percent: 66,
            zone_budget_mb: 16,
        }
    }
}

/// Error type for settings loading
#[derive(Debug)]
pub enum SettingsError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for SettingsError {
    fn from(e: ron::error::SpannedError) -> Self {
        SettingsError::ParseError(e)
    }
}

impl From<ron::Error> for SettingsError {
    fn from(e: ron::Error) -> Self {
        SettingsError::SerializeError(e)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::IoError(e) => write!(f, "IO error: {}", e),
            SettingsError::ParseError(e) => write!(f, "Parse error: {}", e),
            SettingsError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

/// Load settings from a RON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<VideoSettings, SettingsError> {
    let contents = fs::read_to_string(path)?;
    let settings: VideoSettings = ron::from_str(&contents)?;
    Ok(settings)
}

/// Save settings to a RON file
pub fn save_settings<P: AsRef<Path>>(settings: &VideoSettings, path: P) -> Result<(), SettingsError> {
    let config = ron::ser::PrettyConfig::new().indentor("  ".to_string());
    let contents = ron::ser::to_string_pretty(settings, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load settings, falling back to defaults with a diagnostic
pub fn load_or_default<P: AsRef<Path>>(path: P) -> VideoSettings {
    match load_settings(&path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Using default video settings: {}", e);
            VideoSettings::default()
        }
    }
}
