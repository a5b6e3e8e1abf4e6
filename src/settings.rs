//! Sandbox settings
//!
//! Read from a JSON file on native (path from `TUMBLE_LAB_SETTINGS`, else
//! `settings.json`) and from LocalStorage on the web. Missing fields take
//! their defaults, so a partial file is fine.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::history::MAX_HISTORY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// World gravity in m/s²
    pub gravity: Vec2,
    /// Center of the target body
    pub target: Vec2,
    /// Relative speed at which a hit on the target counts
    pub impact_speed: f32,
    /// Relative speed at which TNT goes off
    pub fuse_speed: f32,
    /// Time multiplier while slow motion is on
    pub slow_motion_factor: f32,
    /// Undo/redo entries kept
    pub history_limit: usize,
    /// Native design store file
    pub storage_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            target: Vec2::new(6.0, -2.0),
            impact_speed: 1.5,
            fuse_speed: 4.0,
            slow_motion_factor: 0.25,
            history_limit: MAX_HISTORY,
            storage_path: "designs.json".to_string(),
        }
    }
}

impl Settings {
    /// Environment variable naming the settings file
    pub const PATH_VAR: &'static str = "TUMBLE_LAB_SETTINGS";
    #[cfg(not(target_arch = "wasm32"))]
    const DEFAULT_PATH: &'static str = "settings.json";
    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "tumble_lab_settings";

    /// Parse settings, pulling out-of-range values back into range
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if !(self.slow_motion_factor > 0.0 && self.slow_motion_factor <= 1.0) {
            log::warn!(
                "slow_motion_factor {} out of range, using default",
                self.slow_motion_factor
            );
            self.slow_motion_factor = Self::default().slow_motion_factor;
        }
        self.history_limit = self.history_limit.max(1);
        self.impact_speed = self.impact_speed.max(0.0);
        self.fuse_speed = self.fuse_speed.max(0.0);
        self
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Path of the native settings file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn path() -> std::path::PathBuf {
        std::env::var_os(Self::PATH_VAR)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(Self::DEFAULT_PATH))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load from `path`, falling back to defaults if it is missing or bad
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(_) => {
                log::info!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "impact_speed": 3.0 }"#).unwrap();
        assert_eq!(settings.impact_speed, 3.0);
        assert_eq!(settings.gravity, Settings::default().gravity);
        assert_eq!(settings.history_limit, MAX_HISTORY);
    }

    #[test]
    fn test_vectors_are_arrays() {
        let settings = Settings::from_json(r#"{ "gravity": [0.0, -1.62] }"#).unwrap();
        assert_eq!(settings.gravity, Vec2::new(0.0, -1.62));
    }

    #[test]
    fn test_out_of_range_values_are_pulled_in() {
        let json = r#"{ "slow_motion_factor": 0.0, "history_limit": 0, "fuse_speed": -2.0 }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.slow_motion_factor, 0.25);
        assert_eq!(settings.history_limit, 1);
        assert_eq!(settings.fuse_speed, 0.0);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from(std::path::Path::new("/nonexistent/tumble.json"));
        assert_eq!(settings, Settings::default());
    }
}
