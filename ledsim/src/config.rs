use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::{led::Color, pixel_buffer::ScaleMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Terminal,
    Headless,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    tick_interval_ms: u64,
    window_width: usize,
    window_height: usize,
    scale_mode: ScaleMode,
    current_color: Color,
    max_operations: u64,
    surface: SurfaceKind,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            tick_interval_ms: 15,
            window_width: 1024,
            window_height: 1024,
            scale_mode: ScaleMode::Nearest,
            current_color: Color::new(0xFF, 0x00, 0xFF),
            max_operations: 5_000_000,
            surface: SurfaceKind::Terminal,
        }
    }
}

impl SimulatorConfig {
    /// Reads `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let default_config = SimulatorConfig::default();
            fs::write(path, serde_json::to_string_pretty(&default_config)?)?;
            info!("Wrote default config to {}", path.display());
            return Ok(default_config);
        }

        let config_json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config_json)?)
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    pub fn window_height(&self) -> usize {
        self.window_height
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn current_color(&self) -> Color {
        self.current_color
    }

    /// Script operations allowed per call; 0 is unlimited.
    pub fn max_operations(&self) -> u64 {
        self.max_operations
    }

    pub fn surface(&self) -> SurfaceKind {
        self.surface
    }

    pub fn set_tick_interval_ms(&mut self, tick_interval_ms: u64) {
        self.tick_interval_ms = tick_interval_ms;
    }

    pub fn set_window_size(&mut self, width: Option<usize>, height: Option<usize>) {
        if let Some(width) = width {
            self.window_width = width;
        }
        if let Some(height) = height {
            self.window_height = height;
        }
    }

    pub fn set_scale_mode(&mut self, scale_mode: ScaleMode) {
        self.scale_mode = scale_mode;
    }

    pub fn set_current_color(&mut self, current_color: Color) {
        self.current_color = current_color;
    }

    pub fn set_max_operations(&mut self, max_operations: u64) {
        self.max_operations = max_operations;
    }

    pub fn set_surface(&mut self, surface: SurfaceKind) {
        self.surface = surface;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledsim.json");

        let config = SimulatorConfig::load_or_create(&path).unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert!(path.exists());

        let reread = SimulatorConfig::load_or_create(&path).unwrap();
        assert_eq!(reread, config);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledsim.json");
        fs::write(
            &path,
            r##"{ "tick_interval_ms": 40, "scale_mode": "linear", "current_color": "#102030", "surface": "headless" }"##,
        )
        .unwrap();

        let config = SimulatorConfig::load_or_create(&path).unwrap();
        assert_eq!(config.tick_interval_ms(), 40);
        assert_eq!(config.scale_mode(), ScaleMode::Linear);
        assert_eq!(config.current_color(), Color::new(0x10, 0x20, 0x30));
        assert_eq!(config.surface(), SurfaceKind::Headless);
        assert_eq!(config.window_width(), 1024);
    }

    #[test]
    fn bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledsim.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(matches!(
            SimulatorConfig::load_or_create(&path),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn window_size_overrides_are_optional() {
        let mut config = SimulatorConfig::default();
        config.set_window_size(Some(64), None);
        assert_eq!((config.window_width(), config.window_height()), (64, 1024));
    }
}
