use std::collections::BTreeMap;
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::analysis::path::{Rect, MAX_NOISE_FLOOR_DB};
use crate::engine::analysis::AnalyzerSettings;
use crate::engine::engine::EngineOptions;
use crate::engine::error::Result;
use crate::engine::params::ParameterStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayArea {
    pub width: f32,
    pub height: f32,
}

impl Default for DisplayArea {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 200.0,
        }
    }
}

/// Player configuration, read from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub refresh_hz: f64,
    pub fft_order: u32,
    pub spectrum_block_size: usize,
    pub spectrum_fifo_capacity: usize,
    pub fft_queue_capacity: usize,
    pub hop_size: usize,
    pub noise_floor_db: f32,
    pub spectrum_smoothing: f32,
    pub display: DisplayArea,
    pub show_spectrum: bool,
    /// Initial parameter values by display name, e.g. `"Peak Gain": 6.0`.
    pub parameters: BTreeMap<String, f32>,
    pub audio_buffer_seconds: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60.0,
            fft_order: 11,
            spectrum_block_size: 512,
            spectrum_fifo_capacity: 30,
            fft_queue_capacity: 16,
            hop_size: 512,
            noise_floor_db: -48.0,
            spectrum_smoothing: 0.5,
            display: DisplayArea::default(),
            show_spectrum: true,
            parameters: BTreeMap::new(),
            audio_buffer_seconds: 1.0,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        let noise_floor_db = if self.noise_floor_db.is_nan() {
            AnalyzerSettings::default().noise_floor_db
        } else {
            self.noise_floor_db.min(MAX_NOISE_FLOOR_DB)
        };
        AnalyzerSettings {
            fft_order: self.fft_order.clamp(4, 16),
            noise_floor_db,
            hop_size: self.hop_size.max(1),
            fft_queue_capacity: self.fft_queue_capacity.max(1),
            smoothing: self.spectrum_smoothing.clamp(0.0, 1.0),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            audio_buffer_seconds: self.audio_buffer_seconds,
            spectrum_block_size: self.spectrum_block_size.max(1),
            spectrum_fifo_capacity: self.spectrum_fifo_capacity.max(1),
        }
    }

    pub fn display_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.display.width, self.display.height)
    }

    /// Writes the configured initial values into the store. Stops at the
    /// first unknown parameter name.
    pub fn apply_parameters(&self, params: &ParameterStore) -> Result<()> {
        for (name, value) in &self.parameters {
            params.set_by_name(name, *value)?;
        }
        Ok(())
    }
}
