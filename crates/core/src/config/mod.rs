use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SpatialAudioError};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32_768;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub visualizer: VisualizerConfig,
}

impl AppConfig {
    /// Parses a (possibly partial) JSON document. Missing sections and fields
    /// fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Reads and parses the JSON config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Configuration of the processing graph and its analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Frames rendered per block by offline hosts.
    pub block_size: usize,
    /// Analyzer FFT size. Half of it is the number of usable bins.
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Rate of the slow rotation oscillator feeding the 8D gate.
    pub rotation_a_hz: f32,
    /// Rate of the fast rotation oscillator feeding the 16D gate.
    pub rotation_b_hz: f32,
    /// Angular speed of the positional animation in radians per second.
    pub rotation_speed: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 512,
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            rotation_a_hz: 0.2,
            rotation_b_hz: 0.4,
            rotation_speed: 3.0,
        }
    }
}

impl EngineConfig {
    /// Defaults with the graph built for `sample_rate`.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Number of frequency bins exposed by the analyzer.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SpatialAudioError::config("sample_rate must be positive"));
        }
        if self.block_size == 0 {
            return Err(SpatialAudioError::config("block_size must be positive"));
        }
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(SpatialAudioError::config(format!(
                "fft_size {} must be a power of two in [{MIN_FFT_SIZE}, {MAX_FFT_SIZE}]",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(SpatialAudioError::config(
                "smoothing_time_constant must lie in [0, 1]",
            ));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(SpatialAudioError::config(
                "min_decibels must be lower than max_decibels",
            ));
        }
        if !(self.rotation_speed >= 0.0) {
            return Err(SpatialAudioError::config(
                "rotation_speed must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Configuration of the spectrum bar display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub bar_count: usize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self { bar_count: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_expose_128_bins() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 128);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config = AppConfig::from_json_str(r#"{ "engine": { "fft_size": 512 } }"#).unwrap();
        assert_eq!(config.engine.fft_size, 512);
        assert_eq!(config.engine.sample_rate, 48_000);
        assert_eq!(config.visualizer.bar_count, 64);
    }

    #[test]
    fn rejects_non_power_of_two_fft() {
        let err = AppConfig::from_json_str(r#"{ "engine": { "fft_size": 300 } }"#).unwrap_err();
        assert!(matches!(err, SpatialAudioError::InvalidConfig(_)));
        assert!(format!("{err}").contains("300"));
    }

    #[test]
    fn rejects_inverted_decibel_range() {
        let config = EngineConfig {
            min_decibels: -20.0,
            max_decibels: -30.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
