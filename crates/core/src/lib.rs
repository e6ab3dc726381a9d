//! Core library for the JamWave spatial audio player.
//!
//! The engine owns a fixed processing graph (source, ten-band equalizer,
//! rotating spatializer, master gain, analyzer) and exposes synchronous
//! parameter setters plus a pull-based spectrum read for the visualizer.
//! Audio can be rendered on demand (offline) or through the default output
//! device when the `device` feature is enabled.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod equalizer;
pub mod error;
pub mod mapping;
pub mod player;
pub mod render;
pub mod source;
pub mod spatial;
pub mod timeline;
pub mod track;

pub use analysis::{Analyzer, AnalyzerSnapshot};
#[cfg(feature = "device")]
pub use audio::DeviceBackend;
pub use audio::{AudioBackend, AudioContext, AudioEngine, OfflineBackend, SignalGraph};
pub use config::{AppConfig, EngineConfig, VisualizerConfig};
pub use equalizer::{EqPreset, Equalizer, EqualizerBand, FilterShape, BAND_COUNT, BAND_FREQUENCIES};
pub use error::{Result, SpatialAudioError};
pub use mapping::ControlSurface;
pub use player::{PlaybackState, Player};
pub use render::{bar_layout, Bar, Canvas, SpectrumSource, TextCanvas, Visualizer};
pub use source::{write_stereo_wav, MediaElement};
pub use spatial::{Position, RotationMode, SpatialEffectState};
pub use timeline::{FrameClock, Ticker};
pub use track::Track;
