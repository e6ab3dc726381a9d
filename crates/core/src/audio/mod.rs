use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::{
    analysis::AnalyzerSnapshot,
    equalizer::{BAND_COUNT, BAND_FREQUENCIES},
    source::MediaElement,
    spatial::{Position, RotationAnimator, RotationMode, SpatialEffectState},
    EngineConfig, Result,
};

mod backend;
#[cfg(feature = "device")]
mod device;
mod graph;

pub use backend::{AudioBackend, AudioContext, OfflineBackend, OfflineContext, SharedGraph};
#[cfg(feature = "device")]
pub use device::{DeviceBackend, DeviceContext};
pub use graph::SignalGraph;

/// Resources that exist only between `initialize` and `destroy`.
struct Runtime {
    graph: SharedGraph,
    context: Box<dyn AudioContext>,
}

impl Runtime {
    fn lock(&self) -> Option<MutexGuard<'_, SignalGraph>> {
        match self.graph.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("signal graph has been poisoned");
                None
            }
        }
    }
}

/// Spatial audio engine façade.
///
/// Owns the processing graph, the audio context it renders on and the
/// rotation animation. Every setter is synchronous and never fails: on an
/// engine that is not initialized (or already destroyed) it does nothing.
pub struct AudioEngine {
    config: EngineConfig,
    backend: Box<dyn AudioBackend>,
    runtime: Option<Runtime>,
    animator: RotationAnimator,
}

impl AudioEngine {
    /// Creates an engine that renders on demand through [`AudioEngine::render`].
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Box::new(OfflineBackend))
    }

    /// Creates an engine that acquires its audio context from `backend`.
    pub fn with_backend(config: EngineConfig, backend: Box<dyn AudioBackend>) -> Self {
        let animator = RotationAnimator::new(config.rotation_speed);
        Self {
            config,
            backend,
            runtime: None,
            animator,
        }
    }

    /// Configuration the graph is built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name of the backend contexts come from.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// True between a successful `initialize` and `destroy`.
    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    /// Builds the graph around `source` and acquires the audio context.
    ///
    /// A second call while initialized keeps the existing graph. On failure the
    /// engine stays uninitialized and the error is returned to the caller.
    pub fn initialize(&mut self, source: MediaElement) -> Result<()> {
        if self.runtime.is_some() {
            debug!("engine already initialized");
            return Ok(());
        }

        self.config.validate()?;

        let mut context = match self.backend.create_context(&self.config) {
            Ok(context) => context,
            Err(err) => {
                warn!(backend = self.backend.name(), %err, "audio context unavailable");
                return Err(err);
            }
        };

        let sample_rate = context.sample_rate();
        let graph = Arc::new(Mutex::new(SignalGraph::build(&self.config, sample_rate, source)));
        if let Err(err) = context.connect(graph.clone()) {
            warn!(backend = self.backend.name(), %err, "failed to connect signal graph");
            context.close();
            return Err(err);
        }

        self.animator = RotationAnimator::new(self.config.rotation_speed);
        self.runtime = Some(Runtime { graph, context });
        info!(backend = self.backend.name(), sample_rate, "audio engine initialized");
        Ok(())
    }

    /// Disconnects the current source and connects `source` in its place.
    pub fn replace_source(&mut self, source: MediaElement) {
        let label = source.label();
        if let Some(mut graph) = self.graph("replace_source") {
            graph.set_source(Some(source));
            info!(source = %label, "source replaced");
        }
    }

    /// Master output gain, applied after the spatializer.
    pub fn set_volume(&mut self, volume: f32) {
        if let Some(mut graph) = self.graph("set_volume") {
            graph.set_master_gain(volume);
            debug!(volume, "master gain set");
        }
    }

    /// Sets one band's gain. Indices outside the band table are ignored.
    pub fn set_equalizer_band(&mut self, index: usize, gain_db: f32) {
        if let Some(mut graph) = self.graph("set_equalizer_band") {
            if graph.equalizer.set_band_gain(index, gain_db) {
                debug!(index, gain_db, "equalizer band set");
            } else {
                debug!(index, "ignoring out-of-range equalizer band");
            }
        }
    }

    /// Sets every band under a single lock so the render side never sees a
    /// partially applied preset.
    pub fn apply_preset(&mut self, gains: &[f32; BAND_COUNT]) {
        if let Some(mut graph) = self.graph("apply_preset") {
            graph.equalizer.set_gains(gains);
            debug!(?gains, "equalizer preset applied");
        }
    }

    /// Selects the rotation effect. The gate of the previous mode is closed
    /// before the new one opens, within the same lock.
    pub fn set_rotation_effect(&mut self, mode: RotationMode, intensity: f32) {
        let Some(runtime) = &self.runtime else {
            warn!(%mode, "set_rotation_effect ignored: engine not initialized");
            return;
        };
        // Animator and gates change together or not at all.
        let Some(mut graph) = runtime.lock() else {
            return;
        };

        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        let position = self.animator.set_effect(mode, intensity);
        graph.spatializer.set_rotation_gates(mode, intensity);
        graph.spatializer.set_position(position);
        debug!(%mode, intensity, "rotation effect set");
    }

    /// Rotation speed of the positional orbit in rad/s. Negative values clamp
    /// to zero; non-finite values are ignored.
    pub fn set_rotation_speed(&mut self, rotation_speed: f32) {
        if self.runtime.is_none() {
            warn!("set_rotation_speed ignored: engine not initialized");
            return;
        }
        if !rotation_speed.is_finite() {
            debug!(rotation_speed, "ignoring non-finite rotation speed");
            return;
        }
        self.animator.set_rotation_speed(rotation_speed.max(0.0));
    }

    /// Host frame callback. Advances the rotation animation by `dt_seconds`
    /// when a frame is pending and returns the new position.
    pub fn advance(&mut self, dt_seconds: f32) -> Option<Position> {
        self.runtime.as_ref()?;
        let position = self.animator.frame(dt_seconds)?;
        if let Some(mut graph) = self.graph("advance") {
            graph.spatializer.set_position(position);
        }
        Some(position)
    }

    /// Pulls interleaved stereo frames from the graph. Returns the number of
    /// frames rendered; an uninitialized engine renders silence and returns 0.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        match self.graph("render") {
            Some(mut graph) => {
                graph.render(out);
                out.len() / 2
            }
            None => {
                out.fill(0.0);
                0
            }
        }
    }

    /// Fresh byte magnitudes from the analyzer, one per frequency bin. Empty
    /// when the engine is not initialized.
    pub fn get_analyzer_snapshot(&self) -> AnalyzerSnapshot {
        let Some(mut graph) = self.runtime.as_ref().and_then(Runtime::lock) else {
            return AnalyzerSnapshot::default();
        };
        match graph.analyzer_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "analyzer snapshot failed");
                AnalyzerSnapshot::default()
            }
        }
    }

    /// Centre frequencies of the ten bands, in Hz.
    pub fn get_equalizer_band_frequencies(&self) -> [f32; BAND_COUNT] {
        BAND_FREQUENCIES
    }

    /// Stops the oscillators and the animation and releases the audio
    /// context. Safe to call any number of times.
    pub fn destroy(&mut self) {
        self.animator.stop();

        let Some(mut runtime) = self.runtime.take() else {
            debug!("engine already destroyed");
            return;
        };

        if let Some(mut graph) = runtime.lock() {
            graph.stop_oscillators();
            graph.set_source(None);
        }
        runtime.context.close();
        info!(backend = self.backend.name(), "audio engine destroyed");
    }

    /// Gain of one band in dB; `None` for unknown bands or when not initialized.
    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.peek(|graph| graph.equalizer.band_gain(index)).flatten()
    }

    /// All band gains in dB, or `None` when not initialized.
    pub fn band_gains(&self) -> Option<[f32; BAND_COUNT]> {
        self.peek(|graph| graph.equalizer.gains())
    }

    /// Nominal level the gate of `mode` was last opened at; 0 when closed.
    pub fn gate_level(&self, mode: RotationMode) -> f32 {
        self.peek(|graph| graph.spatializer.gate(mode).map(|gate| gate.level()))
            .flatten()
            .unwrap_or(0.0)
    }

    /// Effective modulation amplitude reaching the pan control from `mode`.
    pub fn modulation_depth(&self, mode: RotationMode) -> f32 {
        self.peek(|graph| graph.spatializer.gate(mode).map(|gate| gate.depth()))
            .flatten()
            .unwrap_or(0.0)
    }

    /// Current listener-relative source position.
    pub fn position(&self) -> Position {
        self.animator.position()
    }

    /// Mode, intensity, phase and speed of the rotation effect.
    pub fn spatial_state(&self) -> SpatialEffectState {
        self.animator.state()
    }

    /// Master gain, or `None` when not initialized.
    pub fn volume(&self) -> Option<f32> {
        self.peek(|graph| graph.master_gain())
    }

    /// Rate the graph was built for.
    pub fn sample_rate(&self) -> Option<u32> {
        self.peek(|graph| graph.sample_rate())
    }

    /// Element currently connected to the graph.
    pub fn source(&self) -> Option<MediaElement> {
        self.peek(|graph| graph.source().cloned()).flatten()
    }

    /// Whether the rotation animation has a frame scheduled.
    pub fn animation_running(&self) -> bool {
        self.animator.is_running()
    }

    fn graph(&self, operation: &str) -> Option<MutexGuard<'_, SignalGraph>> {
        match &self.runtime {
            Some(runtime) => runtime.lock(),
            None => {
                warn!(operation, "ignored: engine not initialized");
                None
            }
        }
    }

    fn peek<R>(&self, read: impl FnOnce(&SignalGraph) -> R) -> Option<R> {
        let runtime = self.runtime.as_ref()?;
        let graph = runtime.lock()?;
        Some(read(&graph))
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("backend", &self.backend.name())
            .field("initialized", &self.is_initialized())
            .field("animator", &self.animator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::SpatialAudioError;

    #[derive(Default, Clone)]
    struct Counters {
        created: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    struct CountingBackend(Counters);

    struct CountingContext {
        counters: Counters,
        closed: bool,
    }

    impl AudioBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn create_context(&self, _config: &EngineConfig) -> Result<Box<dyn AudioContext>> {
            self.0.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingContext {
                counters: self.0.clone(),
                closed: false,
            }))
        }
    }

    impl AudioContext for CountingContext {
        fn sample_rate(&self) -> u32 {
            48_000
        }

        fn connect(&mut self, _graph: SharedGraph) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.counters.closed.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    struct FailingBackend;

    impl AudioBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn create_context(&self, _config: &EngineConfig) -> Result<Box<dyn AudioContext>> {
            Err(SpatialAudioError::Unavailable("no output device".into()))
        }
    }

    fn source() -> MediaElement {
        MediaElement::tone(440.0, 1.0, 0.5, 48_000).unwrap()
    }

    fn engine() -> AudioEngine {
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine.initialize(source()).unwrap();
        engine
    }

    #[test]
    fn second_initialize_keeps_one_context() {
        let counters = Counters::default();
        let mut engine = AudioEngine::with_backend(
            EngineConfig::default(),
            Box::new(CountingBackend(counters.clone())),
        );
        engine.initialize(source()).unwrap();
        engine.initialize(source()).unwrap();
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);

        engine.destroy();
        engine.destroy();
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert!(!engine.is_initialized());
    }

    #[test]
    fn drop_releases_the_context() {
        let counters = Counters::default();
        {
            let mut engine = AudioEngine::with_backend(
                EngineConfig::default(),
                Box::new(CountingBackend(counters.clone())),
            );
            engine.initialize(source()).unwrap();
        }
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_initialize_leaves_inert_engine() {
        let mut engine = AudioEngine::with_backend(EngineConfig::default(), Box::new(FailingBackend));
        let err = engine.initialize(source()).unwrap_err();
        assert!(matches!(err, SpatialAudioError::Unavailable(_)));
        assert!(!engine.is_initialized());

        engine.set_volume(0.3);
        engine.set_equalizer_band(0, 6.0);
        engine.set_rotation_effect(RotationMode::Rotate8D, 1.0);
        assert_eq!(engine.volume(), None);
        assert_eq!(engine.band_gains(), None);
        assert_eq!(engine.advance(0.016), None);
        assert!(engine.get_analyzer_snapshot().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_acquiring_audio() {
        let config = EngineConfig {
            fft_size: 300,
            ..EngineConfig::default()
        };
        let mut engine = AudioEngine::new(config);
        assert!(matches!(
            engine.initialize(source()),
            Err(SpatialAudioError::InvalidConfig(_))
        ));
    }

    #[test]
    fn band_writes_stay_isolated() {
        let mut engine = engine();
        engine.set_equalizer_band(3, 4.5);
        engine.set_equalizer_band(7, -2.0);
        engine.set_equalizer_band(10, 9.0);
        assert_eq!(
            engine.band_gains(),
            Some([0.0, 0.0, 0.0, 4.5, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn out_of_range_gain_is_stored_verbatim() {
        let mut engine = engine();
        engine.set_equalizer_band(0, 30.0);
        assert_eq!(engine.band_gain(0), Some(30.0));
    }

    #[test]
    fn preset_reads_back_in_order() {
        let mut engine = engine();
        let gains = [1.0, 2.0, 3.0, 4.0, 5.0, -5.0, -4.0, -3.0, -2.0, -1.0];
        engine.apply_preset(&gains);
        assert_eq!(engine.band_gains(), Some(gains));
    }

    #[test]
    fn switching_modes_closes_the_previous_gate() {
        let mut engine = engine();
        engine.set_rotation_effect(RotationMode::Rotate8D, 0.7);
        assert_eq!(engine.gate_level(RotationMode::Rotate8D), 0.7);

        engine.set_rotation_effect(RotationMode::Rotate16D, 0.4);
        assert_eq!(engine.gate_level(RotationMode::Rotate8D), 0.0);
        assert_eq!(engine.gate_level(RotationMode::Rotate16D), 0.4);
    }

    #[test]
    fn sixteen_d_depth_is_twice_eight_d() {
        let mut engine = engine();
        engine.set_rotation_effect(RotationMode::Rotate8D, 0.3);
        let eight = engine.modulation_depth(RotationMode::Rotate8D);
        engine.set_rotation_effect(RotationMode::Rotate16D, 0.3);
        let sixteen = engine.modulation_depth(RotationMode::Rotate16D);
        assert!((sixteen - 2.0 * eight).abs() < 1e-6);
    }

    #[test]
    fn intensity_is_clamped_to_unit_range() {
        let mut engine = engine();
        engine.set_rotation_effect(RotationMode::Rotate8D, 3.0);
        assert_eq!(engine.gate_level(RotationMode::Rotate8D), 1.0);
        engine.set_rotation_effect(RotationMode::Rotate8D, f32::NAN);
        assert_eq!(engine.gate_level(RotationMode::Rotate8D), 0.0);
    }

    #[test]
    fn disabling_effect_recentres_and_stops_ticking() {
        let mut engine = engine();
        engine.set_rotation_effect(RotationMode::Rotate16D, 1.0);
        assert!(engine.advance(0.1).is_some());

        engine.set_rotation_effect(RotationMode::None, 0.0);
        assert!(engine.position().is_origin());
        assert!(!engine.animation_running());
        for _ in 0..5 {
            assert_eq!(engine.advance(0.1), None);
        }
        assert!(engine.position().is_origin());
        assert_eq!(engine.spatial_state().phase_angle, 0.0);
    }

    #[test]
    fn rotation_speed_rejects_bad_values() {
        let mut engine = engine();
        engine.set_rotation_speed(-4.0);
        assert_eq!(engine.spatial_state().rotation_speed, 0.0);
        engine.set_rotation_speed(f32::INFINITY);
        assert_eq!(engine.spatial_state().rotation_speed, 0.0);
        engine.set_rotation_speed(1.5);
        assert_eq!(engine.spatial_state().rotation_speed, 1.5);
    }

    #[test]
    fn snapshot_has_fixed_bin_count() {
        let engine = engine();
        assert_eq!(engine.get_analyzer_snapshot().len(), 128);
    }

    #[test]
    fn render_reaches_the_analyzer() {
        let mut engine = engine();
        engine.source().unwrap().play();
        let mut block = vec![0.0_f32; 1024];
        for _ in 0..4 {
            assert_eq!(engine.render(&mut block), 512);
        }
        assert!(!engine.get_analyzer_snapshot().is_silent());
    }

    #[test]
    fn replace_source_swaps_the_connected_element() {
        let mut engine = engine();
        let next = MediaElement::silence(0.5, 48_000).unwrap();
        engine.replace_source(next.clone());
        assert!(engine.source().unwrap().same_as(&next));
    }

    #[test]
    fn destroyed_engine_ignores_setters() {
        let mut engine = engine();
        engine.destroy();
        engine.set_volume(0.5);
        assert_eq!(engine.volume(), None);
        let mut block = [1.0_f32; 8];
        assert_eq!(engine.render(&mut block), 0);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn band_frequencies_are_static() {
        let engine = AudioEngine::new(EngineConfig::default());
        assert_eq!(engine.get_equalizer_band_frequencies()[0], 32.0);
        assert_eq!(engine.get_equalizer_band_frequencies()[9], 16_000.0);
    }

    #[test]
    fn poisoned_graph_leaves_rotation_untouched() {
        let mut engine = engine();
        let graph = engine.runtime.as_ref().unwrap().graph.clone();
        let _ = std::thread::spawn(move || {
            let _guard = graph.lock().unwrap();
            panic!("render thread died holding the graph");
        })
        .join();

        engine.set_rotation_effect(RotationMode::Rotate8D, 1.0);
        assert_eq!(engine.spatial_state().mode, RotationMode::None);
        assert!(!engine.animation_running());
        assert!(engine.position().is_origin());
        assert_eq!(engine.advance(0.016), None);
    }
}
