use crate::{
    analysis::{Analyzer, AnalyzerSnapshot},
    equalizer::{Equalizer, BAND_COUNT},
    source::MediaElement,
    spatial::Spatializer,
    EngineConfig, Result,
};

/// The processing graph owned by one engine:
/// source → equalizer → spatializer → master gain → analyzer → output.
///
/// Parameter writes land here from the control side while the render side
/// pulls blocks through [`SignalGraph::render`]; both go through the engine's
/// shared lock.
#[derive(Debug)]
pub struct SignalGraph {
    source: Option<MediaElement>,
    pub(crate) equalizer: Equalizer,
    pub(crate) spatializer: Spatializer,
    master_gain: f32,
    analyzer: Analyzer,
    sample_rate: u32,
    frames_rendered: u64,
}

impl SignalGraph {
    /// Builds the graph and starts both rotation oscillators. Their gates stay
    /// closed until an effect is enabled.
    pub fn build(config: &EngineConfig, sample_rate: u32, source: MediaElement) -> Self {
        let rate = sample_rate as f32;
        let mut spatializer = Spatializer::new(config.rotation_a_hz, config.rotation_b_hz, rate);
        spatializer.start_oscillators();

        Self {
            source: Some(source),
            equalizer: Equalizer::new(rate),
            spatializer,
            master_gain: 1.0,
            analyzer: Analyzer::new(config),
            sample_rate,
            frames_rendered: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source(&self) -> Option<&MediaElement> {
        self.source.as_ref()
    }

    /// Disconnects the current source node and connects `source` in its place.
    pub fn set_source(&mut self, source: Option<MediaElement>) {
        self.source = source;
        self.equalizer.reset();
        self.analyzer.reset();
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
    }

    /// Equalizer gains as the render side sees them.
    pub fn band_gains(&self) -> [f32; BAND_COUNT] {
        self.equalizer.gains()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn stop_oscillators(&mut self) {
        self.spatializer.stop_oscillators();
    }

    pub fn analyzer_snapshot(&mut self) -> Result<AnalyzerSnapshot> {
        self.analyzer.snapshot()
    }

    /// Renders interleaved stereo frames into `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        match &self.source {
            Some(source) => {
                source.read_stereo(out);
            }
            None => out.fill(0.0),
        }

        for frame in out.chunks_exact_mut(2) {
            let (l, r) = self.equalizer.process(frame[0], frame[1]);
            let (l, r) = self.spatializer.process(l, r);
            let l = l * self.master_gain;
            let r = r * self.master_gain;
            self.analyzer.push(0.5 * (l + r));
            frame[0] = l;
            frame[1] = r;
        }

        self.analyzer.end_block();
        self.frames_rendered += (out.len() / 2) as u64;
    }
}
