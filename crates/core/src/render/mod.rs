use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    analysis::AnalyzerSnapshot, timeline::Ticker, AudioEngine, Result, SpatialAudioError,
    VisualizerConfig,
};

mod text;

pub use text::TextCanvas;

/// One spectrum bar in canvas coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    /// Byte magnitude the bar was sampled from.
    pub value: u8,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Samples `bar_count` values from `bins` by stride decimation.
///
/// Bar `i` reads bin `i * floor(len / bar_count)`; missing bins read as 0.
/// With fewer bins than bars the stride is 0 and every bar reads bin 0.
pub fn decimate(bins: &[u8], bar_count: usize) -> Vec<u8> {
    if bar_count == 0 {
        return Vec::new();
    }
    let stride = bins.len() / bar_count;
    (0..bar_count)
        .map(|index| bins.get(index * stride).copied().unwrap_or(0))
        .collect()
}

/// Lays out decimated bars on a `width` × `height` surface, growing up from
/// the bottom edge with a one unit gap between neighbours.
pub fn bar_layout(bins: &[u8], bar_count: usize, width: f32, height: f32) -> Vec<Bar> {
    if bar_count == 0 {
        return Vec::new();
    }
    let bar_width = width / bar_count as f32;

    decimate(bins, bar_count)
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let bar_height = f32::from(value) / 255.0 * height;
            Bar {
                index,
                value,
                x: index as f32 * bar_width,
                y: height - bar_height,
                width: (bar_width - 1.0).max(0.0),
                height: bar_height,
            }
        })
        .collect()
}

/// Drawing surface the visualizer paints on.
pub trait Canvas {
    /// Width and height in canvas units.
    fn size(&self) -> (f32, f32);

    /// Paints the whole surface with the background colour.
    fn clear(&mut self);

    fn fill_bar(&mut self, bar: &Bar);
}

/// Anything that can hand out the current spectrum.
pub trait SpectrumSource {
    fn spectrum(&self) -> AnalyzerSnapshot;
}

impl SpectrumSource for AudioEngine {
    fn spectrum(&self) -> AnalyzerSnapshot {
        self.get_analyzer_snapshot()
    }
}

impl SpectrumSource for AnalyzerSnapshot {
    fn spectrum(&self) -> AnalyzerSnapshot {
        self.clone()
    }
}

/// Spectrum bar display with the redraw cadence of a playing/idle view.
///
/// While playing, every delivered frame draws and requests the next one.
/// Stopping cancels the pending frame and paints a single cleared frame.
#[derive(Debug, Clone)]
pub struct Visualizer {
    bar_count: usize,
    /// `None` until the host first reports the playing flag.
    playing: Option<bool>,
    ticker: Ticker,
    frames_drawn: u64,
    frames_skipped: u64,
    idle_frames: u64,
}

impl Visualizer {
    /// Creates an unattached visualizer. Nothing is painted until the first
    /// [`Visualizer::set_playing`] call.
    pub fn new(config: &VisualizerConfig) -> Self {
        Self {
            bar_count: config.bar_count,
            playing: None,
            ticker: Ticker::new(),
            frames_drawn: 0,
            frames_skipped: 0,
            idle_frames: 0,
        }
    }

    /// Number of bars drawn per frame.
    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn is_playing(&self) -> bool {
        self.playing == Some(true)
    }

    /// Whether a redraw is scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.ticker.is_pending()
    }

    /// Frames painted from a spectrum.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Scheduled frames dropped because the canvas had no area.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Cleared frames painted on entering the idle state.
    pub fn idle_frames(&self) -> u64 {
        self.idle_frames
    }

    /// Reacts to a change of the playing flag. Repeating the current value
    /// does nothing; the first call always applies, so a visualizer mounted
    /// while stopped paints its cleared frame.
    pub fn set_playing<C: Canvas + ?Sized>(&mut self, playing: bool, canvas: &mut C) {
        if self.playing == Some(playing) {
            return;
        }
        self.playing = Some(playing);

        if playing {
            debug!("visualizer started");
            self.ticker.request();
            return;
        }

        self.ticker.cancel();
        let (width, height) = canvas.size();
        if width > 0.0 && height > 0.0 {
            canvas.clear();
        }
        self.idle_frames += 1;
        debug!("visualizer idle");
    }

    /// Host redraw callback. Returns `true` if a scheduled frame was
    /// consumed, whether or not it could be painted.
    pub fn on_frame<S, C>(&mut self, source: &S, canvas: &mut C) -> bool
    where
        S: SpectrumSource + ?Sized,
        C: Canvas + ?Sized,
    {
        if !self.ticker.fire() {
            return false;
        }

        match self.draw(source, canvas) {
            Ok(()) => self.frames_drawn += 1,
            Err(err) => {
                self.frames_skipped += 1;
                warn!(%err, "skipping visualizer frame");
            }
        }

        if self.is_playing() {
            self.ticker.request();
        }
        true
    }

    /// Paints one frame from the current spectrum.
    pub fn draw<S, C>(&self, source: &S, canvas: &mut C) -> Result<()>
    where
        S: SpectrumSource + ?Sized,
        C: Canvas + ?Sized,
    {
        let (width, height) = canvas.size();
        if !(width > 0.0 && height > 0.0) {
            return Err(SpatialAudioError::EmptyCanvas);
        }

        let snapshot = source.spectrum();
        canvas.clear();
        for bar in bar_layout(&snapshot, self.bar_count, width, height) {
            canvas.fill_bar(&bar);
        }
        Ok(())
    }
}
