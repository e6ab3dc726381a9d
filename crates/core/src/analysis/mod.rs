use std::{f32::consts::PI, fmt, ops::Deref, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{EngineConfig, Result};

const BLACKMAN_ALPHA: f32 = 0.16;

/// Byte magnitudes, one per frequency bin, read from the analyzer at a single
/// instant. Snapshots are never cached by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerSnapshot(Vec<u8>);

impl AnalyzerSnapshot {
    pub fn new(bins: Vec<u8>) -> Self {
        Self(bins)
    }

    pub fn bins(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    pub fn is_silent(&self) -> bool {
        self.0.iter().all(|&bin| bin == 0)
    }

    /// Index of the loudest bin, if any.
    pub fn peak_bin(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .max_by_key(|&(_, value)| *value)
            .map(|(index, _)| index)
    }
}

impl Deref for AnalyzerSnapshot {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for AnalyzerSnapshot {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// Terminal tap of the processing graph.
///
/// Keeps the most recent `fft_size` mono samples and turns them into byte
/// frequency data on request: Blackman window, real FFT, per-bin exponential
/// smoothing and a linear map of the configured decibel range onto 0..=255.
pub struct Analyzer {
    fft_size: usize,
    ring: Vec<f32>,
    write_pos: usize,
    generation: u64,
    smoothed_generation: Option<u64>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    fft: FftResources,
}

impl Analyzer {
    pub fn new(config: &EngineConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(fft_size);
        let fft = FftResources {
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
        };

        Self {
            fft_size,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            generation: 0,
            smoothed_generation: None,
            smoothing: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: (0..fft_size).map(|n| blackman_value(n, fft_size)).collect(),
            smoothed: vec![0.0; fft_size / 2],
            fft,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.ring[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.fft_size;
    }

    /// Marks the end of a rendered block; the next snapshot smooths again.
    pub fn end_block(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Computes the byte magnitudes for the current contents of the buffer.
    pub fn snapshot(&mut self) -> Result<AnalyzerSnapshot> {
        if self.smoothed_generation != Some(self.generation) {
            self.update_smoothed()?;
            self.smoothed_generation = Some(self.generation);
        }

        let range = self.max_decibels - self.min_decibels;
        let bins = self
            .smoothed
            .iter()
            .map(|&magnitude| {
                let db = 20.0 * magnitude.log10();
                let scaled = 255.0 * (db - self.min_decibels) / range;
                if scaled.is_nan() {
                    0
                } else {
                    scaled.clamp(0.0, 255.0) as u8
                }
            })
            .collect();

        Ok(AnalyzerSnapshot(bins))
    }

    pub fn reset(&mut self) {
        self.ring.iter_mut().for_each(|sample| *sample = 0.0);
        self.smoothed.iter_mut().for_each(|value| *value = 0.0);
        self.write_pos = 0;
        self.smoothed_generation = None;
    }

    fn update_smoothed(&mut self) -> Result<()> {
        // Oldest sample sits at the write cursor.
        for (index, slot) in self.fft.input.iter_mut().enumerate() {
            let sample = self.ring[(self.write_pos + index) % self.fft_size];
            *slot = sample * self.window[index];
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (value, bin) in self.smoothed.iter_mut().zip(&self.fft.spectrum) {
            let magnitude = bin.norm() * scale;
            let next = tau * *value + (1.0 - tau) * magnitude;
            *value = if next.is_finite() { next } else { 0.0 };
        }
        Ok(())
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("fft_size", &self.fft_size)
            .field("generation", &self.generation)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * BLACKMAN_ALPHA;
    let x = index as f32 / len as f32;
    a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> Analyzer {
        Analyzer::new(&EngineConfig::default())
    }

    fn feed_sine(analyzer: &mut Analyzer, frequency: f32, sample_rate: f32, count: usize) {
        for n in 0..count {
            analyzer.push((2.0 * PI * frequency * n as f32 / sample_rate).sin());
        }
        analyzer.end_block();
    }

    #[test]
    fn silence_reads_as_zero() {
        let mut analyzer = analyzer();
        analyzer.end_block();
        let snapshot = analyzer.snapshot().unwrap();
        assert_eq!(snapshot.len(), 128);
        assert!(snapshot.is_silent());
    }

    #[test]
    fn sine_peaks_in_its_bin() {
        let mut analyzer = analyzer();
        // 48 kHz / 256 = 187.5 Hz per bin.
        feed_sine(&mut analyzer, 10.0 * 187.5, 48_000.0, 256);
        let snapshot = analyzer.snapshot().unwrap();
        assert_eq!(snapshot.peak_bin(), Some(10));
        assert!(snapshot[60] < snapshot[10]);
    }

    #[test]
    fn repeated_reads_without_new_audio_agree() {
        let mut analyzer = analyzer();
        feed_sine(&mut analyzer, 3_000.0, 48_000.0, 512);
        let first = analyzer.snapshot().unwrap();
        let second = analyzer.snapshot().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn smoothing_rises_over_successive_blocks() {
        let mut analyzer = Analyzer::new(&EngineConfig {
            max_decibels: 0.0,
            ..EngineConfig::default()
        });
        feed_sine(&mut analyzer, 10.0 * 187.5, 48_000.0, 256);
        let first = analyzer.snapshot().unwrap();
        feed_sine(&mut analyzer, 10.0 * 187.5, 48_000.0, 256);
        let second = analyzer.snapshot().unwrap();
        assert!(second[10] > first[10]);
    }

    #[test]
    fn blackman_window_tapers_edges() {
        assert!(blackman_value(0, 256).abs() < 1e-6);
        assert!((blackman_value(128, 256) - 1.0).abs() < 1e-6);
    }
}
