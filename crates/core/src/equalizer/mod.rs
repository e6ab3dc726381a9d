//! Ten-band equalizer chain.
//!
//! Band 0 is a low shelf, band 9 a high shelf and the eight bands in between
//! are peaking filters. Centre frequencies and shapes are fixed at
//! construction; only the per-band gain changes at runtime.

use std::{f32::consts::PI, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::SpatialAudioError;

pub const BAND_COUNT: usize = 10;

/// Centre frequencies (Hz) of the equalizer bands, ascending.
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Q of the interior peaking bands.
const PEAKING_Q: f32 = 1.0;

/// Gains beyond this magnitude saturate inside the filter.
const GAIN_SATURATION_DB: f32 = 40.0;

/// Keeps the centre frequency clear of Nyquist.
const MAX_FREQUENCY_RATIO: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterShape {
    LowShelf,
    Peaking,
    HighShelf,
}

impl FilterShape {
    /// Shape used for the band at `index` in the fixed table.
    pub fn for_band(index: usize) -> Self {
        match index {
            0 => Self::LowShelf,
            i if i == BAND_COUNT - 1 => Self::HighShelf,
            _ => Self::Peaking,
        }
    }
}

/// Public description of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerBand {
    pub center_frequency_hz: f32,
    pub gain_db: f32,
    pub filter_shape: FilterShape,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn compute(shape: FilterShape, frequency: f32, gain_db: f32, sample_rate: f32) -> Self {
        if sample_rate < 1.0 || !gain_db.is_finite() || gain_db == 0.0 {
            return Self::IDENTITY;
        }

        let gain_db = gain_db.clamp(-GAIN_SATURATION_DB, GAIN_SATURATION_DB);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let frequency = frequency.min(sample_rate * MAX_FREQUENCY_RATIO);
        let omega = 2.0 * PI * frequency / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match shape {
            FilterShape::Peaking => {
                let alpha = sin_w / (2.0 * PEAKING_Q);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w,
                    1.0 - alpha / a,
                )
            }
            FilterShape::LowShelf => {
                // Shelf slope of 1.
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * (sin_w / 2.0 * 2.0_f32.sqrt());
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
            FilterShape::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * (sin_w / 2.0 * 2.0_f32.sqrt());
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude response in dB at `frequency`.
    fn magnitude_db(&self, frequency: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den).log10()
    }
}

/// Stereo biquad section for one band.
#[derive(Debug, Clone)]
struct BiquadBand {
    frequency: f32,
    shape: FilterShape,
    gain_db: f32,
    coeffs: Coefficients,
    // Direct form I history, [left, right].
    x1: [f32; 2],
    x2: [f32; 2],
    y1: [f32; 2],
    y2: [f32; 2],
}

impl BiquadBand {
    fn new(frequency: f32, shape: FilterShape) -> Self {
        Self {
            frequency,
            shape,
            gain_db: 0.0,
            coeffs: Coefficients::IDENTITY,
            x1: [0.0; 2],
            x2: [0.0; 2],
            y1: [0.0; 2],
            y2: [0.0; 2],
        }
    }

    fn set_gain(&mut self, gain_db: f32, sample_rate: f32) {
        self.gain_db = gain_db;
        self.coeffs = Coefficients::compute(self.shape, self.frequency, gain_db, sample_rate);
    }

    #[inline]
    fn process_channel(&mut self, channel: usize, input: f32) -> f32 {
        let c = &self.coeffs;
        let mut out = c.b0 * input + c.b1 * self.x1[channel] + c.b2 * self.x2[channel]
            - c.a1 * self.y1[channel]
            - c.a2 * self.y2[channel];

        // Flush denormals.
        if out.abs() < 1e-15 {
            out = 0.0;
        }

        self.x2[channel] = self.x1[channel];
        self.x1[channel] = input;
        self.y2[channel] = self.y1[channel];
        self.y1[channel] = out;
        out
    }

    fn reset(&mut self) {
        self.x1 = [0.0; 2];
        self.x2 = [0.0; 2];
        self.y1 = [0.0; 2];
        self.y2 = [0.0; 2];
    }
}

/// The chain of ten bands between the source and the spatializer.
#[derive(Debug, Clone)]
pub struct Equalizer {
    bands: Vec<BiquadBand>,
    sample_rate: f32,
}

impl Equalizer {
    pub fn new(sample_rate: f32) -> Self {
        let bands = BAND_FREQUENCIES
            .iter()
            .enumerate()
            .map(|(index, &frequency)| BiquadBand::new(frequency, FilterShape::for_band(index)))
            .collect();
        Self { bands, sample_rate }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Sets the gain of one band. Out-of-range indices are ignored; the gain
    /// is stored verbatim.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> bool {
        let sample_rate = self.sample_rate;
        match self.bands.get_mut(index) {
            Some(band) => {
                band.set_gain(gain_db, sample_rate);
                true
            }
            None => false,
        }
    }

    pub fn set_gains(&mut self, gains: &[f32; BAND_COUNT]) {
        for (index, &gain) in gains.iter().enumerate() {
            self.set_band_gain(index, gain);
        }
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|band| band.gain_db)
    }

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        let mut gains = [0.0; BAND_COUNT];
        for (slot, band) in gains.iter_mut().zip(&self.bands) {
            *slot = band.gain_db;
        }
        gains
    }

    pub fn band(&self, index: usize) -> Option<EqualizerBand> {
        self.bands.get(index).map(|band| EqualizerBand {
            center_frequency_hz: band.frequency,
            gain_db: band.gain_db,
            filter_shape: band.shape,
        })
    }

    /// Combined magnitude response of the whole chain in dB.
    pub fn response_db(&self, frequency: f32) -> f32 {
        self.bands
            .iter()
            .map(|band| band.coeffs.magnitude_db(frequency, self.sample_rate))
            .sum()
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut l = left;
        let mut r = right;
        for band in &mut self.bands {
            l = band.process_channel(0, l);
            r = band.process_channel(1, r);
        }
        (l, r)
    }

    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }
}

/// Built-in equalizer presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EqPreset {
    #[default]
    Flat,
    BassBoost,
    TrebleBoost,
    Vocal,
    Rock,
    Pop,
    Electronic,
    Jazz,
    Classical,
}

impl EqPreset {
    pub const ALL: [EqPreset; 9] = [
        Self::Flat,
        Self::BassBoost,
        Self::TrebleBoost,
        Self::Vocal,
        Self::Rock,
        Self::Pop,
        Self::Electronic,
        Self::Jazz,
        Self::Classical,
    ];

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        match self {
            Self::Flat => [0.0; BAND_COUNT],
            Self::BassBoost => [8.0, 6.0, 4.0, 2.0, 0.0, -2.0, -2.0, -2.0, -2.0, -2.0],
            Self::TrebleBoost => [-2.0, -2.0, -2.0, -2.0, 0.0, 2.0, 4.0, 6.0, 8.0, 8.0],
            Self::Vocal => [-2.0, -2.0, -2.0, 2.0, 4.0, 4.0, 4.0, 2.0, 0.0, -2.0],
            Self::Rock => [6.0, 4.0, 2.0, -2.0, -2.0, 0.0, 2.0, 4.0, 6.0, 6.0],
            Self::Pop => [-1.0, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -1.0],
            Self::Electronic => [6.0, 4.0, 2.0, 0.0, -2.0, 0.0, 2.0, 4.0, 6.0, 8.0],
            Self::Jazz => [4.0, 2.0, 0.0, 2.0, -2.0, -2.0, 0.0, 2.0, 4.0, 4.0],
            Self::Classical => [4.0, 2.0, 0.0, 0.0, -2.0, -2.0, 0.0, 2.0, 4.0, 4.0],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::BassBoost => "Bass Boost",
            Self::TrebleBoost => "Treble Boost",
            Self::Vocal => "Vocal",
            Self::Rock => "Rock",
            Self::Pop => "Pop",
            Self::Electronic => "Electronic",
            Self::Jazz => "Jazz",
            Self::Classical => "Classical",
        }
    }

    /// Identifier accepted by [`FromStr`].
    pub fn key(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::BassBoost => "bass",
            Self::TrebleBoost => "treble",
            Self::Vocal => "vocal",
            Self::Rock => "rock",
            Self::Pop => "pop",
            Self::Electronic => "electronic",
            Self::Jazz => "jazz",
            Self::Classical => "classical",
        }
    }
}

impl fmt::Display for EqPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EqPreset {
    type Err = SpatialAudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.key() == wanted)
            .ok_or_else(|| SpatialAudioError::msg(format!("unknown equalizer preset `{s}`")))
    }
}
