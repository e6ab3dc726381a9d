use std::{
    f32::consts::PI,
    fmt,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::warn;

use crate::{Result, SpatialAudioError};

/// Shared handle to one playable media resource.
///
/// The player keeps one clone to drive transport (play, pause, seek) and hands
/// another to the engine, whose source node pulls frames from it. A paused or
/// finished element renders silence.
#[derive(Clone)]
pub struct MediaElement {
    inner: Arc<Mutex<MediaState>>,
}

struct MediaState {
    label: String,
    /// Interleaved PCM.
    samples: Arc<[f32]>,
    channels: usize,
    sample_rate: u32,
    cursor: usize,
    playing: bool,
    ended: bool,
}

impl MediaState {
    fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }
}

impl MediaElement {
    /// Wraps interleaved samples. Only the first two channels are played.
    pub fn from_samples(
        label: impl Into<String>,
        samples: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(SpatialAudioError::msg("media must have at least one channel"));
        }
        if sample_rate == 0 {
            return Err(SpatialAudioError::msg("media sample rate must be positive"));
        }

        let state = MediaState {
            label: label.into(),
            samples: samples.into(),
            channels: usize::from(channels),
            sample_rate,
            cursor: 0,
            playing: false,
            ended: false,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
        })
    }

    /// Mono sine tone, mostly useful as a stand-in source.
    pub fn tone(frequency: f32, seconds: f32, amplitude: f32, sample_rate: u32) -> Result<Self> {
        let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
        let samples = (0..frames)
            .map(|n| amplitude * (2.0 * PI * frequency * n as f32 / sample_rate as f32).sin())
            .collect();
        Self::from_samples(format!("tone {frequency} Hz"), samples, 1, sample_rate)
    }

    pub fn silence(seconds: f32, sample_rate: u32) -> Result<Self> {
        let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
        Self::from_samples("silence", vec![0.0; frames], 1, sample_rate)
    }

    /// Decodes a WAV file (integer or float PCM) into memory.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        Self::from_samples(
            path.display().to_string(),
            samples,
            spec.channels,
            spec.sample_rate,
        )
    }

    pub fn label(&self) -> String {
        self.lock().map(|state| state.label.clone()).unwrap_or_default()
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().map(|state| state.sample_rate).unwrap_or(0)
    }

    pub fn channels(&self) -> u16 {
        self.lock()
            .map(|state| state.channels as u16)
            .unwrap_or(0)
    }

    pub fn play(&self) {
        if let Some(mut state) = self.lock() {
            if state.ended {
                state.cursor = 0;
                state.ended = false;
            }
            state.playing = true;
        }
    }

    pub fn pause(&self) {
        if let Some(mut state) = self.lock() {
            state.playing = false;
        }
    }

    pub fn seek(&self, seconds: f32) {
        if let Some(mut state) = self.lock() {
            let frame = (seconds.max(0.0) * state.sample_rate as f32) as usize;
            state.cursor = frame.min(state.frame_count());
            state.ended = state.cursor >= state.frame_count();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock().map(|state| state.playing).unwrap_or(false)
    }

    pub fn ended(&self) -> bool {
        self.lock().map(|state| state.ended).unwrap_or(false)
    }

    pub fn current_time(&self) -> f32 {
        self.lock()
            .map(|state| state.cursor as f32 / state.sample_rate as f32)
            .unwrap_or(0.0)
    }

    pub fn duration(&self) -> f32 {
        self.lock()
            .map(|state| state.frame_count() as f32 / state.sample_rate as f32)
            .unwrap_or(0.0)
    }

    /// Fills `out` with interleaved stereo frames and returns how many frames
    /// carried media. The remainder is zeroed.
    pub fn read_stereo(&self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        let Some(mut state) = self.lock() else {
            return 0;
        };
        if !state.playing {
            return 0;
        }

        let channels = state.channels;
        let available = state.frame_count() - state.cursor;
        let frames = (out.len() / 2).min(available);
        let start = state.cursor * channels;

        for (frame, slot) in out.chunks_exact_mut(2).take(frames).enumerate() {
            let base = start + frame * channels;
            let left = state.samples[base];
            let right = if channels > 1 {
                state.samples[base + 1]
            } else {
                left
            };
            slot[0] = left;
            slot[1] = right;
        }

        state.cursor += frames;
        if state.cursor >= state.frame_count() {
            state.ended = true;
            state.playing = false;
        }
        frames
    }

    /// Whether both handles refer to the same element.
    pub fn same_as(&self, other: &MediaElement) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> Option<MutexGuard<'_, MediaState>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("media element has been poisoned");
                None
            }
        }
    }
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaElement")
            .field("label", &self.label())
            .field("sample_rate", &self.sample_rate())
            .field("playing", &self.is_playing())
            .finish()
    }
}

/// Writes interleaved stereo frames as a 32-bit float WAV file.
pub fn write_stereo_wav(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
