use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Sample,
};
use tracing::{info, warn};

use super::{AudioBackend, AudioContext, SharedGraph};
use crate::{EngineConfig, Result, SpatialAudioError};

/// Backend that plays through the host's default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceBackend;

impl AudioBackend for DeviceBackend {
    fn name(&self) -> &str {
        "device"
    }

    fn create_context(&self, _config: &EngineConfig) -> Result<Box<dyn AudioContext>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SpatialAudioError::Unavailable("no output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|err| SpatialAudioError::Unavailable(err.to_string()))?;

        info!(
            device = device.name().unwrap_or_default(),
            sample_rate = supported.sample_rate().0,
            channels = supported.channels(),
            "opened output device"
        );

        Ok(Box::new(DeviceContext {
            device,
            supported,
            stream: None,
            closed: false,
        }))
    }
}

pub struct DeviceContext {
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    stream: Option<cpal::Stream>,
    closed: bool,
}

impl AudioContext for DeviceContext {
    fn sample_rate(&self) -> u32 {
        self.supported.sample_rate().0
    }

    fn connect(&mut self, graph: SharedGraph) -> Result<()> {
        let config: cpal::StreamConfig = self.supported.config();
        let stream = match self.supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&self.device, &config, graph)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&self.device, &config, graph)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&self.device, &config, graph)?,
            other => {
                return Err(SpatialAudioError::Unavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|err| SpatialAudioError::Unavailable(err.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the stream releases the device.
        self.stream = None;
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = usize::from(config.channels);
    let mut stereo: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                stereo.resize(frames * 2, 0.0);

                // Never block the device thread on the control side.
                match graph.try_lock() {
                    Ok(mut graph) => graph.render(&mut stereo),
                    Err(_) => stereo.fill(0.0),
                }

                for (frame, pair) in data.chunks_mut(channels).zip(stereo.chunks_exact(2)) {
                    let left = if pair[0].is_finite() {
                        pair[0].clamp(-0.95, 0.95)
                    } else {
                        0.0
                    };
                    let right = if pair[1].is_finite() {
                        pair[1].clamp(-0.95, 0.95)
                    } else {
                        0.0
                    };

                    if channels >= 2 {
                        frame[0] = T::from_sample(left);
                        frame[1] = T::from_sample(right);
                    } else {
                        frame[0] = T::from_sample((left + right) * 0.5);
                    }

                    for sample in frame.iter_mut().skip(2) {
                        *sample = T::from_sample(0.0);
                    }
                }
            },
            |err| warn!(%err, "output stream error"),
            None,
        )
        .map_err(|err| SpatialAudioError::Unavailable(err.to_string()))
}
