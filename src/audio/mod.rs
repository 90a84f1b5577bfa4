//! Audio output using cpal - pulls samples from a synth renderer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::{Error, Result};
use crate::synth::{Renderer, SynthEngine};

pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: f32,
    channels: usize,
    device_name: String,
}

impl AudioOutput {
    /// Open the default output device and start rendering `engine` into it.
    pub fn start(engine: &SynthEngine) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("No output device found".to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let config = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let renderer = engine.renderer_at(sample_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream(&device, &config.into(), renderer, channels)?,
            other => {
                return Err(Error::Audio(format!("Unsupported sample format: {:?}", other)));
            }
        };
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        log::info!(
            target: "audio",
            "output on '{}': {} Hz, {} channels",
            device_name,
            sample_rate,
            channels
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
            device_name,
        })
    }

    fn build_stream(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut renderer: Renderer,
        channels: usize,
    ) -> Result<cpal::Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render_interleaved(data, channels);
                },
                |err| log::error!(target: "audio", "Audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
