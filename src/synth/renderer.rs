use std::f32::consts::TAU;
use std::sync::Arc;

use super::{Registers, Waveform};
use crate::config::DEFAULT_SAMPLE_RATE;

/// Render-path half of a synth engine.
///
/// Owns the oscillator phase; everything else is read from the engine's
/// registers once per buffer. `render` never allocates, locks or logs, so it
/// is safe to call from a host audio callback.
pub struct Renderer {
    registers: Arc<Registers>,
    sample_rate: f32,
    phase: f32,
}

impl Renderer {
    pub(super) fn new(registers: Arc<Registers>, sample_rate: f32) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            log::warn!(target: "synth", "invalid sample rate {}, using {}", sample_rate, DEFAULT_SAMPLE_RATE);
            DEFAULT_SAMPLE_RATE
        };
        Self {
            registers,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Fill `frame_count` interleaved frames of `buffer`, duplicating each
    /// sample across `channel_count` channels.
    ///
    /// A zero channel count is treated as mono and the frame count is
    /// clipped to what fits in `buffer`. A frequency of zero (or a negative
    /// or non-finite one) writes silence and leaves the phase where it was.
    pub fn render(&mut self, buffer: &mut [f32], frame_count: usize, channel_count: usize) {
        let channels = channel_count.max(1);
        let frames = frame_count.min(buffer.len() / channels);
        let out = &mut buffer[..frames * channels];

        let frequency = self.registers.frequency();
        if !(frequency.is_finite() && frequency > 0.0) {
            out.fill(0.0);
            return;
        }
        let amplitude = self.registers.amplitude();
        let waveform = self.registers.waveform();
        let increment = TAU * frequency / self.sample_rate;

        for frame in out.chunks_exact_mut(channels) {
            self.phase += increment;
            if self.phase >= TAU {
                self.phase = self.phase.rem_euclid(TAU);
            }
            frame.fill(amplitude * waveform.sample(self.phase));
        }
    }

    /// `render` over the whole buffer.
    pub fn render_interleaved(&mut self, buffer: &mut [f32], channel_count: usize) {
        let frames = buffer.len() / channel_count.max(1);
        self.render(buffer, frames, channel_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::synth::SynthEngine;

    fn engine() -> SynthEngine {
        SynthEngine::new(SynthConfig {
            amplitude: 0.5,
            frequency: 1000.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_render_is_continuous_across_calls() {
        let engine = engine();
        let mut split = engine.renderer();
        let mut whole = engine.renderer();

        let mut first = vec![0.0; 256];
        let mut second = vec![0.0; 256];
        split.render(&mut first, 128, 2);
        split.render(&mut second, 128, 2);

        let mut once = vec![0.0; 512];
        whole.render(&mut once, 256, 2);

        first.extend_from_slice(&second);
        assert_eq!(first, once);
        assert_eq!(split.phase(), whole.phase());
    }

    #[test]
    fn test_channels_are_duplicated() {
        let engine = engine();
        let mut renderer = engine.renderer();
        let mut buffer = vec![0.0; 300];
        renderer.render(&mut buffer, 100, 3);
        for frame in buffer.chunks_exact(3) {
            assert_eq!(frame[0], frame[1]);
            assert_eq!(frame[1], frame[2]);
        }
        assert!(buffer.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_amplitude_scales_output() {
        let engine = engine();
        let mut renderer = engine.renderer();
        let mut buffer = vec![0.0; 480];
        renderer.render_interleaved(&mut buffer, 1);
        let peak = buffer.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.5 && peak > 0.49, "peak {}", peak);
    }

    #[test]
    fn test_first_sample_matches_formula() {
        let engine = engine();
        engine.set_waveform(Waveform::Sawtooth);
        let mut renderer = engine.renderer_at(48_000.0);
        let mut buffer = [0.0; 1];
        renderer.render(&mut buffer, 1, 1);
        let phase = TAU * 1000.0 / 48_000.0;
        assert!((buffer[0] - 0.5 * (2.0 * (phase / TAU) - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_phase_stays_within_one_cycle() {
        let engine = engine();
        engine.set_frequency(19_000.0);
        let mut renderer = engine.renderer();
        let mut buffer = vec![0.0; 4096];
        for _ in 0..10 {
            renderer.render_interleaved(&mut buffer, 2);
            assert!((0.0..TAU).contains(&renderer.phase()));
        }
    }

    #[test]
    fn test_silence_and_bad_input_are_clamped() {
        let engine = engine();
        let mut renderer = engine.renderer();
        let mut buffer = vec![1.0; 64];

        engine.set_frequency(-200.0);
        renderer.render(&mut buffer, 32, 2);
        assert!(buffer.iter().all(|s| *s == 0.0));

        engine.note_off();
        buffer.fill(1.0);
        renderer.render(&mut buffer, 32, 0);
        assert!(buffer[..32].iter().all(|s| *s == 0.0));
        assert_eq!(renderer.phase(), 0.0);

        // Frame count larger than the buffer is clipped, not a panic.
        engine.set_frequency(440.0);
        renderer.render(&mut buffer, 1000, 2);
    }

    #[test]
    fn test_unknown_waveform_renders_as_sine() {
        let engine = engine();
        let mut sine = engine.renderer();
        let mut unknown = engine.renderer();

        let mut expected = vec![0.0; 128];
        engine.set_waveform(Waveform::Sine);
        sine.render_interleaved(&mut expected, 2);

        let mut actual = vec![0.0; 128];
        engine.set_waveform_index(200);
        unknown.render_interleaved(&mut actual, 2);

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_invalid_sample_rate_falls_back() {
        let engine = engine();
        assert_eq!(engine.renderer_at(0.0).sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(engine.renderer_at(44_100.0).sample_rate(), 44_100.0);
    }
}
