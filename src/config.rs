//! Default settings for the engine and sequencers

use std::time::Duration;

use crate::error::{Error, Result};
use crate::synth::Waveform;

pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Used by renderers that are not bound to a device.
    pub sample_rate: f32,
    pub amplitude: f32,
    /// Frequency sounding before any sequencer or slider touches the engine.
    pub frequency: f32,
    pub waveform: Waveform,
    /// How long a `note_on` sounds before the automatic release.
    pub note_length: Duration,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            amplitude: 0.1,
            frequency: 440.0,
            waveform: Waveform::Sine,
            note_length: Duration::from_millis(200),
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "frequency must be >= 0, got {}",
                self.frequency
            )));
        }
        if self.note_length.is_zero() {
            return Err(Error::InvalidConfig("note length must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub keys: usize,
    pub steps: usize,
    pub bpm: f32,
    pub looping: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            keys: 88,
            steps: 16,
            bpm: 120.0,
            looping: false,
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.keys == 0 || self.steps == 0 {
            return Err(Error::InvalidConfig(format!(
                "grid must be non-empty, got {} keys x {} steps",
                self.keys, self.steps
            )));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(Error::InvalidBpm(format!("{}", self.bpm)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SynthConfig::default().validate().is_ok());
        let seq = SequencerConfig::default();
        assert!(seq.validate().is_ok());
        assert_eq!((seq.keys, seq.steps), (88, 16));
    }

    #[test]
    fn test_rejects_empty_grid_and_bad_tempo() {
        let empty = SequencerConfig { steps: 0, ..Default::default() };
        assert!(matches!(empty.validate(), Err(Error::InvalidConfig(_))));

        let slow = SequencerConfig { bpm: 0.0, ..Default::default() };
        assert!(matches!(slow.validate(), Err(Error::InvalidBpm(_))));
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        let cfg = SynthConfig { sample_rate: -1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
