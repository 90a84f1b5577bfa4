//! Command-line argument parsing.

use std::time::Duration;

use clap::Parser;

use rollsynth::pitch::parse_key_name;
use rollsynth::{SequencerConfig, SynthConfig, Waveform};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "rollsynth")]
#[command(about = "Piano-roll step sequencer playing a real-time synth", long_about = None)]
pub struct Args {
    /// Tempo in beats per minute (one step is a sixteenth note)
    #[arg(long, default_value = "120")]
    pub bpm: f32,

    /// Number of keys (pitch tracks) in the grid
    #[arg(long, default_value = "88")]
    pub keys: usize,

    /// Number of steps per pass
    #[arg(long, default_value = "16")]
    pub steps: usize,

    /// Restart at step zero after the last step
    #[arg(long = "loop")]
    pub looping: bool,

    /// Waveform: sine (default), square, sawtooth, triangle
    #[arg(long, default_value = "sine")]
    pub waveform: String,

    /// Output amplitude, 0..1
    #[arg(long, default_value = "0.1")]
    pub amplitude: f32,

    /// Automatic release time of a note
    #[arg(long, value_name = "MS", default_value = "200")]
    pub note_ms: u64,

    /// Cells to switch on, as KEY:STEP pairs; KEY is an index or a note name (A4:0,C5:4)
    #[arg(long, default_value = "A4:0,C#5:4,E5:8,A5:12")]
    pub pattern: String,

    /// Stop after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub seconds: Option<f32>,

    /// Number of sequencers to create from the pattern
    #[arg(long, default_value = "1")]
    pub sequencers: usize,
}

impl Args {
    pub fn synth_config(&self) -> SynthConfig {
        let waveform = Waveform::from_name(&self.waveform);
        if waveform.name() != self.waveform.trim().to_lowercase() {
            log::warn!("Unknown waveform '{}', using {}", self.waveform, waveform.name());
        }
        SynthConfig {
            amplitude: self.amplitude,
            waveform,
            note_length: Duration::from_millis(self.note_ms),
            ..Default::default()
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            keys: self.keys,
            steps: self.steps,
            bpm: self.bpm,
            looping: self.looping,
        }
    }

    pub fn pattern(&self) -> anyhow::Result<Vec<(usize, usize)>> {
        parse_pattern(&self.pattern)
    }
}

pub fn parse_pattern(text: &str) -> anyhow::Result<Vec<(usize, usize)>> {
    text.split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| -> anyhow::Result<(usize, usize)> {
            let (key, step) = cell
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Expected KEY:STEP, got '{}'", cell))?;
            let key = key
                .trim()
                .parse::<usize>()
                .ok()
                .or_else(|| parse_key_name(key))
                .ok_or_else(|| anyhow::anyhow!("Unknown key '{}'", key))?;
            let step = step
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("Bad step in '{}': {}", cell, e))?;
            Ok((key, step))
        })
        .collect()
}
