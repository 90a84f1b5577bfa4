/// ROLLSYNTH - a piano-roll step sequencer driving a real-time synth
///
/// This library provides:
/// - A monophonic oscillator whose control registers are lock-free, with a
///   render path safe to call from a host audio callback
/// - A keys x steps sequencer grid played on a cancellable background loop
/// - A registry for starting and stopping many sequencers together
/// - Audio output through cpal

pub mod audio;
pub mod config;
pub mod error;
pub mod pitch;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types
pub use audio::AudioOutput;
pub use config::{SequencerConfig, SynthConfig};
pub use error::{Error, Result};
pub use pitch::{key_name, key_to_frequency};
pub use sequencer::registry::SequencerRegistry;
pub use sequencer::{CellObserver, CellState, Grid, NoteSink, Sequencer};
pub use synth::{Renderer, SynthEngine, Waveform};
