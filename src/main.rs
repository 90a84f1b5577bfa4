mod cli;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use rollsynth::{key_name, AudioOutput, NoteSink, SequencerRegistry, SynthEngine};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = cli::Args::parse();

    let engine = SynthEngine::new(args.synth_config())?;
    // Sequencing still runs without a device; there is just nothing to hear.
    let output = match AudioOutput::start(&engine) {
        Ok(output) => Some(output),
        Err(e) => {
            log::warn!("{}; continuing without sound", e);
            None
        }
    };

    let pattern = args.pattern()?;
    let registry = SequencerRegistry::new();
    let sink: Arc<dyn NoteSink> = Arc::new(engine.clone());

    let mut sequencers = Vec::with_capacity(args.sequencers);
    for _ in 0..args.sequencers.max(1) {
        let seq = registry.create(args.sequencer_config(), Arc::clone(&sink), None)?;
        for &(key, step) in &pattern {
            seq.set_cell(key, step, true)?;
        }
        sequencers.push(seq);
    }

    for &(key, step) in &pattern {
        log::info!("step {:>2}: {}", step, key_name(key));
    }
    if let Some(seq) = sequencers.first() {
        log::info!(
            "{} sequencer(s), {} steps at {} bpm ({:?} per pass)",
            sequencers.len(),
            seq.steps(),
            seq.bpm(),
            seq.sequence_duration()
        );
    }

    registry.play_all();

    let deadline = args
        .seconds
        .and_then(|s| Duration::try_from_secs_f32(s).ok())
        .map(|d| Instant::now() + d);
    while sequencers.iter().any(|s| s.is_playing()) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    registry.stop_all();
    // Let the last release ring out before the stream closes.
    thread::sleep(engine.note_length());
    drop(output);
    Ok(())
}
