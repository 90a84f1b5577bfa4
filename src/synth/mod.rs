//! Synth engine - lock-free control registers and the render path

pub mod renderer;
pub mod waveform;
mod release;

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::config::SynthConfig;
use crate::error::Result;
use release::Release;

pub use renderer::Renderer;
pub use waveform::Waveform;

/// Word-sized registers shared with the render path.
///
/// Each one has a single writer (the control path) and is read with relaxed
/// ordering; a change may land one buffer late.
pub(crate) struct Registers {
    frequency: AtomicU32,
    amplitude: AtomicU32,
    waveform: AtomicU8,
}

impl Registers {
    fn new(config: &SynthConfig) -> Self {
        Self {
            frequency: AtomicU32::new(config.frequency.to_bits()),
            amplitude: AtomicU32::new(clamp_amplitude(config.amplitude).to_bits()),
            waveform: AtomicU8::new(config.waveform.index()),
        }
    }

    pub(crate) fn frequency(&self) -> f32 {
        f32::from_bits(self.frequency.load(Ordering::Relaxed))
    }

    pub(crate) fn amplitude(&self) -> f32 {
        f32::from_bits(self.amplitude.load(Ordering::Relaxed))
    }

    pub(crate) fn waveform(&self) -> Waveform {
        Waveform::from_index(self.waveform.load(Ordering::Relaxed))
    }
}

fn clamp_amplitude(amplitude: f32) -> f32 {
    if amplitude.is_nan() {
        0.0
    } else {
        amplitude.clamp(0.0, 1.0)
    }
}

/// Control handle for a monophonic oscillator.
///
/// Clones share the same registers, so any number of sequencers and UI
/// controls can drive one engine. Sound comes out of a [`Renderer`] obtained
/// from [`SynthEngine::renderer`].
#[derive(Clone)]
pub struct SynthEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    registers: Arc<Registers>,
    /// Bumped by every note event; serializes them against the release worker.
    generation: Arc<Mutex<u64>>,
    release_tx: Sender<Release>,
    note_length: Duration,
    sample_rate: f32,
}

impl SynthEngine {
    pub fn new(config: SynthConfig) -> Result<Self> {
        config.validate()?;

        let registers = Arc::new(Registers::new(&config));
        let generation = Arc::new(Mutex::new(0));
        let release_tx = release::spawn(Arc::clone(&registers), Arc::clone(&generation));

        log::debug!(
            target: "synth",
            "engine ready: {} Hz sample rate, {} waveform, {:?} notes",
            config.sample_rate,
            config.waveform.name(),
            config.note_length
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                registers,
                generation,
                release_tx,
                note_length: config.note_length,
                sample_rate: config.sample_rate,
            }),
        })
    }

    /// A renderer at the configured sample rate.
    pub fn renderer(&self) -> Renderer {
        self.renderer_at(self.inner.sample_rate)
    }

    /// A renderer for a device running at `sample_rate`. Each renderer keeps
    /// its own phase.
    pub fn renderer_at(&self, sample_rate: f32) -> Renderer {
        Renderer::new(Arc::clone(&self.inner.registers), sample_rate)
    }

    pub fn frequency(&self) -> f32 {
        self.inner.registers.frequency()
    }

    pub fn amplitude(&self) -> f32 {
        self.inner.registers.amplitude()
    }

    pub fn waveform(&self) -> Waveform {
        self.inner.registers.waveform()
    }

    pub fn note_length(&self) -> Duration {
        self.inner.note_length
    }

    pub fn set_frequency(&self, hz: f32) {
        self.inner.registers.frequency.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn set_amplitude(&self, amplitude: f32) {
        self.inner
            .registers
            .amplitude
            .store(clamp_amplitude(amplitude).to_bits(), Ordering::Relaxed);
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        self.set_waveform_index(waveform.index());
    }

    /// Raw selector write; indices with no waveform render as a sine.
    pub fn set_waveform_index(&self, index: u8) {
        self.inner.registers.waveform.store(index, Ordering::Relaxed);
    }

    /// Sound `hz` now and release it after the note length, unless another
    /// `note_on` or `note_off` comes first.
    pub fn note_on(&self, hz: f32) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.set_frequency(hz);

        let release = Release {
            generation: *generation,
            deadline: Instant::now() + self.inner.note_length,
        };
        // A dead worker only loses the automatic release.
        let _ = self.inner.release_tx.send(release);
    }

    pub fn note_off(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.set_frequency(0.0);
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.inner.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn engine_with_note(ms: u64) -> SynthEngine {
        SynthEngine::new(SynthConfig {
            note_length: Duration::from_millis(ms),
            ..Default::default()
        })
        .unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_register_writes() {
        let engine = SynthEngine::new(SynthConfig::default()).unwrap();
        assert_eq!(engine.frequency(), 440.0);

        engine.set_frequency(261.5);
        engine.set_waveform(Waveform::Triangle);
        assert_eq!(engine.frequency(), 261.5);
        assert_eq!(engine.waveform(), Waveform::Triangle);

        engine.set_amplitude(3.0);
        assert_eq!(engine.amplitude(), 1.0);
        engine.set_amplitude(-0.5);
        assert_eq!(engine.amplitude(), 0.0);
        engine.set_amplitude(f32::NAN);
        assert_eq!(engine.amplitude(), 0.0);
    }

    #[test]
    fn test_unknown_waveform_index_reads_as_sine() {
        let engine = SynthEngine::new(SynthConfig::default()).unwrap();
        engine.set_waveform_index(42);
        assert_eq!(engine.waveform(), Waveform::Sine);
    }

    #[test]
    fn test_note_off_is_idempotent() {
        let engine = SynthEngine::new(SynthConfig::default()).unwrap();
        engine.note_off();
        engine.note_off();
        assert_eq!(engine.frequency(), 0.0);
    }

    #[test]
    fn test_note_on_releases_itself() {
        let engine = engine_with_note(20);
        engine.note_on(330.0);
        assert_eq!(engine.frequency(), 330.0);
        assert!(wait_for(|| engine.frequency() == 0.0));
    }

    #[test]
    fn test_note_off_cancels_pending_release() {
        let engine = engine_with_note(20);
        engine.note_on(330.0);
        engine.note_off();
        engine.set_frequency(300.0);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(engine.frequency(), 300.0);
    }

    #[test]
    fn test_new_note_on_supersedes_pending_release() {
        let engine = engine_with_note(100);
        engine.note_on(330.0);
        thread::sleep(Duration::from_millis(60));
        engine.note_on(440.0);
        let second = Instant::now();

        // Past the first note's deadline, short of the second's.
        thread::sleep(Duration::from_millis(70));
        assert_eq!(engine.frequency(), 440.0);

        assert!(wait_for(|| engine.frequency() == 0.0));
        assert!(second.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_clones_share_registers() {
        let engine = SynthEngine::new(SynthConfig::default()).unwrap();
        let other = engine.clone();
        other.set_frequency(123.0);
        assert_eq!(engine.frequency(), 123.0);
    }
}
