//! Piano-roll sequencer - grid state, transport and tempo
//! The step loop itself lives in `playback`, the play/stop-all broadcast in `registry`.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::SequencerConfig;
use crate::error::{Error, Result};
use crate::synth::SynthEngine;

pub mod playback;
pub mod registry;

use playback::StepTask;
use registry::Registration;

/// Keys x steps grid of note flags. Always rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<Vec<bool>>,
    keys: usize,
    steps: usize,
}

impl Grid {
    pub fn new(keys: usize, steps: usize) -> Self {
        Self {
            cells: vec![vec![false; steps]; keys],
            keys,
            steps,
        }
    }

    pub fn keys(&self) -> usize {
        self.keys
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn check(&self, key: usize, step: usize) -> Result<()> {
        if key < self.keys && step < self.steps {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                key,
                step,
                keys: self.keys,
                steps: self.steps,
            })
        }
    }

    pub fn get(&self, key: usize, step: usize) -> Result<bool> {
        self.check(key, step)?;
        Ok(self.cells[key][step])
    }

    pub fn set(&mut self, key: usize, step: usize, value: bool) -> Result<()> {
        self.check(key, step)?;
        self.cells[key][step] = value;
        Ok(())
    }

    /// Flip a cell and return its new value.
    pub fn toggle(&mut self, key: usize, step: usize) -> Result<bool> {
        self.check(key, step)?;
        let cell = &mut self.cells[key][step];
        *cell = !*cell;
        Ok(*cell)
    }

    /// Keys switched on at `step`, lowest key first.
    pub fn active_keys(&self, step: usize) -> Vec<usize> {
        (0..self.keys)
            .filter(|&key| self.cells[key].get(step).copied().unwrap_or(false))
            .collect()
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(false);
        }
    }
}

/// Display state of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Default,
    Active,
    Playing,
    InactivePlaying,
}

impl CellState {
    pub fn idle(on: bool) -> Self {
        if on {
            CellState::Active
        } else {
            CellState::Default
        }
    }

    pub fn playing(on: bool) -> Self {
        if on {
            CellState::Playing
        } else {
            CellState::InactivePlaying
        }
    }
}

/// Receives cell display changes. Called from the caller's thread for
/// toggles and from the step thread during playback.
pub trait CellObserver: Send + Sync {
    fn cell_changed(&self, key: usize, step: usize, state: CellState);
}

/// Whatever a sequencer plays into.
pub trait NoteSink: Send + Sync {
    fn note_on(&self, frequency: f32);
    fn note_off(&self);
}

impl NoteSink for SynthEngine {
    fn note_on(&self, frequency: f32) {
        SynthEngine::note_on(self, frequency);
    }

    fn note_off(&self) {
        SynthEngine::note_off(self);
    }
}

const NO_STEP: usize = usize::MAX;

/// State shared between a sequencer and its step thread.
pub(crate) struct Shared {
    grid: Mutex<Grid>,
    bpm: AtomicU32,
    looping: AtomicBool,
    playing: AtomicBool,
    current_step: AtomicUsize,
    sink: Arc<dyn NoteSink>,
    observer: Option<Arc<dyn CellObserver>>,
}

impl Shared {
    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bpm(&self) -> f32 {
        f32::from_bits(self.bpm.load(Ordering::Relaxed))
    }

    /// Sixteenth-note length at the current tempo.
    fn step_duration(&self) -> Duration {
        Duration::try_from_secs_f32(60.0 / self.bpm() / 4.0).unwrap_or(Duration::MAX)
    }

    fn notify(&self, key: usize, step: usize, state: CellState) {
        if let Some(observer) = &self.observer {
            observer.cell_changed(key, step, state);
        }
    }

    /// Highlight one column as playing or idle, returning its active keys.
    fn highlight_column(&self, step: usize, playing: bool) -> Vec<usize> {
        let column: Vec<bool> = {
            let grid = self.grid();
            (0..grid.keys()).map(|key| grid.cells[key][step]).collect()
        };

        for (key, &on) in column.iter().enumerate() {
            let state = if playing { CellState::playing(on) } else { CellState::idle(on) };
            self.notify(key, step, state);
        }

        column
            .iter()
            .enumerate()
            .filter_map(|(key, &on)| on.then_some(key))
            .collect()
    }

    fn reset_highlights(&self) {
        if self.observer.is_none() {
            return;
        }
        let grid = self.grid().clone();
        for key in 0..grid.keys() {
            for step in 0..grid.steps() {
                self.notify(key, step, CellState::idle(grid.cells[key][step]));
            }
        }
    }
}

/// A piano roll driving one note sink.
///
/// Playback runs on its own thread; every method may be called from any
/// thread, including from a [`CellObserver`] callback.
pub struct Sequencer {
    id: u64,
    shared: Arc<Shared>,
    task: Mutex<Option<StepTask>>,
    _registration: Option<Registration>,
}

impl Sequencer {
    pub fn new(
        config: SequencerConfig,
        sink: Arc<dyn NoteSink>,
        observer: Option<Arc<dyn CellObserver>>,
    ) -> Result<Self> {
        Self::build(0, config, sink, observer, None)
    }

    pub(crate) fn build(
        id: u64,
        config: SequencerConfig,
        sink: Arc<dyn NoteSink>,
        observer: Option<Arc<dyn CellObserver>>,
        registration: Option<Registration>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            grid: Mutex::new(Grid::new(config.keys, config.steps)),
            bpm: AtomicU32::new(config.bpm.to_bits()),
            looping: AtomicBool::new(config.looping),
            playing: AtomicBool::new(false),
            current_step: AtomicUsize::new(NO_STEP),
            sink,
            observer,
        });

        Ok(Self {
            id,
            shared,
            task: Mutex::new(None),
            _registration: registration,
        })
    }

    /// Registry id; zero for sequencers built outside a registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn keys(&self) -> usize {
        self.shared.grid().keys()
    }

    pub fn steps(&self) -> usize {
        self.shared.grid().steps()
    }

    pub fn grid(&self) -> Grid {
        self.shared.grid().clone()
    }

    pub fn get(&self, key: usize, step: usize) -> Result<bool> {
        self.shared.grid().get(key, step)
    }

    pub fn active_keys(&self, step: usize) -> Vec<usize> {
        self.shared.grid().active_keys(step)
    }

    /// Flip a cell and report its new display state.
    pub fn toggle(&self, key: usize, step: usize) -> Result<bool> {
        let on = self.shared.grid().toggle(key, step).map_err(|e| {
            log::error!(target: "sequencer", "toggle rejected: {}", e);
            e
        })?;
        self.shared.notify(key, step, CellState::idle(on));
        Ok(on)
    }

    pub fn set_cell(&self, key: usize, step: usize, on: bool) -> Result<()> {
        self.shared.grid().set(key, step, on)?;
        self.shared.notify(key, step, CellState::idle(on));
        Ok(())
    }

    pub fn clear(&self) {
        self.shared.grid().clear();
        self.shared.reset_highlights();
    }

    pub fn bpm(&self) -> f32 {
        self.shared.bpm()
    }

    /// Takes effect at the next step boundary.
    pub fn set_bpm(&self, bpm: f32) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            log::error!(target: "sequencer", "Invalid BPM value entered: {}", bpm);
            return Err(Error::InvalidBpm(bpm.to_string()));
        }
        self.shared.bpm.store(bpm.to_bits(), Ordering::Relaxed);
        log::info!(target: "sequencer", "BPM changed to: {}", bpm);
        Ok(())
    }

    /// Text-field entry point for the tempo; the old value stays on failure.
    pub fn set_bpm_text(&self, text: &str) -> Result<f32> {
        let bpm = text.trim().parse::<f32>().map_err(|_| {
            log::error!(target: "sequencer", "Invalid BPM value entered: {:?}", text);
            Error::InvalidBpm(text.to_string())
        })?;
        self.set_bpm(bpm)?;
        Ok(bpm)
    }

    pub fn looping(&self) -> bool {
        self.shared.looping.load(Ordering::Relaxed)
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    pub fn step_duration(&self) -> Duration {
        self.shared.step_duration()
    }

    /// One pass over every step at the current tempo.
    pub fn sequence_duration(&self) -> Duration {
        let steps = u32::try_from(self.steps()).unwrap_or(u32::MAX);
        self.step_duration().saturating_mul(steps)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    pub fn current_step(&self) -> Option<usize> {
        match self.shared.current_step.load(Ordering::Relaxed) {
            NO_STEP => None,
            step => Some(step),
        }
    }

    /// Start the step loop. Returns false if it was already running or
    /// could not be started.
    pub fn play(&self) -> bool {
        let finished = {
            let mut task = self.lock_task();
            if self.shared.playing.load(Ordering::Acquire) {
                return false;
            }
            // A loop that ran to completion still has a handle to reap.
            let finished = task.take();

            self.shared.playing.store(true, Ordering::Release);
            match StepTask::spawn(Arc::clone(&self.shared)) {
                Ok(spawned) => *task = Some(spawned),
                Err(e) => {
                    self.shared.playing.store(false, Ordering::Release);
                    log::error!(target: "sequencer", "failed to start step loop: {}", e);
                    return false;
                }
            }
            finished
        };

        if let Some(finished) = finished {
            finished.cancel();
        }
        log::debug!(target: "sequencer", "sequencer {} playing at {} bpm", self.id, self.bpm());
        true
    }

    /// Cancel playback immediately, silence the sink and clear highlights.
    /// Returns false if nothing was playing.
    pub fn stop(&self) -> bool {
        // The lock only covers the hand-off; joining the loop and calling
        // the observer happen without it so callbacks may re-enter.
        let (was_playing, running) = {
            let mut task = self.lock_task();
            (self.shared.playing.swap(false, Ordering::AcqRel), task.take())
        };
        if let Some(running) = running {
            running.cancel();
        }
        if !was_playing {
            return false;
        }

        self.shared.current_step.store(NO_STEP, Ordering::Relaxed);
        self.shared.sink.note_off();
        self.shared.reset_highlights();
        log::debug!(target: "sequencer", "sequencer {} stopped", self.id);
        true
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<StepTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop();
    }
}
