//! Step loop - advances a sequencer one sixteenth note at a time

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::{Shared, NO_STEP};
use crate::pitch::key_to_frequency;

/// Handle to a running step loop.
///
/// The loop waits out each step on a cancel channel, so dropping the sender
/// wakes it at once from whichever thread calls [`StepTask::cancel`].
pub(crate) struct StepTask {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl StepTask {
    pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<Self> {
        let (cancel, cancelled) = bounded(1);
        let handle = thread::Builder::new()
            .name("sequencer-steps".to_string())
            .spawn(move || run(&shared, &cancelled))?;
        Ok(Self { cancel, handle })
    }

    /// Wake the loop and wait for it to exit. Called from the loop's own
    /// thread (via an observer) it only wakes it.
    pub(crate) fn cancel(self) {
        drop(self.cancel);
        if self.handle.thread().id() != thread::current().id() {
            let _ = self.handle.join();
        }
    }
}

fn run(shared: &Shared, cancelled: &Receiver<()>) {
    loop {
        let steps = shared.grid().steps();
        for step in 0..steps {
            shared.current_step.store(step, Ordering::Relaxed);

            // All note-ons for the step go out before the wait; with a
            // single frequency register the highest key is what sounds.
            let active = shared.highlight_column(step, true);
            // An observer may have stopped us while the column was lit.
            if let Err(TryRecvError::Disconnected) = cancelled.try_recv() {
                return;
            }
            for &key in &active {
                shared.sink.note_on(key_to_frequency(key));
            }
            log::trace!(target: "sequencer", "step {} ({} notes)", step, active.len());

            match cancelled.recv_timeout(shared.step_duration()) {
                Err(RecvTimeoutError::Timeout) => {}
                // Cancelled: `stop` silences the sink and resets the grid.
                _ => return,
            }

            shared.highlight_column(step, false);
            shared.sink.note_off();
        }

        if !shared.looping.load(Ordering::Relaxed) {
            break;
        }
    }

    shared.current_step.store(NO_STEP, Ordering::Relaxed);
    shared.playing.store(false, Ordering::Release);
    log::debug!(target: "sequencer", "sequence finished");
}
