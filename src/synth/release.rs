//! Delayed note release - the automatic `note_off` that follows a `note_on`

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::Registers;

/// Request to silence the engine at `deadline` unless another note event
/// has bumped the generation by then.
#[derive(Debug, Clone, Copy)]
pub(super) struct Release {
    pub generation: u64,
    pub deadline: Instant,
}

/// Start the release worker. It exits once every sender is dropped.
pub(super) fn spawn(registers: Arc<Registers>, generation: Arc<Mutex<u64>>) -> Sender<Release> {
    let (sender, receiver) = unbounded();

    let spawned = thread::Builder::new()
        .name("synth-release".to_string())
        .spawn(move || run(receiver, registers, generation));

    if let Err(e) = spawned {
        log::error!(target: "synth", "failed to start release worker: {}", e);
    }
    sender
}

fn run(receiver: Receiver<Release>, registers: Arc<Registers>, generation: Arc<Mutex<u64>>) {
    let mut pending: Option<Release> = None;

    loop {
        let next = match pending {
            Some(release) => receiver.recv_deadline(release.deadline),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            // Requests arrive in generation order, so the newest one wins.
            Ok(release) => pending = Some(release),
            Err(RecvTimeoutError::Timeout) => {
                if let Some(release) = pending.take() {
                    let current = generation.lock().unwrap_or_else(PoisonError::into_inner);
                    if *current == release.generation {
                        registers.frequency.store(0.0_f32.to_bits(), Ordering::Relaxed);
                        log::trace!(target: "synth", "auto release (generation {})", release.generation);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
