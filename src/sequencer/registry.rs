//! Registry of live sequencers, for play-all / stop-all

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{CellObserver, NoteSink, Sequencer};
use crate::config::SequencerConfig;
use crate::error::Result;

type Members = Mutex<BTreeMap<u64, Weak<Sequencer>>>;

/// Owned by the application and handed to whatever needs the broadcast.
/// Sequencers join when created here and leave when dropped.
#[derive(Default)]
pub struct SequencerRegistry {
    members: Arc<Members>,
    next_id: AtomicU64,
}

/// Removes a sequencer from its registry when the sequencer drops.
pub(crate) struct Registration {
    id: u64,
    members: Weak<Members>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(members) = self.members.upgrade() {
            lock(&members).remove(&self.id);
        }
    }
}

fn lock(members: &Members) -> MutexGuard<'_, BTreeMap<u64, Weak<Sequencer>>> {
    members.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SequencerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        config: SequencerConfig,
        sink: Arc<dyn NoteSink>,
        observer: Option<Arc<dyn CellObserver>>,
    ) -> Result<Arc<Sequencer>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let registration = Registration {
            id,
            members: Arc::downgrade(&self.members),
        };
        let sequencer = Arc::new(Sequencer::build(id, config, sink, observer, Some(registration))?);
        lock(&self.members).insert(id, Arc::downgrade(&sequencer));
        log::debug!(target: "sequencer", "registered sequencer {}", id);
        Ok(sequencer)
    }

    pub fn len(&self) -> usize {
        lock(&self.members).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live members in creation order. The lock is released before the
    /// caller touches them, so dropping one here cannot deadlock.
    pub fn members(&self) -> Vec<Arc<Sequencer>> {
        let guard = lock(&self.members);
        guard.values().filter_map(Weak::upgrade).collect()
    }

    /// Returns how many sequencers started.
    pub fn play_all(&self) -> usize {
        let members = self.members();
        let started = members.iter().filter(|seq| seq.play()).count();
        log::info!(target: "sequencer", "play all: {} of {} started", started, members.len());
        started
    }

    /// Returns how many sequencers were playing.
    pub fn stop_all(&self) -> usize {
        let members = self.members();
        let stopped = members.iter().filter(|seq| seq.stop()).count();
        log::info!(target: "sequencer", "stop all: {} of {} stopped", stopped, members.len());
        stopped
    }
}
