//! The single-run gate of a session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// What currently occupies the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    /// An instruction was accepted but the service has not assigned a run id yet.
    Starting,
    Active { run_id: String },
}

/// Holds at most one run for the whole session.
///
/// [`RunSlot::try_acquire`] is the only way to start a run; the returned
/// [`RunGuard`] frees the slot when dropped, whatever way the run ended.
#[derive(Debug, Clone)]
pub struct RunSlot {
    state: Arc<Mutex<SlotState>>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState::Idle)),
        }
    }

    /// Claim the slot, or `None` if a run is already in flight.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        let mut state = self.lock();
        if *state != SlotState::Idle {
            return None;
        }
        *state = SlotState::Starting;
        debug!("Run slot acquired");
        Some(RunGuard { slot: self.clone() })
    }

    pub fn state(&self) -> SlotState {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        *self.lock() != SlotState::Idle
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RunSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the holder owns the session's run slot.
#[derive(Debug)]
pub struct RunGuard {
    slot: RunSlot,
}

impl RunGuard {
    /// Record the id the service gave the run.
    pub fn attach(&self, run_id: &str) {
        *self.slot.lock() = SlotState::Active {
            run_id: run_id.to_string(),
        };
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *self.slot.lock() = SlotState::Idle;
        debug!("Run slot released");
    }
}
