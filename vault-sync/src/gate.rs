//! Single-active-sync gate.
//!
//! At most one story may run against a repository at a time. The gate is
//! acquired before the first step and released when the guard drops, which
//! also covers early returns and panics inside a story.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag marking a running sync. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct SyncGate {
    active: Arc<AtomicBool>,
}

impl SyncGate {
    /// Create an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate, or `None` if a sync is already running.
    pub fn try_acquire(&self) -> Option<SyncGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard {
                active: Arc::clone(&self.active),
            })
    }

    /// Whether a sync is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop.
#[derive(Debug)]
pub struct SyncGuard {
    active: Arc<AtomicBool>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
