use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks a set of views sharing one screen; the group is ready once every
/// registered view has settled its first load.
#[derive(Clone, Debug, Default)]
pub struct ReadyGroup {
    pending: Arc<AtomicUsize>,
}

impl ReadyGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> ReadyTicket {
        self.pending.fetch_add(1, Ordering::SeqCst);
        ReadyTicket {
            pending: Some(self.pending.clone()),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.pending() == 0
    }
}

/// Held by one view until it settles. Releasing twice is a no-op.
#[derive(Debug)]
pub struct ReadyTicket {
    pending: Option<Arc<AtomicUsize>>,
}

impl ReadyTicket {
    pub fn release(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn is_released(&self) -> bool {
        self.pending.is_none()
    }
}
