use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tracks which batch is the current one. Starting a batch or invalidating
/// the current one cancels whatever was running before.
#[derive(Debug, Default)]
pub struct BatchGeneration {
    current: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

impl BatchGeneration {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn begin(self: &Arc<Self>) -> BatchTicket {
        let token = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.cancel.lock(), token.clone());
        previous.cancel();

        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting batch generation {}", generation);

        BatchTicket {
            generation,
            tracker: Arc::clone(self),
            cancel: token,
        }
    }

    /// Discard the running batch, if any.
    pub fn invalidate(&self) {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel.lock().cancel();
        debug!("Invalidated batches before generation {}", generation);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Held by a running batch; lets it stop early and tells it whether its
/// results may still be committed.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    generation: u64,
    tracker: Arc<BatchGeneration>,
    cancel: CancellationToken,
}

impl BatchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.tracker.current() == self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
