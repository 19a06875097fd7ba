//! Completion barrier between redraw batches and flushes.
//!
//! A counter of batches in flight. Each batch holds a `BarrierGuard` for its
//! whole duration; the guard decrements on drop, so a batch that errors or
//! panics still releases the barrier. `wait_idle` resolves once the counter
//! reads zero.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CompletionBarrier {
    count: Arc<watch::Sender<usize>>,
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self {
            count: Arc::new(watch::Sender::new(0)),
        }
    }

    /// Register one batch in flight until the returned guard drops.
    #[must_use = "the batch leaves the barrier as soon as the guard drops"]
    pub fn enter(&self) -> BarrierGuard {
        self.count.send_modify(|n| *n += 1);
        BarrierGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.count.borrow()
    }

    pub async fn wait_idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender is owned by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[derive(Debug)]
pub struct BarrierGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}
