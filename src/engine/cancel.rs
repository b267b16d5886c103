//! Cooperative cancellation
//!
//! A [`CancellationSignal`] is a shared flag the caller can set from another
//! task at any time. The runner polls it at every suspension point (before
//! each action, each loop iteration, each branch dispatch); execution is never
//! interrupted preemptively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the runner's next suspension point
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_shared_between_clones() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_cancelled());

        signal.cancel();
        assert!(observer.is_cancelled());
    }
}
