use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The "a turn is in flight" flag.
///
/// Cloning shares the flag, so the shell can grey out its input while the
/// orchestrator works.
#[derive(Debug, Clone, Default)]
pub struct ProcessingFlag {
    busy: Arc<AtomicBool>,
}

impl ProcessingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Sets the flag, or returns `None` when it is already set.
    ///
    /// The flag is cleared when the guard drops, on every exit path.
    pub fn try_acquire(&self) -> Option<ProcessingGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ProcessingGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Clears the processing flag on drop.
#[derive(Debug)]
pub struct ProcessingGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_sets_and_clears() {
        let flag = ProcessingFlag::new();
        assert!(!flag.is_set());
        {
            let _guard = flag.try_acquire().unwrap();
            assert!(flag.is_set());
            assert!(flag.try_acquire().is_none());
        }
        assert!(!flag.is_set());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = ProcessingFlag::new();
        let shell_view = flag.clone();
        let _guard = flag.try_acquire().unwrap();
        assert!(shell_view.is_set());
    }
}
