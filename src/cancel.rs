//! Cancellation handle threaded through every goal, propagator, and
//! search loop. Polled at coarse granularity: top of the fixed-point
//! loop, top of each stream force, top of the worker loop, each tabling
//! answer read (spec §5).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Inner {
    flag: AtomicBool,
    deadline: Option<Instant>,
}

/// A cheaply-clonable cancellation handle. Cancelling any clone cancels
/// all of them.
#[derive(Debug, Clone)]
pub struct CancellationToken(Arc<Inner>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken(Arc::new(Inner {
            flag: AtomicBool::new(false),
            deadline: None,
        }))
    }

    pub fn with_deadline(timeout: Duration) -> CancellationToken {
        CancellationToken(Arc::new(Inner {
            flag: AtomicBool::new(false),
            deadline: Some(Instant::now() + timeout),
        }))
    }

    pub fn cancel(&self) {
        self.0.flag.store(true, Ordering::SeqCst);
    }

    /// True if explicitly cancelled or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        if self.0.flag.load(Ordering::SeqCst) {
            return true;
        }
        match self.0.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        CancellationToken::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cancel_is_observed_across_clones() {
        let a = CancellationToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn deadline_in_the_past_is_immediately_cancelled() {
        let t = CancellationToken::with_deadline(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(t.is_cancelled());
    }
}
