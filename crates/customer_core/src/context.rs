//! Deadline and cancellation carrier for repository calls.
//!
//! # Responsibility
//! - Bound how long a single repository call may block on storage.
//! - Let another thread abandon an in-flight call cooperatively.
//!
//! # Invariants
//! - Clones share one cancellation flag; cancelling any clone cancels all.
//! - A context never becomes "live" again once done.

use std::panic::RefUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDone {
    Cancelled,
    DeadlineExceeded,
}

/// Per-call context passed to every repository operation.
#[derive(Debug, Clone)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// Context without deadline that is only done when cancelled.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// Context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().child_with_deadline(deadline)
    }

    /// Derives a context sharing this one's cancellation, with the earlier
    /// of the two deadlines.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        self.child_with_deadline(deadline)
    }

    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns why the context is done, if it is.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn done(&self) -> Option<ContextDone> {
        if self.is_cancelled() {
            return Some(ContextDone::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextDone::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Ok(())` while the context is live.
    pub fn check(&self) -> Result<(), ContextDone> {
        match self.done() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Clamps `limit` to the remaining time, rounded up past the deadline so
    /// a wait that uses the whole budget observes the context as done.
    pub(crate) fn bounded(&self, limit: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) if remaining < limit => remaining + Duration::from_millis(1),
            _ => limit,
        }
    }

    pub(crate) fn watcher(&self) -> impl FnMut() -> bool + Send + RefUnwindSafe + 'static {
        let deadline = self.deadline;
        let cancelled = Arc::clone(&self.cancelled);
        move || {
            cancelled.load(Ordering::SeqCst)
                || deadline.is_some_and(|deadline| Instant::now() >= deadline)
        }
    }
}

fn far_future() -> Instant {
    // ~30 years; only reached when `now + timeout` overflows.
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::{ContextDone, OpContext};
    use std::time::{Duration, Instant};

    #[test]
    fn background_context_is_live() {
        let ctx = OpContext::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancel_is_shared_across_clones() {
        let ctx = OpContext::background();
        let clone = ctx.clone();
        clone.cancel();
        assert_eq!(ctx.check(), Err(ContextDone::Cancelled));
    }

    #[test]
    fn expired_deadline_is_reported() {
        let ctx = OpContext::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.done(), Some(ContextDone::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cancellation_wins_over_expired_deadline() {
        let ctx = OpContext::with_timeout(Duration::ZERO);
        ctx.cancel();
        assert_eq!(ctx.done(), Some(ContextDone::Cancelled));
    }

    #[test]
    fn child_keeps_earlier_deadline() {
        let parent = OpContext::with_timeout(Duration::from_millis(50));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.child_with_timeout(Duration::ZERO);
        assert!(tighter.deadline() < parent.deadline());
    }

    #[test]
    fn bounded_clamps_to_remaining_time() {
        let ctx = OpContext::with_timeout(Duration::from_millis(10));
        assert!(ctx.bounded(Duration::from_secs(5)) <= Duration::from_millis(11));
        assert_eq!(
            OpContext::background().bounded(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn watcher_fires_after_cancel() {
        let ctx = OpContext::background();
        let mut watcher = ctx.watcher();
        assert!(!watcher());
        ctx.cancel();
        assert!(watcher());
    }
}
