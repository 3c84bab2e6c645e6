//! Cancellation and deadline context threaded through every store call.
//!
//! # Responsibility
//! - Let callers abort in-flight operations from another thread.
//! - Bound operations by a deadline derived from the caller's context.
//!
//! # Invariants
//! - A derived context shares its parent's cancellation flag.
//! - A derived deadline is never later than the parent's deadline.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reason a context refuses further work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The caller explicitly aborted the operation.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
        }
    }
}

impl Error for ContextError {}

/// Per-call execution context.
#[derive(Debug, Clone)]
pub struct OpContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Handle that cancels every context derived from one root.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl OpContext {
    /// Root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Root context paired with a handle able to cancel it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let ctx = Self::background();
        let handle = CancelHandle {
            cancelled: Arc::clone(&ctx.cancelled),
        };
        (ctx, handle)
    }

    /// Derives a child context that expires `timeout` from now, or earlier
    /// when the parent already expires sooner.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        self.with_deadline_opt(candidate)
    }

    /// Derives a child context with an absolute deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.with_deadline_opt(Some(deadline))
    }

    fn with_deadline_opt(&self, candidate: Option<Instant>) -> Self {
        let deadline = match (self.deadline, candidate) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, child) => parent.or(child),
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err` once the context is cancelled or past its deadline.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}
