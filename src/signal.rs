//! Cancellation signals for in-flight runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation signal observed by a running turn.
///
/// The launcher polls this at three checkpoints: before spawning the child,
/// after the prompt has been written, and before yielding each stdout line.
/// Once it reports aborted the child is killed and the run fails with an
/// abort error.
pub trait AbortSignal: Send + Sync {
    /// Returns `true` once the run should be cancelled.
    fn is_aborted(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn is_aborted(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// A cloneable, thread-safe abort flag.
///
/// Clones share the same underlying state, so one clone can be handed to
/// [`TurnOptions`](crate::TurnOptions) while another is kept to trigger the
/// abort from a different thread. Both legacy signal spellings are provided:
/// [`CancelFlag::aborted`] and [`CancelFlag::is_set`] answer the same query.
#[derive(Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a new, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if cancellation has been requested.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Alias for [`CancelFlag::aborted`].
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.aborted()
    }
}

impl AbortSignal for CancelFlag {
    fn is_aborted(&self) -> bool {
        self.aborted()
    }
}

impl fmt::Debug for CancelFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelFlag")
            .field("aborted", &self.aborted())
            .finish()
    }
}

/// Returns `true` if the optional signal reports aborted.
pub(crate) fn is_signal_aborted(signal: Option<&Arc<dyn AbortSignal>>) -> bool {
    signal.is_some_and(|s| s.is_aborted())
}
