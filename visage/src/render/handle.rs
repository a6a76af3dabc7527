use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle of a [`TransitionHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl TransitionStatus {
    /// Indicates if the transition reached a final status.
    pub fn is_done(&self) -> bool {
        matches!(self, TransitionStatus::Cancelled | TransitionStatus::Completed)
    }
}

/// Observes and controls a transition owned by a [`RenderTarget`](crate::render::RenderTarget).
///
/// The render side reports the end of the transition with [`complete()`](Self::complete); the core
/// awaits it through [`finished()`](Self::finished) and can pause, resume or cancel it. Clones
/// share the same transition.
///
/// # Example
/// ```
/// use visage::render::TransitionHandle;
///
/// #[visage::runtime]
/// async fn main() {
///     let handle = TransitionHandle::new();
///     handle.pause();
///     assert!(handle.is_paused());
///
///     // Cancel is idempotent and resolves the completion signal immediately.
///     handle.cancel();
///     handle.cancel();
///     handle.finished().await;
///     assert!(handle.is_cancelled());
/// }
/// ```
#[derive(Clone, Debug)]
pub struct TransitionHandle {
    status: Arc<watch::Sender<TransitionStatus>>,
}

impl Default for TransitionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionHandle {
    /// Creates the handle of a running transition.
    pub fn new() -> Self {
        let (status, _) = watch::channel(TransitionStatus::Running);
        Self {
            status: Arc::new(status),
        }
    }

    /// Creates the handle of an already completed transition (used by immediate renders).
    pub fn completed() -> Self {
        let handle = Self::new();
        handle.complete();
        handle
    }

    /// Marks the transition as done. No effect if it was cancelled before.
    pub fn complete(&self) {
        self.transit(TransitionStatus::Completed, |status| !status.is_done());
    }

    /// Suspends a running transition.
    pub fn pause(&self) {
        self.transit(TransitionStatus::Paused, |status| {
            status == TransitionStatus::Running
        });
    }

    /// Resumes a paused transition.
    pub fn resume(&self) {
        self.transit(TransitionStatus::Running, |status| {
            status == TransitionStatus::Paused
        });
    }

    /// Cancels the transition: the completion signal resolves immediately. Idempotent.
    pub fn cancel(&self) {
        self.transit(TransitionStatus::Cancelled, |status| !status.is_done());
    }

    pub fn get_status(&self) -> TransitionStatus {
        *self.status.borrow()
    }
    pub fn is_paused(&self) -> bool {
        self.get_status() == TransitionStatus::Paused
    }
    pub fn is_cancelled(&self) -> bool {
        self.get_status() == TransitionStatus::Cancelled
    }
    pub fn is_done(&self) -> bool {
        self.get_status().is_done()
    }

    /// Resolves once the transition is completed or cancelled.
    pub async fn finished(&self) {
        let mut receiver = self.status.subscribe();
        // The sender lives as long as `self`: the wait cannot fail.
        let _ = receiver.wait_for(TransitionStatus::is_done).await;
    }

    /// Resolves once the transition is not paused anymore.
    pub(crate) async fn unpaused(&self) {
        let mut receiver = self.status.subscribe();
        let _ = receiver
            .wait_for(|status| *status != TransitionStatus::Paused)
            .await;
    }

    fn transit<F>(&self, to: TransitionStatus, allowed: F)
    where
        F: Fn(TransitionStatus) -> bool,
    {
        self.status.send_if_modified(|status| match allowed(*status) {
            true => {
                *status = to;
                true
            }
            false => false,
        });
    }
}

impl Display for TransitionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransitionHandle [status={:?}]", self.get_status())
    }
}
