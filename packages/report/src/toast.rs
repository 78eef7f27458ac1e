//! Auto-dismissing status notifications.
//!
//! Every toast gets its own expiry timer. Dismissing a toast early aborts
//! that timer. Toasts are kept in insertion order so a host can render
//! them as a stack.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use strikenet_report_models::{Toast, ToastId, ToastKind};
use tokio::task::JoinHandle;

/// How long a toast stays visible unless dismissed.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4000);

struct ToastEntry {
    toast: Toast,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct ToastState {
    next_id: u64,
    entries: Vec<ToastEntry>,
}

/// An insertion-ordered queue of toasts.
///
/// Cloning shares the queue. [`ToastQueue::push`] must be called from
/// within a tokio runtime because it spawns the expiry timer.
#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<ToastState>>,
    duration: Duration,
}

impl ToastQueue {
    /// Creates a queue whose toasts expire after `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            duration,
        }
    }

    /// Lifetime of each toast.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Adds a toast and starts its timer.
    pub fn push(&self, kind: ToastKind, message: impl Into<String>) -> ToastId {
        let message = message.into();
        let mut state = self.lock();
        state.next_id += 1;
        let id = ToastId(state.next_id);
        log::debug!("Showing {kind} {id}: {message}");

        let weak = Arc::downgrade(&self.state);
        let duration = self.duration;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            expire(&weak, id);
        });

        state.entries.push(ToastEntry {
            toast: Toast { id, kind, message },
            expiry: Some(expiry),
        });
        id
    }

    /// Adds a success toast.
    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.push(ToastKind::Success, message)
    }

    /// Adds an error toast.
    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.push(ToastKind::Error, message)
    }

    /// Removes a toast before its timer fires. Returns `false` if it was
    /// already gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut state = self.lock();
        let Some(index) = state.entries.iter().position(|e| e.toast.id == id) else {
            return false;
        };
        let entry = state.entries.remove(index);
        if let Some(expiry) = entry.expiry {
            expiry.abort();
        }
        log::debug!("Dismissed {id}");
        true
    }

    /// The visible toasts, oldest first.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().entries.iter().map(|e| e.toast.clone()).collect()
    }

    /// Number of visible toasts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no toasts are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, ToastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl Drop for ToastState {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            if let Some(expiry) = entry.expiry.take() {
                expiry.abort();
            }
        }
    }
}

fn expire(state: &Weak<Mutex<ToastState>>, id: ToastId) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(index) = state.entries.iter().position(|e| e.toast.id == id) {
        state.entries.remove(index);
        log::debug!("Expired {id}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn toast_expires_after_duration() {
        let queue = ToastQueue::default();
        queue.success("Report submitted!");

        advance(3999).await;
        assert_eq!(queue.len(), 1);

        advance(2).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toasts_keep_insertion_order_and_expire_independently() {
        let queue = ToastQueue::default();
        let first = queue.error("first");
        advance(1000).await;
        let second = queue.success("second");
        let third = queue.error("third");

        let ids: Vec<ToastId> = queue.toasts().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, second, third]);

        advance(3001).await;
        let remaining = queue.toasts();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].message, "second");
        assert_eq!(remaining[0].kind, ToastKind::Success);
        assert_eq!(remaining[1].message, "third");

        advance(1000).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_early() {
        let queue = ToastQueue::default();
        let a = queue.error("a");
        let b = queue.error("b");

        assert!(queue.dismiss(a));
        assert!(!queue.dismiss(a));
        assert_eq!(queue.toasts().len(), 1);
        assert_eq!(queue.toasts()[0].id, b);

        advance(4001).await;
        assert!(queue.is_empty());
        assert!(!queue.dismiss(b));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_duration() {
        let queue = ToastQueue::new(Duration::from_millis(100));
        queue.error("quick");
        advance(101).await;
        assert!(queue.is_empty());
    }
}
