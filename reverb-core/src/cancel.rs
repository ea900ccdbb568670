//! Cooperative cancellation.
//!
//! Every executor observes a [`CancelToken`]. Cancelling synchronously marks
//! the token, wakes every registered waker, and is idempotent; the woken
//! executor drops its in-flight transport future and any pending timer
//! (dropping a future aborts it) and settles with a cancellation error if
//! nothing else settled first. Because a future returns `Ready` at most
//! once, settle-once holds by construction: whichever outcome reaches the
//! final `poll` first wins, and cancellation can never re-settle an
//! already-settled operation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

/// A cloneable handle used to request cancellation of one logical operation.
///
/// All clones observe the same flag. Dropping tokens does not cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Requests cancellation and wakes every registered waiter.
    ///
    /// Idempotent: later calls are no-ops.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            let wakers = std::mem::take(&mut *self.lock_wakers());
            for waker in wakers {
                waker.wake();
            }
        }
    }

    /// Registers interest in cancellation and reports the current state.
    ///
    /// Executors call this at the top of every `poll`: a `true` return means
    /// "already cancelled, settle now"; on `false` the waker is retained and
    /// will be woken by [`CancelToken::cancel`]. The state is re-checked
    /// after registration so a concurrent cancel is never missed.
    pub fn register(&self, waker: &Waker) -> bool {
        if self.is_cancelled() {
            return true;
        }
        {
            let mut wakers = self.lock_wakers();
            if !wakers.iter().any(|existing| existing.will_wake(waker)) {
                wakers.push(waker.clone());
            }
        }
        self.is_cancelled()
    }

    /// A future that completes once cancellation is requested.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { token: self }
    }

    fn lock_wakers(&self) -> MutexGuard<'_, Vec<Waker>> {
        // A poisoned waker list is still a valid waker list.
        self.inner
            .wakers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Future returned by [`CancelToken::cancelled`].
#[derive(Debug)]
pub struct Cancelled<'a> {
    token: &'a CancelToken,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.register(cx.waker()) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_completes_on_cancel() {
        let token = CancelToken::new();
        let background = token.clone();
        let waiter = tokio::spawn(async move { background.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        waiter.await.expect("waiter task");
    }

    #[tokio::test]
    async fn cancelled_future_is_immediate_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
