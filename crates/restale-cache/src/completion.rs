//! Single-assignment completion slot
//!
//! A [`Completion`] is fulfilled exactly once; every observer that awaits
//! it receives a clone of the value. Used to guarantee that asynchronous
//! cache operations and detached requests deliver exactly one outcome,
//! even when the submitting pool rejects the work.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Notify;

struct CompletionInner<T> {
    slot: Mutex<Option<T>>,
    done: AtomicBool,
    notify: Notify,
}

/// A single-assignment result slot observable by multiple waiters
pub struct Completion<T> {
    inner: Arc<CompletionInner<T>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Completion<T> {
    /// Create an unfulfilled completion
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                slot: Mutex::new(None),
                done: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Fulfill the completion. The first write wins; returns false if the
    /// slot was already fulfilled.
    pub fn fulfill(&self, value: T) -> bool {
        {
            let mut slot = self.inner.slot.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.inner.done.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
        true
    }

    /// Whether a value has been assigned
    pub fn is_fulfilled(&self) -> bool {
        self.inner.done.load(Ordering::Acquire)
    }

    /// Value if already fulfilled, without waiting
    pub fn try_get(&self) -> Option<T> {
        if self.is_fulfilled() {
            self.inner.slot.lock().clone()
        } else {
            None
        }
    }

    /// Wait for the value. May be awaited by any number of observers.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.inner.notify.notified();
            if self.inner.done.load(Ordering::Acquire) {
                if let Some(value) = self.inner.slot.lock().clone() {
                    return value;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fulfill_then_wait() {
        let completion = Completion::new();
        assert!(completion.fulfill(7));
        assert_eq!(completion.wait().await, 7);
        assert_eq!(completion.try_get(), Some(7));
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let completion = Completion::new();
        assert!(completion.fulfill("first"));
        assert!(!completion.fulfill("second"));
        assert_eq!(completion.wait().await, "first");
    }

    #[tokio::test]
    async fn test_multiple_observers() {
        let completion: Completion<u32> = Completion::new();
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let observer = completion.clone();
            waiters.push(tokio::spawn(async move { observer.wait().await }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(completion.fulfill(42));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), 42);
        }
    }

    #[tokio::test]
    async fn test_wait_after_fulfillment() {
        let completion = Completion::new();
        completion.fulfill(1);
        // A late observer still sees the value
        let late = completion.clone();
        assert_eq!(late.wait().await, 1);
    }

    #[test]
    fn test_try_get_before_fulfillment() {
        let completion: Completion<u32> = Completion::new();
        assert!(!completion.is_fulfilled());
        assert_eq!(completion.try_get(), None);
    }
}
