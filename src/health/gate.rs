//! Single-permit gate serializing access to the gateway session.
//!
//! Built on `tokio::sync::Mutex`, which queues waiters in FIFO order and
//! suspends them without spinning. The permit lives in [`GateGuard`] and is
//! returned on drop, so every exit path of the holder (return, `?`,
//! deadline, cancellation of the holder's future) releases it.
//!
//! The gate is not re-entrant: acquiring it again while holding a guard
//! deadlocks the task.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Mutual-exclusion gate around a resource.
pub struct AccessGate<T> {
    inner: Mutex<T>,
    waiting: AtomicUsize,
}

impl<T> AccessGate<T> {
    pub fn new(resource: T) -> Self {
        Self {
            inner: Mutex::new(resource),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Wait for the permit.
    pub async fn acquire(&self, operation: &'static str) -> GateGuard<'_, T> {
        let start = Instant::now();
        let queued = Waiting::enter(&self.waiting);
        let guard = self.inner.lock().await;
        drop(queued);

        debug!(
            operation,
            waited_ms = start.elapsed().as_millis() as u64,
            "Access gate acquired"
        );

        GateGuard {
            guard,
            operation,
            acquired: Instant::now(),
        }
    }

    /// Number of tasks currently queued for the permit.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }
}

/// Decrements the queue count on drop, including when a waiter is cancelled.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Held permit; dereferences to the guarded resource.
pub struct GateGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    operation: &'static str,
    acquired: Instant,
}

impl<T> Deref for GateGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for GateGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> fmt::Debug for GateGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateGuard")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for GateGuard<'_, T> {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            held_ms = self.acquired.elapsed().as_millis() as u64,
            "Access gate released"
        );
    }
}
