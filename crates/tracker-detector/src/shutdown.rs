// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Shutdown coordination
//!
//! One monotonic flag shared by the interrupt handler, the console, the
//! worker and the coordinating thread. Once triggered it never resets.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Default)]
struct ShutdownState {
    triggered: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

/// Cloneable handle to the process-wide shutdown flag
#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<ShutdownState>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    ///
    /// Returns `true` only for the call that flipped the flag.
    pub fn trigger(&self) -> bool {
        let first = !self.inner.triggered.swap(true, Ordering::SeqCst);
        if first {
            // Taking the lock orders the flag store before any waiter's check
            let _guard = self.inner.lock.lock();
            self.inner.condvar.notify_all();
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Block until shutdown is requested or `timeout` elapses
    ///
    /// Returns whether shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.inner.lock.lock();
        self.inner
            .condvar
            .wait_while_for(&mut guard, |_| !self.is_triggered(), timeout);
        self.is_triggered()
    }

    /// Block until shutdown is requested
    pub fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        self.inner
            .condvar
            .wait_while(&mut guard, |_| !self.is_triggered());
    }
}

impl std::fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

/// Trigger `token` on Ctrl-C (SIGINT)
///
/// # Errors
///
/// Fails if a handler is already installed for this process.
pub fn install_interrupt_handler(token: ShutdownToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if token.trigger() {
            info!("[SHUTDOWN] Interrupt received, shutting down...");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_trigger_is_monotonic() {
        let token = ShutdownToken::new();
        assert!(!token.is_triggered());

        assert!(token.trigger());
        assert!(token.is_triggered());

        // Later triggers report that they did not flip the flag
        assert!(!token.trigger());
        assert!(token.is_triggered());
    }

    #[test]
    fn test_clones_share_flag() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        clone.trigger();
        assert!(token.is_triggered());
    }

    #[test]
    fn test_only_one_concurrent_trigger_wins() {
        let token = ShutdownToken::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || token.trigger())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let token = ShutdownToken::new();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_trigger() {
        let token = ShutdownToken::new();
        let trigger = token.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        assert!(token.wait_timeout(Duration::from_secs(5)));
        token.wait();
        handle.join().unwrap();
    }
}
