//! Graceful shutdown primitives.
//!
//! A [`ShutdownSignal`] is owned by a [`ServerHandle`](crate::ServerHandle)
//! and handed to its transport; triggering it makes the transport stop
//! accepting and drain. [`ConnectionTracker`] counts in-flight connections
//! so the drain knows when it is done.
//!
//! # Example
//!
//! ```rust
//! use mooring_server::ShutdownSignal;
//!
//! # tokio_test::block_on(async {
//! let shutdown = ShutdownSignal::new();
//! let waiter = shutdown.recv();
//!
//! shutdown.trigger();
//! waiter.await;
//! assert!(shutdown.is_shutdown());
//! # });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{watch, Notify};

/// One-shot stop flag shared between a handle and its transport.
///
/// Clones share state: triggering any clone releases every waiter, past
/// and future.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    flag: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Triggers the signal. Idempotent.
    pub fn trigger(&self) {
        self.flag.send_if_modified(|stopped| !std::mem::replace(stopped, true));
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.flag.borrow()
    }

    /// Returns a future that completes once the signal is triggered, or
    /// immediately if it already was.
    pub fn recv(&self) -> ShutdownReceiver {
        let mut stopped = self.flag.subscribe();
        ShutdownReceiver {
            inner: Box::pin(async move {
                // The sender lives as long as any clone of the signal, and
                // this receiver holds none, so an error also means "stop".
                let _ = stopped.wait_for(|stopped| *stopped).await;
            }),
        }
    }

    /// Creates a signal that is triggered by SIGTERM or SIGINT (Ctrl+C on
    /// non-Unix platforms).
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`ShutdownSignal::recv`].
pub struct ShutdownReceiver {
    inner: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl std::fmt::Debug for ShutdownReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownReceiver").finish_non_exhaustive()
    }
}

impl Future for ShutdownReceiver {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// Waits for SIGTERM or SIGINT.
///
/// If the handlers cannot be installed the error is logged and the future
/// never completes, leaving shutdown to the caller.
pub async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
}

/// Counts active connections so a drain can wait for them.
///
/// ```rust
/// use mooring_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token to hold for the lifetime of a connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent last drop is not missed.
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A token representing an active connection.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_idempotent_and_shared() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_shutdown());

        signal.trigger();
        signal.trigger();
        assert!(clone.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_completes_when_triggered() {
        let signal = ShutdownSignal::new();
        let waiter = signal.recv();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("recv should complete");
    }

    #[tokio::test]
    async fn test_recv_after_trigger_is_immediate() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[tokio::test]
    async fn test_recv_is_pending_until_triggered() {
        let signal = ShutdownSignal::new();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_receiver_outlives_every_signal_clone() {
        let signal = ShutdownSignal::new();
        let waiter = signal.recv();
        signal.trigger();
        drop(signal);

        tokio::time::timeout(Duration::from_millis(10), waiter)
            .await
            .expect("triggered before the signal was dropped");
    }

    #[test]
    fn test_connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        let first = tracker.acquire();
        let second = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(first);
        assert_eq!(tracker.active_connections(), 1);
        drop(second);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_immediate() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.wait_idle())
            .await
            .expect("no connections, should not wait");
    }

    #[tokio::test]
    async fn test_wait_idle_after_last_drop() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_idle().await })
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(token);
        });

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
    }
}
