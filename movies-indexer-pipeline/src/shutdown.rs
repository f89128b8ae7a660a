//! Shutdown signalling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Sending side of the shutdown signal.
///
/// The request is sticky: listeners subscribed after [`ShutdownHandle::signal`]
/// still observe it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request shutdown of every current and future listener.
    pub fn signal(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // No listener yet is fine: the flag is checked on subscribe.
        let _ = self.notify.send(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            is_shutdown: false,
            requested: Arc::clone(&self.requested),
            notify: self.notify.subscribe(),
        }
    }
}

/// Listens for the shutdown signal.
///
/// Once a signal is observed the listener stays shut down. A closed channel is
/// not a signal: a pipeline whose orchestrator went away keeps running until
/// its work is done.
#[derive(Debug)]
pub struct Shutdown {
    is_shutdown: bool,
    requested: Arc<AtomicBool>,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Check for a pending signal without waiting.
    pub fn is_shutdown(&mut self) -> bool {
        if !self.is_shutdown {
            if self.requested.load(Ordering::SeqCst) {
                self.is_shutdown = true;
            } else {
                match self.notify.try_recv() {
                    Ok(()) | Err(TryRecvError::Lagged(_)) => self.is_shutdown = true,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
                }
            }
        }
        self.is_shutdown
    }

    /// Wait until the shutdown signal is received.
    pub async fn recv(&mut self) {
        if self.is_shutdown() {
            return;
        }

        match self.notify.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => self.is_shutdown = true,
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_is_sticky() {
        let handle = ShutdownHandle::new();
        let mut shutdown = handle.subscribe();

        assert!(!shutdown.is_shutdown());
        handle.signal();
        assert!(shutdown.is_shutdown());
        assert!(shutdown.is_shutdown());

        // Already shut down: returns immediately.
        shutdown.recv().await;
    }

    #[tokio::test]
    async fn test_signal_before_subscribe_is_observed() {
        let handle = ShutdownHandle::new();
        handle.signal();

        let mut shutdown = handle.subscribe();

        assert!(handle.is_requested());
        assert!(shutdown.is_shutdown());
        shutdown.recv().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_wakes_waiting_listener() {
        let handle = ShutdownHandle::new();
        let mut shutdown = handle.subscribe();

        let signaller = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            signaller.signal();
        });

        let waited = tokio::time::timeout(Duration::from_secs(1), shutdown.recv()).await;
        assert!(waited.is_ok());
        assert!(shutdown.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_is_not_a_signal() {
        let handle = ShutdownHandle::new();
        let mut shutdown = handle.subscribe();
        drop(handle);

        assert!(!shutdown.is_shutdown());
        let waited = tokio::time::timeout(Duration::from_secs(1), shutdown.recv()).await;
        assert!(waited.is_err());
    }
}
