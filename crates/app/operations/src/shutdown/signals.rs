//! Termination signal capture.

use tokio::sync::watch;

/// What asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name.
    Signal(&'static str),
    /// [`SignalHandler::trigger`] was called.
    Requested,
}

/// Turns SIGTERM/SIGINT into a shutdown request observable through a
/// `watch` channel. The first request wins; later ones are ignored.
pub struct SignalHandler {
    reason_tx: watch::Sender<Option<ShutdownReason>>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (reason_tx, _) = watch::channel(None);
        Self { reason_tx }
    }

    /// Receiver that changes once, when shutdown is requested.
    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.reason_tx.subscribe()
    }

    /// Spawn the task that waits for SIGTERM or SIGINT.
    pub fn start(&self) {
        let tx = self.reason_tx.clone();

        tokio::spawn(async move {
            match wait_for_signal().await {
                Ok(signal) => {
                    tracing::info!(signal, "received shutdown signal");
                    request(&tx, ShutdownReason::Signal(signal));
                }
                Err(err) => {
                    tracing::error!(error = %err, "cannot listen for shutdown signals");
                }
            }
        });
    }

    /// Request shutdown without a signal.
    pub fn trigger(&self) {
        request(&self.reason_tx, ShutdownReason::Requested);
    }

    /// The reason shutdown was requested, if it has been.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.reason_tx.borrow()
    }

    /// Resolve with the reason once shutdown has been requested.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                return ShutdownReason::Requested;
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn request(tx: &watch::Sender<Option<ShutdownReason>>, reason: ShutdownReason) {
    tx.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(reason);
        true
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_notifies_every_subscriber() {
        let handler = SignalHandler::new();
        let mut first = handler.subscribe();
        let mut second = handler.subscribe();
        assert_eq!(handler.reason(), None);

        handler.trigger();

        first.changed().await.unwrap();
        second.changed().await.unwrap();
        assert_eq!(*first.borrow(), Some(ShutdownReason::Requested));
        assert_eq!(*second.borrow(), Some(ShutdownReason::Requested));
    }

    #[tokio::test]
    async fn test_first_request_wins() {
        let handler = SignalHandler::new();
        request(&handler.reason_tx, ShutdownReason::Signal("SIGTERM"));
        handler.trigger();

        assert_eq!(handler.reason(), Some(ShutdownReason::Signal("SIGTERM")));
    }

    #[tokio::test]
    async fn test_wait_returns_reason() {
        let handler = SignalHandler::new();

        let waiting = tokio::time::timeout(Duration::from_millis(20), handler.wait()).await;
        assert!(waiting.is_err());

        handler.trigger();
        let reason = tokio::time::timeout(Duration::from_secs(1), handler.wait())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::Requested);
    }
}
