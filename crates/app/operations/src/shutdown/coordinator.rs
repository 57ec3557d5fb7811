//! Shutdown coordinator for multi-component shutdown orchestration.

use crate::errors::ShutdownError;
use crate::shutdown::components::ShutdownAware;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Coordinates graceful shutdown across multiple components.
///
/// Components are shut down in LIFO (last-in-first-out) order: whatever was
/// wired up last (typically the consumer-facing side) stops first, and the
/// sources it reads from stop after it.
pub struct ShutdownCoordinator {
    components: Mutex<Vec<Arc<dyn ShutdownAware>>>,
    default_timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator with the given per-component timeout.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            components: Mutex::new(Vec::new()),
            default_timeout,
        }
    }

    /// Register a component for shutdown.
    ///
    /// Components are shut down in reverse order of registration (LIFO).
    pub async fn register(&self, component: Arc<dyn ShutdownAware>) {
        let mut components = self.components.lock().await;
        tracing::debug!(component = component.name(), "registered for shutdown");
        components.push(component);
    }

    /// Shut down every registered component.
    ///
    /// A component that exceeds the timeout is abandoned and the next one is
    /// shut down; the names of abandoned components are reported in the error.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let components = {
            let mut guard = self.components.lock().await;
            std::mem::take(&mut *guard)
        };

        if components.is_empty() {
            tracing::info!("no components registered for shutdown");
            return Ok(());
        }

        tracing::info!(count = components.len(), "beginning graceful shutdown");

        let mut timed_out = Vec::new();
        for component in components.into_iter().rev() {
            let name = component.name().to_string();
            tracing::info!(component = %name, "shutting down");

            let shutdown_future = component.shutdown(self.default_timeout);
            match tokio::time::timeout(self.default_timeout, shutdown_future).await {
                Ok(()) => tracing::info!(component = %name, "shut down"),
                Err(_) => {
                    tracing::warn!(
                        component = %name,
                        timeout = ?self.default_timeout,
                        "shutdown timed out"
                    );
                    timed_out.push(name);
                }
            }
        }

        tracing::info!("graceful shutdown complete");
        if timed_out.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError::Timeout {
                components: timed_out,
                timeout: self.default_timeout,
            })
        }
    }

    /// Get the number of registered components.
    pub async fn component_count(&self) -> usize {
        self.components.lock().await.len()
    }
}
