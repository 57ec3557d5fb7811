//! The contract between the coordinator and the things it stops.

use async_trait::async_trait;
use std::time::Duration;

/// A long-lived component that must be stopped before the process exits.
///
/// Register implementations with the `ShutdownCoordinator`; they are stopped
/// in reverse registration order once a termination signal arrives.
#[async_trait]
pub trait ShutdownAware: Send + Sync {
    /// Name used in shutdown logs and timeout reports.
    fn name(&self) -> &str;

    /// Stop accepting work, finish what is in flight and release resources.
    ///
    /// The coordinator abandons the component once `timeout` has passed.
    async fn shutdown(&self, timeout: Duration);
}
