//! Process termination: signal capture and ordered component shutdown.

mod components;
mod coordinator;
mod signals;

pub use components::ShutdownAware;
pub use coordinator::ShutdownCoordinator;
pub use signals::{ShutdownReason, SignalHandler};
