//! Inbound commands to the application service.
//!
//! Requests from outside the session loop (host tooling, a debug console)
//! that the [`AppService`](super::service::AppService) interprets.

use crate::config::SystemConfig;

#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start a session as if a serial trigger had arrived.
    Trigger,

    /// Replace the configuration.  Only accepted between sessions.
    UpdateConfig(SystemConfig),
}
