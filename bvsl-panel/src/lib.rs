//! BetterVSL panel
//!
//! Remote-control surface for the `extensions.bettervsl` telemetry logger:
//! edit the logging configuration, push it to the host, start and stop
//! capture, and follow the host's status while it records.

pub mod app;
pub mod config;
pub mod console;
pub mod poller;
pub mod status;

#[cfg(test)]
mod testing;

pub use app::{Message, Panel};
pub use config::{LoggingConfig, OutputFormat};
pub use status::{LoggingState, SessionStatus};
