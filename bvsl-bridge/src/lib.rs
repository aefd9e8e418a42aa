//! Host bridge for the BetterVSL panel
//!
//! This crate handles:
//! 1. Typed commands for the `extensions.bettervsl` host extension
//! 2. The `LoggingService` seam the panel drives
//! 3. A JSON-lines channel to the host, with optional Lua rendering

pub mod channel;
pub mod command;
mod error;
pub mod service;
pub mod settings;
mod status;

pub use channel::{HostChannel, RemoteRejection};
pub use command::{Command, ConfigValue, LegacyModule, SettingKey, VssCategory};
pub use error::BridgeError;
pub use service::LoggingService;
pub use settings::{BridgeSettings, WireEncoding};
pub use status::StatusReport;
