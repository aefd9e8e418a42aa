//! The seam between the panel and whatever talks to the host.

use async_trait::async_trait;

use crate::command::{Command, ConfigValue, SettingKey};
use crate::{BridgeError, StatusReport};

/// Remote logging service exposed by the host extension.
///
/// Everything except [`query_status`](LoggingService::query_status) is
/// fire-and-forget: `Ok` means the command was handed to the channel, not
/// that the host applied it.
#[async_trait]
pub trait LoggingService: Send + Sync {
    /// Dispatch a command without waiting for the host.
    fn send(&self, command: Command) -> Result<(), BridgeError>;

    /// Ask the host for the current capture status.
    async fn query_status(&self) -> Result<StatusReport, BridgeError>;

    fn set_config(&self, key: SettingKey, value: ConfigValue) -> Result<(), BridgeError> {
        self.send(Command::SetConfig { key, value })
    }

    fn begin_capture(&self) -> Result<(), BridgeError> {
        self.send(Command::BeginCapture)
    }

    fn end_capture(&self) -> Result<(), BridgeError> {
        self.send(Command::EndCapture)
    }

    fn export_config(&self, filename: &str) -> Result<(), BridgeError> {
        self.send(Command::ExportConfig {
            filename: filename.to_string(),
        })
    }

    fn import_config(&self, filename: &str) -> Result<(), BridgeError> {
        self.send(Command::ImportConfig {
            filename: filename.to_string(),
        })
    }

    fn reveal_output_location(&self) -> Result<(), BridgeError> {
        self.send(Command::RevealOutputLocation)
    }
}
