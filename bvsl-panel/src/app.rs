//! Settings-sync controller
//!
//! Owns the form state, pushes it to the host as typed commands, and runs
//! the status poll while logging. All mutation goes through [`Panel::update`]
//! or the action methods; there is no implicit binding.

use std::sync::Arc;

use bvsl_bridge::{BridgeError, LegacyModule, LoggingService, StatusReport, VssCategory};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{LoggingConfig, OutputFormat};
use crate::poller::{StatusPoller, POLL_PERIOD};
use crate::status::{LoggingState, SessionStatus};

/// File read by the host on import. Not user-selectable.
pub const DEFAULT_IMPORT_FILE: &str = "vss_config.json";

/// Panel messages
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Form edits
    UpdatePeriodChanged(f64),
    OutputFormatChanged(OutputFormat),
    VssVersionChanged(String),
    CategoryToggled(VssCategory, bool),
    ModuleToggled(LegacyModule, bool),
    ShowAdvancedToggled(bool),
    IncludeTimestampToggled(bool),
    IncludeMetadataToggled(bool),
    CompressOutputToggled(bool),
    BufferSizeChanged(u32),

    // Actions
    ApplySettings,
    StartLogging,
    StopLogging,
    ExportSettings,
    ImportSettings,
    OpenOutputFolder,

    // Host events
    StatusReceived {
        session: u64,
        result: Result<StatusReport, String>,
    },
    RemoteRejected(String),
}

/// Remote-control surface over the host logging extension.
pub struct Panel {
    /// Remote logging service on the host
    service: Arc<dyn LoggingService>,
    /// Form state pushed on apply/start
    config: LoggingConfig,
    /// Idle or logging
    state: LoggingState,
    /// Last accepted status snapshot
    status: SessionStatus,
    /// Bumped on every successful start; poll replies carry the value they were issued under.
    session: u64,
    /// Poll timer, present only while logging
    poller: Option<StatusPoller>,
    /// Handed to the poller for status replies
    events_tx: mpsc::UnboundedSender<Message>,
    /// Status replies waiting to be applied
    events_rx: mpsc::UnboundedReceiver<Message>,
    /// Last failure, shown until the next successful action.
    last_error: Option<String>,
}

impl Panel {
    pub fn new(service: Arc<dyn LoggingService>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            service,
            config: LoggingConfig::default(),
            state: LoggingState::Idle,
            status: SessionStatus::default(),
            session: 0,
            poller: None,
            events_tx,
            events_rx,
            last_error: None,
        }
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn state(&self) -> LoggingState {
        self.state
    }

    pub fn is_logging(&self) -> bool {
        self.state.is_active()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Whether a poll timer is currently scheduled.
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Wait for the next event produced by the poller.
    pub async fn next_event(&mut self) -> Option<Message> {
        self.events_rx.recv().await
    }

    /// Apply every event that is already queued. Returns how many were handled.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.events_rx.try_recv() {
            self.update(message);
            handled += 1;
        }
        handled
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::UpdatePeriodChanged(seconds) => self.config.update_period = seconds,
            Message::OutputFormatChanged(format) => self.config.output_format = format,
            Message::VssVersionChanged(version) => self.config.vss_version = version,
            Message::CategoryToggled(category, enabled) => {
                self.config.categories.set(category, enabled)
            }
            Message::ModuleToggled(module, enabled) => self.config.modules.set(module, enabled),
            Message::ShowAdvancedToggled(show) => self.config.show_advanced = show,
            Message::IncludeTimestampToggled(on) => self.config.include_timestamp = on,
            Message::IncludeMetadataToggled(on) => self.config.include_metadata = on,
            Message::CompressOutputToggled(on) => self.config.compress_output = on,
            Message::BufferSizeChanged(size) => self.config.buffer_size = size,

            Message::ApplySettings => {
                let result = self.apply_settings();
                self.record("Applying settings", result);
            }
            Message::StartLogging => {
                let result = self.start_logging();
                self.record("Starting logging", result);
            }
            Message::StopLogging => {
                let result = self.stop_logging();
                self.record("Stopping logging", result);
            }
            Message::ExportSettings => {
                let result = self.export_settings().map(|_| ());
                self.record("Exporting settings", result);
            }
            Message::ImportSettings => {
                let result = self.import_settings();
                self.record("Importing settings", result);
            }
            Message::OpenOutputFolder => {
                let result = self.open_output_folder();
                self.record("Opening output folder", result);
            }

            Message::StatusReceived { session, result } => self.apply_status(session, result),
            Message::RemoteRejected(message) => {
                warn!("Host rejected a command: {}", message);
                self.last_error = Some(format!("Host rejected a command: {}", message));
            }
        }
    }

    /// Push every field of the current configuration to the host.
    pub fn apply_settings(&self) -> Result<(), BridgeError> {
        let commands = self.config.commands();
        debug!(
            "Applying {} settings for format {}",
            commands.len(),
            self.config.output_format
        );
        for command in commands {
            self.service.send(command)?;
        }
        Ok(())
    }

    /// Apply settings, begin capture, and start polling status.
    ///
    /// Calling this while already logging replaces the poll timer, so there is
    /// never more than one.
    pub fn start_logging(&mut self) -> Result<(), BridgeError> {
        self.apply_settings()?;
        self.service.begin_capture()?;

        if let Some(previous) = self.poller.take() {
            previous.cancel();
        }

        self.state = LoggingState::Active;
        self.status.reset_counters();
        self.session += 1;
        self.poller = Some(StatusPoller::spawn(
            Arc::clone(&self.service),
            self.session,
            POLL_PERIOD,
            self.events_tx.clone(),
        ));

        info!(session = self.session, "Logging started");
        Ok(())
    }

    /// Stop polling and end capture. Safe to call when not logging.
    pub fn stop_logging(&mut self) -> Result<(), BridgeError> {
        let was_logging = self.state.is_active();
        self.state = LoggingState::Idle;
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }

        self.service.end_capture()?;
        if was_logging {
            info!(session = self.session, "Logging stopped");
        }
        Ok(())
    }

    /// Ask the host to write its configuration to a timestamped file.
    pub fn export_settings(&self) -> Result<String, BridgeError> {
        self.export_settings_at(Utc::now())
    }

    pub fn export_settings_at(&self, at: DateTime<Utc>) -> Result<String, BridgeError> {
        let filename = export_filename(at);
        self.service.export_config(&filename)?;
        info!("Exporting settings to {}", filename);
        Ok(filename)
    }

    pub fn import_settings(&self) -> Result<(), BridgeError> {
        self.service.import_config(DEFAULT_IMPORT_FILE)?;
        info!("Importing settings from {}", DEFAULT_IMPORT_FILE);
        Ok(())
    }

    pub fn open_output_folder(&self) -> Result<(), BridgeError> {
        self.service.reveal_output_location()
    }

    /// Tear the panel down, cancelling any poll timer.
    pub fn dispose(self) {
        drop(self);
    }

    fn apply_status(&mut self, session: u64, result: Result<StatusReport, String>) {
        if !self.state.is_active() || session != self.session {
            debug!(
                session,
                current = self.session,
                "Dropping status reply from an ended session"
            );
            return;
        }

        match result {
            Ok(report) => self.status.apply(&report),
            Err(e) => debug!("Status query failed, keeping previous status: {}", e),
        }
    }

    fn record(&mut self, action: &str, result: Result<(), BridgeError>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                error!("{} failed: {}", action, e);
                self.last_error = Some(format!("{} failed: {}", action, e));
            }
        }
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }
}

/// `vss_config_<UTC date and time to the second>.json`, colons replaced so the
/// name is valid on every filesystem.
pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("vss_config_{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingService;
    use bvsl_bridge::{Command, ConfigValue, SettingKey};
    use chrono::{TimeDelta, TimeZone};
    use std::time::Duration;
    use tokio::time::sleep;

    fn panel() -> (Panel, Arc<RecordingService>) {
        let service = Arc::new(RecordingService::default());
        let panel = Panel::new(service.clone());
        (panel, service)
    }

    fn report(time: f64, samples: u64) -> StatusReport {
        StatusReport {
            time,
            samples,
            filename: "session.jsonl".to_string(),
        }
    }

    fn set_keys(commands: &[Command]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::SetConfig { key, .. } => Some(key.path()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn legacy_wheels_off_is_sent_without_categories() {
        let (mut panel, service) = panel();
        panel.update(Message::OutputFormatChanged(OutputFormat::Legacy));
        panel.update(Message::ModuleToggled(LegacyModule::Wheels, false));

        panel.apply_settings().unwrap();

        let commands = service.commands();
        assert!(commands.contains(&Command::SetConfig {
            key: SettingKey::Module(LegacyModule::Wheels),
            value: ConfigValue::Bool(false),
        }));
        let keys = set_keys(&commands);
        assert_eq!(keys.len(), 12);
        assert!(!keys.iter().any(|k| k.starts_with("useCategory.")));
        assert!(!panel.is_logging());
    }

    #[test]
    fn edits_reach_the_config() {
        let (mut panel, _) = panel();
        panel.update(Message::UpdatePeriodChanged(0.1));
        panel.update(Message::VssVersionChanged("5.0".to_string()));
        panel.update(Message::CategoryToggled(VssCategory::Obd, true));
        panel.update(Message::ShowAdvancedToggled(true));
        panel.update(Message::CompressOutputToggled(true));
        panel.update(Message::BufferSizeChanged(2048));

        let config = panel.config();
        assert_eq!(config.update_period, 0.1);
        assert_eq!(config.vss_version, "5.0");
        assert!(config.categories.obd);
        assert!(config.show_advanced);
        assert!(config.compress_output);
        assert_eq!(config.buffer_size, 2048);
    }

    #[tokio::test(start_paused = true)]
    async fn start_applies_then_begins_capture() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();

        let commands = service.commands();
        let keys = set_keys(&commands);
        assert_eq!(keys.len(), 12);
        assert!(keys.contains(&"useModule.General".to_string()));
        assert_eq!(commands.last(), Some(&Command::BeginCapture));
        assert!(panel.is_logging());
        assert!(panel.is_polling());
        assert_eq!(panel.status().samples_collected, 0);
        assert_eq!(panel.status().logging_time, "0.00");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_half_second() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();

        sleep(Duration::from_millis(400)).await;
        assert_eq!(service.status_queries(), 0);
        sleep(Duration::from_millis(700)).await;
        assert_eq!(service.status_queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_runtime_resumes_with_one_query() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();

        // Three periods pass without the timer task getting to run.
        tokio::time::advance(Duration::from_millis(1600)).await;
        sleep(Duration::from_millis(1)).await;
        assert_eq!(service.status_queries(), 1);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(service.status_queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_keeps_a_single_timer() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();
        panel.start_logging().unwrap();
        assert!(panel.is_polling());

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(service.status_queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reply_updates_display() {
        let (mut panel, service) = panel();
        service.set_report(Some(report(12.3, 123)));
        panel.start_logging().unwrap();

        sleep(Duration::from_millis(600)).await;
        assert_eq!(panel.drain_events(), 1);

        let status = panel.status();
        assert_eq!(status.logging_time, "12.30");
        assert_eq!(status.samples_collected, 123);
        assert_eq!(status.current_file, "session.jsonl");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_keeps_previous_snapshot() {
        let (mut panel, service) = panel();
        service.set_report(Some(report(1.0, 10)));
        panel.start_logging().unwrap();
        sleep(Duration::from_millis(600)).await;
        panel.drain_events();

        service.set_report(None);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(panel.drain_events(), 1);
        assert_eq!(panel.status().samples_collected, 10);
        assert_eq!(panel.status().logging_time, "1.00");
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_after_stop_is_dropped() {
        let (mut panel, service) = panel();
        service.set_report(Some(report(5.0, 50)));
        panel.start_logging().unwrap();
        sleep(Duration::from_millis(600)).await;

        panel.stop_logging().unwrap();
        assert_eq!(panel.drain_events(), 1);
        assert_eq!(panel.status().samples_collected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_from_previous_session_is_dropped() {
        let (mut panel, service) = panel();
        service.set_report(Some(report(5.0, 50)));
        panel.start_logging().unwrap();
        sleep(Duration::from_millis(600)).await;

        panel.start_logging().unwrap();
        panel.drain_events();
        assert_eq!(panel.session(), 2);
        assert_eq!(panel.status().samples_collected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_polling() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();
        sleep(Duration::from_millis(600)).await;
        panel.stop_logging().unwrap();

        assert!(!panel.is_polling());
        assert_eq!(service.commands().last(), Some(&Command::EndCapture));
        sleep(Duration::from_secs(3)).await;
        assert_eq!(service.status_queries(), 1);
    }

    #[test]
    fn stop_without_start_only_ends_capture() {
        let (mut panel, service) = panel();
        panel.stop_logging().unwrap();
        panel.stop_logging().unwrap();

        assert_eq!(service.commands(), vec![Command::EndCapture, Command::EndCapture]);
        assert_eq!(panel.state(), LoggingState::Idle);
        assert!(!panel.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_the_timer() {
        let (mut panel, service) = panel();
        panel.start_logging().unwrap();
        sleep(Duration::from_millis(600)).await;
        assert_eq!(service.status_queries(), 1);

        panel.dispose();
        sleep(Duration::from_secs(3)).await;
        assert_eq!(service.status_queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_stays_idle() {
        let (mut panel, service) = panel();
        service.fail_sends(true);

        panel.update(Message::StartLogging);
        assert!(!panel.is_logging());
        assert!(!panel.is_polling());
        assert!(panel.last_error().unwrap().starts_with("Starting logging failed"));

        service.fail_sends(false);
        panel.update(Message::StartLogging);
        assert!(panel.is_logging());
        assert!(panel.last_error().is_none());
    }

    #[test]
    fn rejection_is_shown() {
        let (mut panel, _) = panel();
        panel.update(Message::RemoteRejected("unknown key".to_string()));
        assert_eq!(panel.last_error(), Some("Host rejected a command: unknown key"));
    }

    #[test]
    fn export_name_uses_second_precision() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + TimeDelta::milliseconds(789);
        assert_eq!(export_filename(at), "vss_config_2024-01-02T03-04-05.json");
    }

    #[test]
    fn export_and_import_delegate_to_host() {
        let (panel, service) = panel();
        let at = Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 1).unwrap();
        let filename = panel.export_settings_at(at).unwrap();
        panel.import_settings().unwrap();
        panel.open_output_folder().unwrap();

        assert_eq!(
            service.commands(),
            vec![
                Command::ExportConfig { filename },
                Command::ImportConfig {
                    filename: DEFAULT_IMPORT_FILE.to_string()
                },
                Command::RevealOutputLocation,
            ]
        );
    }
}
