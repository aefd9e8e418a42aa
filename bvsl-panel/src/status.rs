//! Logging state and the last status snapshot shown by the panel.

use bvsl_bridge::StatusReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingState {
    #[default]
    Idle,
    Active,
}

impl LoggingState {
    pub fn is_active(self) -> bool {
        self == LoggingState::Active
    }
}

/// Most recent status accepted from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Elapsed capture time, two decimals.
    pub logging_time: String,
    /// Samples written so far.
    pub samples_collected: u64,
    /// File the host is writing to.
    pub current_file: String,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            logging_time: "0.00".to_string(),
            samples_collected: 0,
            current_file: String::new(),
        }
    }
}

impl SessionStatus {
    /// Zero the counters for a new capture. The filename is kept until the
    /// host reports a new one.
    pub fn reset_counters(&mut self) {
        self.logging_time = "0.00".to_string();
        self.samples_collected = 0;
    }

    pub fn apply(&mut self, report: &StatusReport) {
        self.logging_time = report.time_text();
        self.samples_collected = report.samples;
        self.current_file = report.filename.clone();
    }
}
