//! In-memory `LoggingService` that records what the panel sends.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bvsl_bridge::{BridgeError, Command, LoggingService, StatusReport};
use parking_lot::Mutex;

#[derive(Default)]
pub struct RecordingService {
    commands: Mutex<Vec<Command>>,
    status_queries: AtomicUsize,
    report: Mutex<Option<StatusReport>>,
    fail_sends: AtomicBool,
}

impl RecordingService {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    /// Reply given to status queries; `None` makes them fail.
    pub fn set_report(&self, report: Option<StatusReport>) {
        *self.report.lock() = report;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LoggingService for RecordingService {
    fn send(&self, command: Command) -> Result<(), BridgeError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BridgeError::Disconnected);
        }
        self.commands.lock().push(command);
        Ok(())
    }

    async fn query_status(&self) -> Result<StatusReport, BridgeError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.report
            .lock()
            .clone()
            .ok_or_else(|| BridgeError::MalformedResponse("missing status".to_string()))
    }
}
