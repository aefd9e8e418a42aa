//! Recurring status query while logging is active.

use std::sync::Arc;
use std::time::Duration;

use bvsl_bridge::LoggingService;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::app::Message;

/// Period between status queries.
pub const POLL_PERIOD: Duration = Duration::from_millis(500);

/// Handle to a running poll timer. Dropping it stops the timer.
///
/// Each tick issues its own query; replies are not ordered against each
/// other and queries already in flight are left to finish.
#[derive(Debug)]
pub struct StatusPoller {
    /// Session stamped on every reply
    session: u64,
    /// Timer loop
    task: JoinHandle<()>,
}

impl StatusPoller {
    /// Start ticking. The first query goes out one `period` after spawning.
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        service: Arc<dyn LoggingService>,
        session: u64,
        period: Duration,
        events: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            // A stalled runtime resumes with one query, not a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.is_closed() {
                    break;
                }

                let service = Arc::clone(&service);
                let events = events.clone();
                tokio::spawn(async move {
                    let result = service.query_status().await.map_err(|e| e.to_string());
                    let _ = events.send(Message::StatusReceived { session, result });
                });
            }
        });

        debug!(session, "Status poller started");
        Self { session, task }
    }

    /// Stop scheduling further queries.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.task.abort();
        debug!(session = self.session, "Status poller stopped");
    }
}
