//! Log sink the monitor writes its events through

use crate::alert::AlertKind;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One observable monitoring event
#[derive(Clone, Debug, PartialEq)]
pub enum LogEvent {
    MonitorStarted { monitor_id: String, targets: usize, interval: Duration },
    RoundStarted { round: u64 },
    ProbeSucceeded { url: String, latency: Duration },
    ProbeSlow { url: String, latency: Duration, threshold: Duration },
    AttemptFailed { url: String, attempt: u32, reason: String },
    ProbeExhausted { url: String, attempts: u32 },
    TargetHealthy { url: String },
    TargetDown { url: String },
    AlertFailed { kind: AlertKind, url: String, error: String },
    RoundFinished { round: u64, healthy: usize, down: usize },
    Waiting { interval: Duration },
}

impl LogEvent {
    pub fn url(&self) -> Option<&str> {
        match self {
            LogEvent::ProbeSucceeded { url, .. }
            | LogEvent::ProbeSlow { url, .. }
            | LogEvent::AttemptFailed { url, .. }
            | LogEvent::ProbeExhausted { url, .. }
            | LogEvent::TargetHealthy { url }
            | LogEvent::TargetDown { url }
            | LogEvent::AlertFailed { url, .. } => Some(url.as_str()),
            LogEvent::MonitorStarted { .. }
            | LogEvent::RoundStarted { .. }
            | LogEvent::RoundFinished { .. }
            | LogEvent::Waiting { .. } => None,
        }
    }
}

/// Append-only destination for monitoring events.
///
/// Handed to the scheduler and every probe explicitly; the binary owns its lifecycle.
pub trait MonitorLog: Send + Sync {
    fn record(&self, event: LogEvent);
}

/// Forwards events to the `tracing` subscriber installed by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl MonitorLog for TracingLog {
    fn record(&self, event: LogEvent) {
        match event {
            LogEvent::MonitorStarted { monitor_id, targets, interval } => {
                info!(
                    monitor_id = %monitor_id,
                    "Monitor {} watching {} targets every {}s",
                    monitor_id,
                    targets,
                    interval.as_secs()
                );
            }
            LogEvent::RoundStarted { round } => {
                info!(round, "Starting website verification...");
            }
            LogEvent::ProbeSucceeded { url, latency } => {
                info!(url = %url, latency_ms = latency.as_millis() as u64, "Response time for {}: {:?}", url, latency);
            }
            LogEvent::ProbeSlow { url, latency, threshold } => {
                warn!(
                    url = %url,
                    latency_ms = latency.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "ALERT: {} is slow (Response time: {:?})",
                    url,
                    latency
                );
            }
            LogEvent::AttemptFailed { url, attempt, reason } => {
                debug!(url = %url, attempt, "Attempt {} against {} failed: {}", attempt, url, reason);
            }
            LogEvent::ProbeExhausted { url, attempts } => {
                debug!(url = %url, attempts, "Giving up on {} after {} attempts", url, attempts);
            }
            LogEvent::TargetHealthy { url } => {
                info!(url = %url, "{} is functioning correctly", url);
            }
            LogEvent::TargetDown { url } => {
                warn!(url = %url, "ALERT: {} is not responding", url);
            }
            LogEvent::AlertFailed { kind, url, error } => {
                error!(url = %url, kind = %kind, "Error sending {} alert for {}: {}", kind, url, error);
            }
            LogEvent::RoundFinished { round, healthy, down } => {
                debug!(round, "Round {} finished: {} healthy, {} down", round, healthy, down);
            }
            LogEvent::Waiting { interval } => {
                info!(
                    interval_secs = interval.as_secs(),
                    "Waiting {} seconds for the next verification...",
                    interval.as_secs()
                );
            }
        }
    }
}

/// Keeps every event in memory; used by tests and embedding callers
#[derive(Debug, Default)]
pub struct MemoryLog {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Events that concern one URL, in recording order
    pub fn events_for(&self, url: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.url() == Some(url))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl MonitorLog for MemoryLog {
    fn record(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
