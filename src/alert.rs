//! Alert types and the dispatcher that hands them to a notifier

use crate::errors::Result;
use crate::sink::{LogEvent, MonitorLog};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    /// Successful response above the latency threshold
    Slow,
    /// Target not marked up at round end
    Down,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Slow => write!(f, "slow"),
            AlertKind::Down => write!(f, "down"),
        }
    }
}

impl AlertKind {
    pub fn subject(&self) -> &'static str {
        match self {
            AlertKind::Slow => "Website Slow Alert",
            AlertKind::Down => "Website Down Alert",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub url: String,
    pub recipient: String,
    pub message: String,
}

impl Alert {
    pub fn slow(url: &str, latency: Duration, recipient: &str) -> Self {
        Self::new(
            AlertKind::Slow,
            url,
            recipient,
            format!("{} is slow (Response time: {:?})", url, latency),
        )
    }

    pub fn down(url: &str, recipient: &str) -> Self {
        Self::new(
            AlertKind::Down,
            url,
            recipient,
            format!("{} is not responding", url),
        )
    }

    fn new(kind: AlertKind, url: &str, recipient: &str, message: String) -> Self {
        Self {
            kind,
            url: url.to_string(),
            recipient: recipient.to_string(),
            message,
        }
    }

    pub fn subject(&self) -> &'static str {
        self.kind.subject()
    }
}

/// Outbound notification capability
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Turns slow/down findings into notifications. Delivery is best-effort.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    recipient: String,
    log: Arc<dyn MonitorLog>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, recipient: impl Into<String>, log: Arc<dyn MonitorLog>) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
            log,
        }
    }

    pub async fn slow_alert(&self, url: &str, latency: Duration) -> bool {
        self.dispatch(&Alert::slow(url, latency, &self.recipient)).await
    }

    pub async fn down_alert(&self, url: &str) -> bool {
        self.dispatch(&Alert::down(url, &self.recipient)).await
    }

    /// Send one alert. A failed send is logged and reported as `false`; it is never retried.
    pub async fn dispatch(&self, alert: &Alert) -> bool {
        match self
            .notifier
            .send(&alert.recipient, alert.subject(), &alert.message)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.log.record(LogEvent::AlertFailed {
                    kind: alert.kind,
                    url: alert.url.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }
}
