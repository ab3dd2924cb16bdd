//! Retry-bounded HTTP probe for a single target

use crate::alert::AlertDispatcher;
use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::sink::{LogEvent, MonitorLog};
use crate::target::Target;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::instrument;

/// Probe retry state machine. `Succeeded` and `Exhausted` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeState {
    Attempting(u32),
    Succeeded { latency: Duration, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl ProbeState {
    /// Feed the result of the current attempt into the machine
    pub fn advance(self, attempt: std::result::Result<Duration, String>, max_attempts: u32) -> Self {
        match self {
            ProbeState::Attempting(n) => match attempt {
                Ok(latency) => ProbeState::Succeeded { latency, attempts: n },
                Err(_) if n >= max_attempts => ProbeState::Exhausted { attempts: n },
                Err(_) => ProbeState::Attempting(n + 1),
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProbeState::Attempting(_))
    }
}

/// How a probe ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy { latency: Duration, attempts: u32 },
    Slow { latency: Duration, attempts: u32, alerted: bool },
    Down { attempts: u32 },
}

pub struct Prober {
    client: Client,
    max_attempts: u32,
    latency_threshold: Duration,
    backoff: Duration,
    dispatcher: AlertDispatcher,
    log: Arc<dyn MonitorLog>,
}

impl Prober {
    pub fn new(config: &Config, dispatcher: AlertDispatcher, log: Arc<dyn MonitorLog>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(format!("site_monitor/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            max_attempts: config.max_retries,
            latency_threshold: config.latency_threshold(),
            backoff: config.retry_backoff(),
            dispatcher,
            log,
        })
    }

    /// Probe `target` until one attempt succeeds or the attempts run out.
    ///
    /// Writes the target exactly once. A slow success raises its alert here;
    /// a down target is left for the round-end scan.
    #[instrument(skip(self, target), fields(url = %target.url()))]
    pub async fn probe(&self, target: &Target) -> ProbeOutcome {
        let url = target.url();
        let mut state = ProbeState::Attempting(1);

        loop {
            match state {
                ProbeState::Attempting(n) => {
                    let attempt = self.attempt(url).await;
                    if let Err(reason) = &attempt {
                        self.log.record(LogEvent::AttemptFailed {
                            url: url.to_string(),
                            attempt: n,
                            reason: reason.clone(),
                        });
                    }
                    state = state.advance(attempt, self.max_attempts);
                    if let ProbeState::Attempting(_) = state {
                        sleep(self.backoff).await;
                    }
                }
                ProbeState::Succeeded { latency, attempts } => {
                    target.mark_up(latency, attempts).await;
                    return self.classify_success(url, latency, attempts).await;
                }
                ProbeState::Exhausted { attempts } => {
                    target.mark_down(attempts).await;
                    self.log.record(LogEvent::ProbeExhausted {
                        url: url.to_string(),
                        attempts,
                    });
                    return ProbeOutcome::Down { attempts };
                }
            }
        }
    }

    async fn classify_success(&self, url: &str, latency: Duration, attempts: u32) -> ProbeOutcome {
        if latency > self.latency_threshold {
            self.log.record(LogEvent::ProbeSlow {
                url: url.to_string(),
                latency,
                threshold: self.latency_threshold,
            });
            let alerted = self.dispatcher.slow_alert(url, latency).await;
            ProbeOutcome::Slow { latency, attempts, alerted }
        } else {
            self.log.record(LogEvent::ProbeSucceeded {
                url: url.to_string(),
                latency,
            });
            ProbeOutcome::Healthy { latency, attempts }
        }
    }

    /// One GET. Only a 200 counts as success.
    async fn attempt(&self, url: &str) -> std::result::Result<Duration, String> {
        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) if response.status() == StatusCode::OK => Ok(start.elapsed()),
            Ok(response) => Err(format!("unexpected status {}", response.status())),
            Err(e) => Err(e.to_string()),
        }
    }
}
