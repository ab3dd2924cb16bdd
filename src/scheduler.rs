//! Round scheduler driving concurrent probes and the round-end alert scan

use crate::alert::{AlertDispatcher, Notifier};
use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::probe::Prober;
use crate::sink::{LogEvent, MonitorLog};
use crate::target::{Observation, TargetSet};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{sleep, Duration};
use tracing::instrument;
use uuid::Uuid;

/// Drives the monitoring rounds
pub struct Scheduler {
    monitor_id: String,
    targets: TargetSet,
    prober: Arc<Prober>,
    dispatcher: AlertDispatcher,
    log: Arc<dyn MonitorLog>,
    collection_window: Duration,
    interval: Duration,
    rounds: AtomicU64,
}

/// What the round-end scan saw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    pub healthy: Vec<String>,
    pub down: Vec<String>,
    pub failed_alerts: usize,
}

impl RoundReport {
    pub fn all_healthy(&self) -> bool {
        self.down.is_empty()
    }
}

impl Scheduler {
    /// Create a scheduler; the target set is built here and lives as long as it does
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>, log: Arc<dyn MonitorLog>) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let dispatcher = AlertDispatcher::new(notifier, config.alert_recipient.clone(), Arc::clone(&log));
        let prober = Arc::new(Prober::new(config, dispatcher.clone(), Arc::clone(&log))?);

        Ok(Self {
            monitor_id: Uuid::new_v4().to_string(),
            targets: TargetSet::from_urls(config.websites.iter().cloned()),
            prober,
            dispatcher,
            log,
            collection_window: config.collection_window(),
            interval: config.round_interval(),
            rounds: AtomicU64::new(0),
        })
    }

    pub fn monitor_id(&self) -> &str {
        &self.monitor_id
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Run rounds until the process is terminated
    pub async fn run(&self) {
        self.log.record(LogEvent::MonitorStarted {
            monitor_id: self.monitor_id.clone(),
            targets: self.targets.len(),
            interval: self.interval,
        });

        loop {
            self.run_cycle().await;
        }
    }

    /// One loop iteration: a full round, then the wait before the next one
    pub async fn run_cycle(&self) -> RoundReport {
        let report = self.run_round().await;

        self.log.record(LogEvent::Waiting { interval: self.interval });
        sleep(self.interval).await;

        report
    }

    /// Launch every probe, wait the collection window, then scan.
    ///
    /// Probes still running when the window closes are not awaited; the scan
    /// sees whatever their target held at that moment.
    #[instrument(skip(self), fields(monitor_id = %self.monitor_id))]
    pub async fn run_round(&self) -> RoundReport {
        let round = self.rounds.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.record(LogEvent::RoundStarted { round });

        self.launch_probes();
        sleep(self.collection_window).await;

        let report = self.scan(round).await;
        self.log.record(LogEvent::RoundFinished {
            round,
            healthy: report.healthy.len(),
            down: report.down.len(),
        });
        report
    }

    fn launch_probes(&self) {
        for target in self.targets.iter() {
            let prober = Arc::clone(&self.prober);
            let target = Arc::clone(target);
            tokio::spawn(async move {
                prober.probe(&target).await;
            });
        }
    }

    /// Down-alert every target not marked up, in target order
    async fn scan(&self, round: u64) -> RoundReport {
        let mut report = RoundReport {
            round,
            ..Default::default()
        };

        for target in self.targets.iter() {
            let url = target.url().to_string();
            if target.is_up().await {
                self.log.record(LogEvent::TargetHealthy { url: url.clone() });
                report.healthy.push(url);
            } else {
                self.log.record(LogEvent::TargetDown { url: url.clone() });
                if !self.dispatcher.down_alert(&url).await {
                    report.failed_alerts += 1;
                }
                report.down.push(url);
            }
        }

        report
    }

    /// Current observation of every target, in target order
    pub async fn snapshot(&self) -> Vec<(String, Observation)> {
        self.targets.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryLog;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, _to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
            if self.fail {
                return Err(MonitorError::Notify("relay unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn test_config(websites: Vec<String>) -> Config {
        Config {
            websites,
            interval: 1,
            max_retries: 1,
            response_time_max: 2_000,
            retry_backoff_ms: 10,
            collection_window_ms: 500,
            ..Config::default()
        }
    }

    async fn healthy_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    async fn failing_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Scheduler::new(
            &Config::default(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryLog::new()),
        );
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[tokio::test]
    async fn test_round_alerts_only_down_targets() {
        let up = healthy_server().await;
        let down = failing_server().await;

        let notifier = Arc::new(RecordingNotifier::default());
        let log = Arc::new(MemoryLog::new());
        let scheduler = Scheduler::new(
            &test_config(vec![up.uri(), down.uri()]),
            notifier.clone(),
            log.clone(),
        )
        .unwrap();

        let report = scheduler.run_round().await;

        assert_eq!(report.round, 1);
        assert_eq!(report.healthy, vec![up.uri()]);
        assert_eq!(report.down, vec![down.uri()]);
        assert_eq!(report.failed_alerts, 0);

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Website Down Alert");
        assert!(sent[0].1.contains(&down.uri()));

        assert_eq!(log.events()[0], LogEvent::RoundStarted { round: 1 });
        assert!(log.events_for(&up.uri()).contains(&LogEvent::TargetHealthy { url: up.uri() }));
        assert!(log.events_for(&down.uri()).contains(&LogEvent::TargetDown { url: down.uri() }));
    }

    #[tokio::test]
    async fn test_probe_outlasting_window_reads_as_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1_500)))
            .mount(&server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let mut config = test_config(vec![server.uri()]);
        config.response_time_max = 5_000;
        let scheduler = Scheduler::new(&config, notifier.clone(), Arc::new(MemoryLog::new())).unwrap();

        let report = scheduler.run_round().await;
        assert_eq!(report.down, vec![server.uri()]);

        // the late probe still lands on the target after the scan
        sleep(Duration::from_millis(1_500)).await;
        assert!(scheduler.targets().get(0).unwrap().is_up().await);
    }

    #[tokio::test]
    async fn test_failed_down_alert_does_not_stop_scan() {
        let first = failing_server().await;
        let second = failing_server().await;
        let third = healthy_server().await;

        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let log = Arc::new(MemoryLog::new());
        let scheduler = Scheduler::new(
            &test_config(vec![first.uri(), second.uri(), third.uri()]),
            notifier.clone(),
            log.clone(),
        )
        .unwrap();

        let report = scheduler.run_round().await;
        assert_eq!(report.down.len(), 2);
        assert_eq!(report.failed_alerts, 2);
        assert_eq!(report.healthy, vec![third.uri()]);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);

        let report = scheduler.run_round().await;
        assert_eq!(report.round, 2);
        assert_eq!(report.failed_alerts, 2);

        let alert_failures = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, LogEvent::AlertFailed { .. }))
            .count();
        assert_eq!(alert_failures, 4);
    }

    #[tokio::test]
    async fn test_repeated_healthy_rounds_send_nothing() {
        let a = healthy_server().await;
        let b = healthy_server().await;

        let notifier = Arc::new(RecordingNotifier::default());
        let log = Arc::new(MemoryLog::new());
        let scheduler = Scheduler::new(
            &test_config(vec![a.uri(), b.uri()]),
            notifier.clone(),
            log.clone(),
        )
        .unwrap();

        for round in 1..=3 {
            let report = scheduler.run_round().await;
            assert_eq!(report.round, round);
            assert!(report.all_healthy());
        }

        assert!(notifier.sent.lock().unwrap().is_empty());
        let healthy_lines = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, LogEvent::TargetHealthy { .. }))
            .count();
        assert_eq!(healthy_lines, 6);

        let snapshot = scheduler.snapshot().await;
        assert!(snapshot.iter().all(|(_, observed)| observed.up));
    }

    fn loop_events(log: &MemoryLog) -> Vec<LogEvent> {
        log.events()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    LogEvent::MonitorStarted { .. }
                        | LogEvent::RoundStarted { .. }
                        | LogEvent::RoundFinished { .. }
                        | LogEvent::Waiting { .. }
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cycle_waits_interval_after_round() {
        let server = healthy_server().await;
        let log = Arc::new(MemoryLog::new());
        let mut config = test_config(vec![server.uri()]);
        config.collection_window_ms = 200;
        let scheduler = Scheduler::new(&config, Arc::new(RecordingNotifier::default()), log.clone()).unwrap();

        let started = std::time::Instant::now();
        let report = scheduler.run_cycle().await;

        assert!(started.elapsed() >= Duration::from_millis(1_200));
        assert_eq!(report.round, 1);
        assert!(report.all_healthy());
        assert_eq!(
            loop_events(&log),
            vec![
                LogEvent::RoundStarted { round: 1 },
                LogEvent::RoundFinished { round: 1, healthy: 1, down: 0 },
                LogEvent::Waiting { interval: Duration::from_secs(1) },
            ]
        );
    }

    #[tokio::test]
    async fn test_run_repeats_rounds_with_waits_between() {
        let server = healthy_server().await;
        let log = Arc::new(MemoryLog::new());
        let mut config = test_config(vec![server.uri()]);
        config.collection_window_ms = 200;
        let scheduler = Scheduler::new(&config, Arc::new(RecordingNotifier::default()), log.clone()).unwrap();

        let stopped = tokio::time::timeout(Duration::from_millis(1_800), scheduler.run()).await;
        assert!(stopped.is_err());

        assert_eq!(
            loop_events(&log),
            vec![
                LogEvent::MonitorStarted {
                    monitor_id: scheduler.monitor_id().to_string(),
                    targets: 1,
                    interval: Duration::from_secs(1),
                },
                LogEvent::RoundStarted { round: 1 },
                LogEvent::RoundFinished { round: 1, healthy: 1, down: 0 },
                LogEvent::Waiting { interval: Duration::from_secs(1) },
                LogEvent::RoundStarted { round: 2 },
                LogEvent::RoundFinished { round: 2, healthy: 1, down: 0 },
                LogEvent::Waiting { interval: Duration::from_secs(1) },
            ]
        );
    }
}
