//! Monitored endpoints and their last observed state

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Result of the most recent probe against a target
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// `false` until the first successful check
    pub up: bool,
    /// Only set while `up` is true
    pub latency: Option<Duration>,
    pub attempts: u32,
    pub checked_at: Option<DateTime<Utc>>,
}

/// A monitored HTTP endpoint.
///
/// Written by exactly one probe per round; the scheduler reads it after the
/// collection window whether or not that probe has finished.
#[derive(Debug)]
pub struct Target {
    url: String,
    state: RwLock<Observation>,
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: RwLock::new(Observation::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn observation(&self) -> Observation {
        self.state.read().await.clone()
    }

    pub async fn is_up(&self) -> bool {
        self.state.read().await.up
    }

    pub async fn mark_up(&self, latency: Duration, attempts: u32) {
        let mut state = self.state.write().await;
        *state = Observation {
            up: true,
            latency: Some(latency),
            attempts,
            checked_at: Some(Utc::now()),
        };
    }

    pub async fn mark_down(&self, attempts: u32) {
        let mut state = self.state.write().await;
        *state = Observation {
            up: false,
            latency: None,
            attempts,
            checked_at: Some(Utc::now()),
        };
    }
}

/// Targets in configuration order. Built once and never shrinks.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    targets: Vec<Arc<Target>>,
}

impl TargetSet {
    /// Duplicate URLs are kept as separate targets
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: urls.into_iter().map(|url| Arc::new(Target::new(url))).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Target>> {
        self.targets.get(index)
    }

    pub async fn snapshot(&self) -> Vec<(String, Observation)> {
        let mut snapshot = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            snapshot.push((target.url.clone(), target.observation().await));
        }
        snapshot
    }
}
