//! Website Availability Monitor Library
//!
//! Periodically probes a set of HTTP endpoints, retrying failed checks, and
//! raises alerts for endpoints that are down or respond slower than a threshold.

pub mod alert;
pub mod config;
pub mod errors;
pub mod notifier;
pub mod probe;
pub mod scheduler;
pub mod sink;
pub mod target;

pub use alert::{Alert, AlertDispatcher, AlertKind, Notifier};
pub use config::{Config, ConfigLoader, JsonFileLoader, NotifierConfig};
pub use errors::{MonitorError, Result};
pub use probe::{ProbeOutcome, ProbeState, Prober};
pub use scheduler::{RoundReport, Scheduler};
pub use sink::{LogEvent, MemoryLog, MonitorLog, TracingLog};
pub use target::{Observation, Target, TargetSet};
