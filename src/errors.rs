//! Failures surfaced by the monitor.
//!
//! Only configuration and log-sink errors ever stop the process; probe and
//! alert failures are absorbed where they happen.

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// Config file or log file could not be read/opened
    Io(std::io::Error),

    /// HTTP client could not be built
    Http(reqwest::Error),

    /// Config file is not valid JSON for `Config`
    Json(serde_json::Error),

    /// Config parsed but failed validation
    Config(String),

    /// SMTP session with the mail relay failed
    Smtp(lettre::transport::smtp::Error),

    /// Alert could not be turned into a deliverable message
    Notify(String),

    Other(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::Smtp(err) => write!(f, "SMTP error: {}", err),
            MonitorError::Notify(msg) => write!(f, "Notification error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Smtp(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<lettre::transport::smtp::Error> for MonitorError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MonitorError::Smtp(err)
    }
}
