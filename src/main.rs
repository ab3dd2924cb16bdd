//! Website Availability Monitor Binary

use clap::{Parser, ValueEnum};
use site_monitor::{
    Config, ConfigLoader, JsonFileLoader, MonitorError, MonitorLog, NotifierConfig, Result, Scheduler,
    TracingLog, notifier,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(version, about = "Checks website availability and response times")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "MONITOR_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Append-only log file; `-` logs to stdout
    #[arg(long, env = "MONITOR_LOG_FILE", default_value = "monitor.log")]
    log_file: PathBuf,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loader = JsonFileLoader::new(&cli.config);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration from {}: {}", loader.path().display(), e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = initialize_tracing(&cli.log_file, cli.log_format) {
        eprintln!("Error opening log file {}: {}", cli.log_file.display(), e);
        std::process::exit(1);
    }

    info!("Starting website monitor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!("Monitor failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let log: Arc<dyn MonitorLog> = Arc::new(TracingLog);
    let notifier = notifier::from_config(&NotifierConfig::from_env())?;

    info!(
        "Monitor configuration - Targets: {}, Interval: {}s, Max retries: {}, Threshold: {}ms, Notifier: {}",
        config.websites.len(),
        config.interval,
        config.max_retries,
        config.response_time_max,
        notifier.name()
    );

    let scheduler = Scheduler::new(&config, notifier, log)?;

    tokio::select! {
        _ = scheduler.run() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| {
                MonitorError::Other(format!("Failed to wait for shutdown signal: {}", e))
            })?;
            info!("Shutting down monitor {}", scheduler.monitor_id());
            Ok(())
        }
    }
}

/// Initialize structured logging into the log sink
fn initialize_tracing(log_file: &Path, format: LogFormat) -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .map_err(|e| MonitorError::Config(format!("invalid log filter: {}", e)))?;

    let to_stdout = log_file.as_os_str() == "-";
    let writer = if to_stdout {
        None
    } else {
        Some(Mutex::new(
            OpenOptions::new().create(true).append(true).open(log_file)?,
        ))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(to_stdout);

    let registry = tracing_subscriber::registry().with(filter_layer);

    match (writer, format) {
        (Some(file), LogFormat::Json) => registry.with(fmt_layer.json().with_writer(file)).init(),
        (Some(file), LogFormat::Text) => registry.with(fmt_layer.with_writer(file)).init(),
        (None, LogFormat::Json) => registry.with(fmt_layer.json()).init(),
        (None, LogFormat::Text) => registry.with(fmt_layer).init(),
    }

    Ok(())
}
