//! Logging setup
//!
//! stdout carries the MCP protocol, so human-readable output goes to stderr
//! and, in debug mode or when a log file is configured, to a file.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Prefix of every file written by the daily appender
pub const LOG_FILE_PREFIX: &str = "cantonese-mcp.log";

/// Env var overriding the debug log directory
pub const LOG_DIR_ENV: &str = "DEBUG_LOGS_LOCATION";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub debug_mode: bool,
    pub log_dir: PathBuf,
    /// Fixed log file; takes precedence over the daily files in `log_dir`
    pub file: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_mode: false,
            log_dir: default_log_dir(),
            file: None,
            json: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &crate::config::LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            file: config.file.clone(),
            json: config.json,
            ..Self::default()
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    fn effective_level(&self) -> &str {
        if self.debug_mode { "debug" } else { &self.level }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("warn,cantonese_mcp={}", self.effective_level()))
        })
    }
}

/// `$DEBUG_LOGS_LOCATION`, else the platform data dir
pub fn log_dir_from_env() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(default_log_dir)
}

pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cantonese-mcp")
        .join("logs")
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .boxed()
    }
}

fn file_layer(writer: tracing_appender::non_blocking::NonBlocking, json: bool) -> BoxedLayer {
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).with_ansi(false).boxed()
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.json)];
    let mut guard = None;

    let appender = if let Some(ref file) = config.file {
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = file
            .file_name()
            .with_context(|| format!("Log file has no file name: {}", file.display()))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        Some(tracing_appender::rolling::never(dir, name))
    } else if config.debug_mode {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory: {}", config.log_dir.display())
        })?;
        Some(tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX))
    } else {
        None
    };

    if let Some(appender) = appender {
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(file_layer(writer, config.json));
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(config.filter())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if config.debug_mode {
        tracing::debug!("Debug logging enabled; writing to {}", config.log_dir.display());
    }

    Ok(guard)
}

fn log_files(log_dir: &Path) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    if !log_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let is_log = entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files.push((entry.path(), metadata.modified()?));
        }
    }
    Ok(files)
}

/// Remove daily log files older than `days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, days: u64) -> std::io::Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(days * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    for (path, modified) in log_files(log_dir)? {
        if modified < cutoff {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Most recently written log file, if any
pub fn get_log_path(log_dir: &Path) -> Option<PathBuf> {
    log_files(log_dir)
        .ok()?
        .into_iter()
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
}
