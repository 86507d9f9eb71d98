// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for Dendra binaries
//!
//! Console output always; with the `file-logging` feature, JSON logs are also
//! written into a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── dendra.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Keeps file writers alive; logs are flushed when dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder holding this process's log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Filter directives: `RUST_LOG` when set, otherwise the debug flags on top
/// of the configured base level
pub fn filter_directives(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> String {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => debug_flags.to_filter_string(&config.level),
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails if the run folder cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let directives = filter_directives(config, debug_flags);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // Console on stderr so stdout stays free for results
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    let console = match config.format {
        LogFormat::Full => console.with_filter(EnvFilter::new(&directives)).boxed(),
        LogFormat::Compact => console
            .compact()
            .with_filter(EnvFilter::new(&directives))
            .boxed(),
        LogFormat::Json => console
            .json()
            .with_filter(EnvFilter::new(&directives))
            .boxed(),
    };
    layers.push(console);

    #[cfg(feature = "file-logging")]
    let (file_guards, log_dir) = if config.file_logging {
        let run_folder = create_run_folder(&config.log_dir)?;
        prune_run_folders(&config.log_dir, config.retention_runs)?;

        let appender = tracing_appender::rolling::never(&run_folder, "dendra.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::new(&directives))
                .boxed(),
        );
        (vec![guard], Some(run_folder))
    } else {
        (Vec::new(), None)
    };

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    #[cfg(not(feature = "file-logging"))]
    if config.file_logging {
        tracing::warn!(
            "file logging requested but dendra-observability was built without the `file-logging` feature"
        );
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        #[cfg(feature = "file-logging")]
        log_dir,
        #[cfg(not(feature = "file-logging"))]
        log_dir: None,
    })
}

/// Initialize console-only logging at `info` plus the process debug flags
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&LoggingConfig::default(), &crate::cli::parse_debug_flags())
}

/// Create `<base>/run_<timestamp>`
pub fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format(RUN_TIMESTAMP);
    let run_folder = base_log_dir.join(format!("{RUN_PREFIX}{timestamp}"));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Delete all but the `keep` most recent run folders under `base_log_dir`.
///
/// Folders whose name does not parse as a run timestamp are left alone.
/// Returns the number of folders removed.
pub fn prune_run_folders(base_log_dir: &Path, keep: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP).ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in runs.iter().skip(keep) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}
