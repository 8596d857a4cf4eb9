//! Structured logging for the Quantix-vDC control plane.
//!
//! One [`init_logging`] call installs the global subscriber: a console sink
//! (pretty or JSON) plus an optional JSON-lines file sink. Services tag
//! every record with a `component` field (`scheduler`, `heartbeat`,
//! `reconcile`, `daemon`, ...) so operators can slice the log by subsystem;
//! the macros below keep those tags consistent across the codebase.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Output format for the console sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-oriented colored output for interactive use.
    Pretty,
    /// JSON lines for log aggregation (Loki, ELK, ...).
    Json,
}

/// Logging configuration, resolved from CLI flags at startup.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default level directive; `RUST_LOG` overrides it when set.
    pub level: String,
    pub format: LogFormat,
    /// Mirror all records to this file as JSON lines when set.
    pub file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LogOptions {
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Install the global subscriber. Errors if called twice.
pub fn init_logging(options: &LogOptions) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.level));

    let console = match options.format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed(),
    };

    let file_sink = match &options.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_sink)
        .try_init()
        .context("logging already initialized")?;

    tracing::info!(
        level = %options.level,
        format = ?options.format,
        file = options.file.as_ref().map(|p| p.display().to_string()),
        "🌅 Quantix-vDC logging online"
    );
    Ok(())
}

// ============================================================================
// Instrumentation Macros
// ============================================================================
//
// Each macro pins the `component` tag and the identifying fields for one
// control plane subsystem, so grep and log queries stay stable no matter
// which service emitted the record.

/// Record a scheduling decision: which node a VM landed on.
#[macro_export]
macro_rules! log_placement {
    ($vm_id:expr, $node_id:expr, $($arg:tt)*) => {
        tracing::info!(
            component = "scheduler",
            vm_id = %$vm_id,
            node_id = %$node_id,
            "🎯 {}",
            format!($($arg)*)
        )
    };
}

/// Trace a heartbeat as it is ingested.
#[macro_export]
macro_rules! log_heartbeat {
    ($node_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = "heartbeat",
            node_id = %$node_id,
            "💓 {}",
            format!($($arg)*)
        )
    };
}

/// Record the outcome of one background reconciliation pass.
#[macro_export]
macro_rules! log_reconcile {
    ($task:expr, $affected:expr, $($arg:tt)*) => {
        tracing::info!(
            component = "reconcile",
            task = $task,
            affected = %$affected,
            "🔄 {}",
            format!($($arg)*)
        )
    };
}

/// Record a command fanned out to a node daemon.
#[macro_export]
macro_rules! log_fanout {
    ($node_id:expr, $op:expr, $($arg:tt)*) => {
        tracing::info!(
            component = "daemon",
            node_id = %$node_id,
            op = $op,
            "📞 {}",
            format!($($arg)*)
        )
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = LogOptions::default()
            .with_level("debug")
            .json()
            .with_file("/var/log/quantix/vdc.log");
        assert_eq!(options.level, "debug");
        assert_eq!(options.format, LogFormat::Json);
        assert_eq!(
            options.file.as_deref(),
            Some(std::path::Path::new("/var/log/quantix/vdc.log"))
        );
    }

    #[test]
    fn test_init_is_one_shot() {
        let options = LogOptions::default().with_level("warn");
        assert!(init_logging(&options).is_ok());
        assert!(init_logging(&options).is_err());
    }
}
