use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Keeps the background writer alive; drop it to flush.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
    pub telemetry_path: Option<PathBuf>,
}

/// Installs the global subscriber. Structured mode writes JSON lines next to
/// the game records; otherwise human-readable events go to stderr.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<LoggingGuard> {
    let level = logging.level().unwrap_or(Level::WARN);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if !logging.enable_structured {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        // Ignore error if a global subscriber is already set (e.g., when running in tests)
        let _ = tracing::subscriber::set_global_default(subscriber);
        return Ok(LoggingGuard {
            _guard: None,
            telemetry_path: None,
        });
    }

    let telemetry_dir = outputs
        .records
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&telemetry_dir).with_context(|| {
        format!(
            "creating telemetry directory at {}",
            telemetry_dir.display()
        )
    })?;

    let telemetry_path = telemetry_dir.join(TELEMETRY_FILE);
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::info!(target: "twentyq::logging", run_id, message = "structured logging enabled");

    Ok(LoggingGuard {
        _guard: Some(guard),
        telemetry_path: Some(telemetry_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn structured_logging_creates_telemetry_next_to_records() {
        let dir = tempdir().expect("temp dir");
        let outputs = ResolvedOutputs {
            records: dir.path().join("run/games.jsonl"),
            outcomes: dir.path().join("run/outcomes.jsonl"),
            simulation: dir.path().join("run/simulation.jsonl"),
        };
        let logging = LoggingConfig {
            enable_structured: true,
            tracing_level: "info".to_string(),
        };
        let guard = init_logging(&logging, &outputs, "unit").expect("init");
        let path = guard.telemetry_path.clone().expect("telemetry path");
        assert_eq!(path, dir.path().join("run").join(TELEMETRY_FILE));
        assert!(path.exists());
    }
}
