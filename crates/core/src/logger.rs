use std::fmt;
use std::io;
use std::path::Path;
use std::sync::mpsc;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_PREFIX: &str = "vigil";
/// Days of logs kept before the oldest file is removed.
pub const MAX_LOG_FILES: usize = 5;

/// One log event as the TUI renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    /// Last segment of the event target, e.g. `controller`.
    pub prefix: String,
    /// Local wall-clock `HH:MM:SS`.
    pub timestamp: String,
    pub message: String,
}

/// Daily `vigil.YYYY-MM-DD.log` files in `log_dir`, at most `MAX_LOG_FILES`.
pub fn file_appender(log_dir: &Path) -> io::Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(io::Error::other)
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`), a
/// rotating file log in `log_dir`, and optionally a feed into the TUI.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path, tui_tx: Option<mpsc::Sender<LogLine>>) -> io::Result<WorkerGuard> {
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(tui_tx.map(TuiLayer::new))
        .try_init();
    if let Err(e) = result {
        eprintln!("logger already initialized: {}", e);
    }

    Ok(guard)
}

/// Forwards every event over a channel as a `LogLine`.
pub struct TuiLayer {
    tx: mpsc::Sender<LogLine>,
}

impl TuiLayer {
    pub fn new(tx: mpsc::Sender<LogLine>) -> Self {
        Self { tx }
    }
}

impl<S: Subscriber> Layer<S> for TuiLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = LogLine {
            level: *meta.level(),
            prefix: meta.target().rsplit("::").next().unwrap_or_default().to_string(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message: visitor.finish(),
        };
        // TUI gone: nothing left to show the line to.
        let _ = self.tx.send(line);
    }
}

/// Collects the `message` field plus any structured fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};

    fn capture<F: FnOnce()>(f: F) -> Vec<LogLine> {
        let (tx, rx) = mpsc::channel();
        let subscriber = tracing_subscriber::registry().with(TuiLayer::new(tx));
        tracing::subscriber::with_default(subscriber, f);
        rx.try_iter().collect()
    }

    #[test]
    fn test_tui_layer_forwards_message_and_prefix() {
        let lines = capture(|| info!("controller started"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].level, Level::INFO);
        assert_eq!(lines[0].prefix, "tests");
        assert_eq!(lines[0].message, "controller started");
        assert_eq!(lines[0].timestamp.len(), 8);
    }

    #[test]
    fn test_tui_layer_appends_fields() {
        let lines = capture(|| warn!(resource = "Health", percent = 42.5, "low"));
        assert_eq!(lines[0].level, Level::WARN);
        assert_eq!(lines[0].message, "low resource=Health percent=42.5");
    }

    #[test]
    fn test_file_appender_writes_dated_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().expect("tempdir");
        let logs = dir.path().join("logs");
        let mut appender = file_appender(&logs).expect("appender");
        appender.write_all(b"controller started\n").expect("write");
        appender.flush().expect("flush");

        let names: Vec<String> = std::fs::read_dir(&logs)
            .expect("log dir created")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("vigil.") && names[0].ends_with(".log"), "{}", names[0]);
    }
}
