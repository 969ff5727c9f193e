//! # Line sinks and the subscribers that feed them.
//!
//! Persisted log/activity/metrics files are owned by outer layers; this module
//! only needs them as "append one pre-formatted line". [`FileSink`] is a plain
//! append-only file; tests use in-memory sinks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::events::{ActivityEvent, AgentEvent};
use crate::metrics::MetricsSnapshot;
use crate::subscribers::Subscribe;

/// Named, append-only line stream.
pub trait LineSink: Send + Sync + 'static {
    /// Appends `line` (which already ends with `\n`).
    fn append(&self, line: &str);
}

/// Append-only file on disk.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Opens (or creates) `path` for appending, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn append(&self, line: &str) {
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "cannot append to sink");
        }
    }
}

/// Formats an activity notice the way the activity log stores it: one
/// `[<local time>] TYPE  message` line per message line.
pub fn format_activity(ev: &ActivityEvent) -> String {
    let stamp = ev.at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let kind = ev.kind.as_str().to_uppercase();
    let text = format!("{kind:<5} {}", ev.message);

    let mut out = String::new();
    for line in text.trim_end().split('\n') {
        out.push_str(&format!("[{stamp}] {line}\n"));
    }
    out
}

/// Writes formatted activity notices to a sink.
pub struct ActivitySinkWriter {
    sink: Arc<dyn LineSink>,
}

impl ActivitySinkWriter {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

impl Subscribe<ActivityEvent> for ActivitySinkWriter {
    fn on_event(&self, ev: &ActivityEvent) {
        self.sink.append(&format_activity(ev));
    }

    fn name(&self) -> &'static str {
        "ActivitySinkWriter"
    }
}

/// Writes every merged metrics update as one JSON line.
pub struct MetricsSinkWriter {
    sink: Arc<dyn LineSink>,
}

impl MetricsSinkWriter {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

impl Subscribe<MetricsSnapshot> for MetricsSinkWriter {
    fn on_event(&self, m: &MetricsSnapshot) {
        let mut line = AgentEvent::from(m).to_json_line();
        line.push('\n');
        self.sink.append(&line);
    }

    fn name(&self) -> &'static str {
        "MetricsSinkWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<String>>);

    impl LineSink for MemorySink {
        fn append(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[test]
    fn multi_line_messages_get_one_stamp_per_line() {
        let ev = ActivityEvent::error("spark", "Spark crashed\nstack line\n");
        let text = format_activity(&ev);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] ERROR Spark crashed"), "{}", lines[0]);
        assert!(lines[1].ends_with("] stack line"), "{}", lines[1]);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn info_is_padded_to_five_columns() {
        let ev = ActivityEvent::info("spark", "Spark started");
        assert!(format_activity(&ev).contains("] INFO  Spark started"));
    }

    #[test]
    fn metrics_writer_appends_json_lines() {
        let sink = Arc::new(MemorySink::default());
        let writer = MetricsSinkWriter::new(sink.clone());
        writer.on_event(&MetricsSnapshot {
            total_jobs_completed: 3,
            rewards_scheduled_for_address: 0,
        });
        let lines = sink.0.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "{\"type\":\"metrics\",\"totalJobsCompleted\":3,\"rewardsScheduledForAddress\":\"0\"}\n"
        );
    }

    #[test]
    fn file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activity.log");
        let sink = FileSink::open(&path).unwrap();
        sink.append("one\n");
        sink.append("two\n");
        drop(sink);

        let reopened = FileSink::open(&path).unwrap();
        reopened.append("three\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
        assert_eq!(reopened.path(), path.as_path());
    }
}
