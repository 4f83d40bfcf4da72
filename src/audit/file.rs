// ABOUTME: JSONL audit sink — one timestamped file per session directory.
// ABOUTME: Each event is a single flushed line, readable by external tooling.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use super::{AuditEvent, AuditSink};

/// Appends audit events as JSONL lines to a per-session log file.
pub struct FileAuditSink {
    writer: Mutex<BufWriter<File>>,
    pub log_path: PathBuf,
}

impl FileAuditSink {
    /// Create a sink writing under `<audit_dir>/<session_id>/`, in a new
    /// file named with the current UTC timestamp.
    pub fn new(audit_dir: &Path, session_id: &str) -> anyhow::Result<Self> {
        let session_dir = audit_dir.join(session_id);
        fs::create_dir_all(&session_dir)?;
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let log_path = session_dir.join(format!("{timestamp}.jsonl"));
        let writer = BufWriter::new(File::create(&log_path)?);
        Ok(Self {
            writer: Mutex::new(writer),
            log_path,
        })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().expect("audit writer lock poisoned");
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventKind;

    #[test]
    fn sink_writes_one_json_line_per_event() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(tmp.path(), "session-1").unwrap();

        sink.append(&AuditEvent::new(
            AuditEventKind::Request,
            "read_file",
            "received",
        ))
        .unwrap();
        sink.append(
            &AuditEvent::new(AuditEventKind::Result, "read_file", "completed")
                .with_decision("auto-approve"),
        )
        .unwrap();

        let content = fs::read_to_string(&sink.log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("timestamp").is_some());
            assert!(parsed.get("kind").is_some());
            assert_eq!(parsed["action_name"], "read_file");
        }
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[1]).unwrap()["decision"],
            "auto-approve",
        );
    }

    #[test]
    fn sink_creates_session_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(tmp.path(), "nested-session").unwrap();
        assert!(sink.log_path.starts_with(tmp.path().join("nested-session")));
        assert!(sink.log_path.exists());
    }

    #[test]
    fn events_roundtrip_through_jsonl() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(tmp.path(), "rt").unwrap();
        let event = AuditEvent::new(AuditEventKind::Denial, "delete_file", "refused")
            .with_decision("deny");
        sink.append(&event).unwrap();

        let content = fs::read_to_string(&sink.log_path).unwrap();
        let parsed: AuditEvent = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.kind, AuditEventKind::Denial);
        assert_eq!(parsed.action_name, "delete_file");
        assert_eq!(parsed.decision.as_deref(), Some("deny"));
    }
}
