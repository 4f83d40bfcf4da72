// ABOUTME: Audit trail — append-only structured events covering every request's lifecycle.
// ABOUTME: The sink is injectable so tests assert on events without touching the filesystem.

pub mod file;

pub use file::FileAuditSink;

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of lifecycle moment an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEventKind {
    /// A request was received.
    Request,
    /// A request was approved (automatically or by a human).
    Approval,
    /// A request was denied, refused, cancelled, or timed out. Terminal.
    Denial,
    /// A request executed and completed. Terminal.
    Result,
    /// A request failed during execution. Terminal.
    Error,
}

impl AuditEventKind {
    /// Terminal kinds close out a request; each request gets exactly one.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denial | Self::Result | Self::Error)
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AuditEventKind,
    pub action_name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, action_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            action_name: action_name.into(),
            summary: summary.into(),
            decision: None,
        }
    }

    pub fn with_decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }
}

/// Append-only event sink. Implementations never reorder or rewrite prior
/// entries; failures are reported to the orchestrator, which must not let
/// them swallow the governed action's own outcome.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// In-memory sink for tests and embedders that export events themselves.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in append order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit lock poisoned").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .expect("audit lock poisoned")
            .push(event.clone());
        Ok(())
    }
}
