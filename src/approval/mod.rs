// ABOUTME: Polymorphic approval capability — how a human or external system says yes or no.
// ABOUTME: Providers only answer; the orchestrator alone executes, after exactly one response.

pub mod channel;
pub mod interactive;
pub mod remote;

pub use channel::{ChannelProvider, PendingApproval};
pub use interactive::InteractiveProvider;
pub use remote::RemoteProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a provider shows the approver: the action, a human-readable risk
/// label, a one-line description, and an optional diff preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalPrompt {
    pub action_name: String,
    pub risk_label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// The approver's decision as surfaced by UI-facing providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Allow this one request.
    AllowOnce,
    /// Allow and remember a whitelist pattern for future requests.
    AllowAlways,
    /// Refuse this request.
    Deny,
}

/// A human/external decision on one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether the approver asked for this decision to be remembered.
    #[serde(default)]
    pub remember: bool,
    pub responded_at: DateTime<Utc>,
}

impl ApprovalResponse {
    pub fn approved(remember: bool) -> Self {
        Self {
            approved: true,
            reason: None,
            remember,
            responded_at: Utc::now(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
            remember: false,
            responded_at: Utc::now(),
        }
    }

    pub fn from_decision(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::AllowOnce => Self::approved(false),
            ApprovalDecision::AllowAlways => Self::approved(true),
            ApprovalDecision::Deny => Self::denied("denied by approver"),
        }
    }
}

/// The approval capability. Implementations obtain exactly one decision per
/// call and must be idempotent-safe: asking twice never executes anything,
/// because providers never execute at all.
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    async fn request_approval(&self, prompt: ApprovalPrompt) -> ApprovalResponse;
}
