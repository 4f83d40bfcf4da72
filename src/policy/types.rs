// ABOUTME: Core types for the governance policy layer.
// ABOUTME: RiskLevel, PolicyMode, DecisionOutcome, and PolicyDecision.

use serde::{Deserialize, Serialize};

/// Severity classification of a requested action, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only or otherwise harmless.
    Safe,
    /// Mutating but routine (file writes, edits).
    Caution,
    /// Destructive or privilege-affecting (deletes, superuser escalation).
    Dangerous,
    /// Never executed, regardless of policy mode.
    Blocked,
}

impl RiskLevel {
    /// Human-readable label shown in approval prompts.
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe (read-only)",
            RiskLevel::Caution => "caution (mutating)",
            RiskLevel::Dangerous => "dangerous (destructive)",
            RiskLevel::Blocked => "blocked",
        }
    }
}

/// Session-wide stance controlling how much risk is auto-approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Every action requires approval, whitelisted or not.
    Paranoid,
    /// Auto-approve only safe actions.
    Balanced,
    /// Auto-approve safe and caution-level actions.
    Trusting,
    /// Auto-approve everything except blocked actions.
    Unrestricted,
}

impl Default for PolicyMode {
    fn default() -> Self {
        PolicyMode::Balanced
    }
}

/// What the policy resolver decided for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionOutcome {
    /// Proceed without asking anyone.
    AutoApprove,
    /// A human (or external system) must approve first.
    RequireApproval,
    /// Refuse outright.
    Deny,
}

/// A resolved decision with its reason, derived deterministically from
/// risk level, policy mode, and whitelist/blacklist status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub outcome: DecisionOutcome,
    pub reason: String,
}

impl PolicyDecision {
    pub fn new(outcome: DecisionOutcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
        }
    }
}
