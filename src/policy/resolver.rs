// ABOUTME: Policy resolution — the pure decision function at the heart of the engine.
// ABOUTME: Maps (RiskLevel, PolicyMode, whitelist/blacklist status) to a PolicyDecision.

use super::types::{DecisionOutcome, PolicyDecision, PolicyMode, RiskLevel};

/// Resolve the policy decision for a classified request.
///
/// Pure and total: every input combination maps to exactly one outcome.
/// Rule order matters — blacklist and blocked-risk checks run before any
/// allowance can apply, and a whitelist match never auto-approves a
/// dangerous action (only `Unrestricted` mode can do that).
pub fn resolve(
    risk: RiskLevel,
    mode: PolicyMode,
    whitelisted: bool,
    blacklisted: bool,
) -> PolicyDecision {
    // Rule 1: blacklist wins over everything, including Unrestricted mode.
    if blacklisted {
        return PolicyDecision::new(DecisionOutcome::Deny, "matched blocklist pattern");
    }

    // Rule 2: blocked risk never executes.
    if risk == RiskLevel::Blocked {
        return PolicyDecision::new(DecisionOutcome::Deny, "action risk is blocked");
    }

    // Rule 3: a whitelist match short-circuits the mode table, except under
    // Paranoid (which always asks) and except for dangerous actions.
    if whitelisted && mode != PolicyMode::Paranoid && risk < RiskLevel::Dangerous {
        return PolicyDecision::new(DecisionOutcome::AutoApprove, "matched whitelist pattern");
    }

    // Rule 4: the mode table.
    let auto = match mode {
        PolicyMode::Paranoid => false,
        PolicyMode::Balanced => risk == RiskLevel::Safe,
        PolicyMode::Trusting => risk <= RiskLevel::Caution,
        PolicyMode::Unrestricted => true,
    };

    if auto {
        PolicyDecision::new(
            DecisionOutcome::AutoApprove,
            format!("{} auto-approved under {:?} mode", risk.label(), mode),
        )
    } else {
        PolicyDecision::new(
            DecisionOutcome::RequireApproval,
            format!("{} requires approval under {:?} mode", risk.label(), mode),
        )
    }
}
