// ABOUTME: Synchronous-interactive approval provider — a y/n prompt on the controlling terminal.
// ABOUTME: The blocking read runs under spawn_blocking so other requests keep flowing.

use async_trait::async_trait;
use std::io::{BufRead, Write};

use super::{ApprovalDecision, ApprovalPrompt, ApprovalProvider, ApprovalResponse};

/// Provider that asks on stdin/stderr and blocks the asking human, not the
/// runtime. Anything that isn't an explicit yes is a denial.
#[derive(Default)]
pub struct InteractiveProvider;

impl InteractiveProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Parse a typed answer. `y`/`yes` allow once, `a`/`always` allow and
/// remember, everything else (including EOF and typos) denies.
pub fn parse_answer(input: &str) -> ApprovalDecision {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::AllowOnce,
        "a" | "always" => ApprovalDecision::AllowAlways,
        _ => ApprovalDecision::Deny,
    }
}

#[async_trait]
impl ApprovalProvider for InteractiveProvider {
    async fn request_approval(&self, prompt: ApprovalPrompt) -> ApprovalResponse {
        let decision = tokio::task::spawn_blocking(move || {
            let stderr = std::io::stderr();
            let mut err = stderr.lock();
            let _ = writeln!(err, "approval required: {}", prompt.description);
            let _ = writeln!(err, "risk: {}", prompt.risk_label);
            if let Some(preview) = &prompt.preview {
                let _ = writeln!(err, "{preview}");
            }
            let _ = write!(err, "allow? [y]es / [a]lways / [n]o: ");
            let _ = err.flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => ApprovalDecision::Deny,
                Ok(_) => parse_answer(&line),
            }
        })
        .await
        .unwrap_or(ApprovalDecision::Deny);

        ApprovalResponse::from_decision(decision)
    }
}
