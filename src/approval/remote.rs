// ABOUTME: Asynchronous-remote approval provider — a channel transport with a deadline.
// ABOUTME: No answer within the timeout is treated as denial, never as consent.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::GovernanceError;

use super::{ApprovalDecision, ApprovalPrompt, ApprovalProvider, ApprovalResponse, PendingApproval};

/// Provider for approvals answered by an external system (a phone prompt,
/// a review bot, a web dashboard). The transport task owns the far side of
/// the channel; this side only waits, bounded by the configured timeout.
pub struct RemoteProvider {
    tx: mpsc::Sender<PendingApproval>,
    timeout: Duration,
}

impl RemoteProvider {
    /// Create a provider and the receiver the transport task should drain.
    pub fn new(buffer: usize, timeout: Duration) -> (Self, mpsc::Receiver<PendingApproval>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx, timeout }, rx)
    }
}

#[async_trait]
impl ApprovalProvider for RemoteProvider {
    async fn request_approval(&self, prompt: ApprovalPrompt) -> ApprovalResponse {
        let (responder, rx) = oneshot::channel();
        if self
            .tx
            .send(PendingApproval { prompt, responder })
            .await
            .is_err()
        {
            return ApprovalResponse::denied("approval transport closed");
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(decision)) => ApprovalResponse::from_decision(decision),
            Ok(Err(_)) => ApprovalResponse::denied("approval request abandoned"),
            Err(_) => ApprovalResponse::denied(GovernanceError::ApprovalTimeout.to_string()),
        }
    }
}
