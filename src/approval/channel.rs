// ABOUTME: Modal-UI approval provider — forwards prompts over a channel with a oneshot responder.
// ABOUTME: The UI task answers at its leisure; a dropped responder counts as denial.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::{ApprovalDecision, ApprovalPrompt, ApprovalProvider, ApprovalResponse};

/// A prompt in flight to the UI, paired with the channel to answer it on.
pub struct PendingApproval {
    pub prompt: ApprovalPrompt,
    pub responder: oneshot::Sender<ApprovalDecision>,
}

/// Provider that suspends the requesting task until a UI event answers.
///
/// The receiving side (a TUI, an editor plugin, a web socket pump) drains
/// `PendingApproval`s and fires each responder exactly once.
pub struct ChannelProvider {
    tx: mpsc::Sender<PendingApproval>,
}

impl ChannelProvider {
    /// Create a provider and the receiver the UI task should drain.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingApproval>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ApprovalProvider for ChannelProvider {
    async fn request_approval(&self, prompt: ApprovalPrompt) -> ApprovalResponse {
        let (responder, rx) = oneshot::channel();
        if self
            .tx
            .send(PendingApproval { prompt, responder })
            .await
            .is_err()
        {
            return ApprovalResponse::denied("approval channel closed");
        }

        match rx.await {
            Ok(decision) => ApprovalResponse::from_decision(decision),
            // The UI dropped the responder without answering.
            Err(_) => ApprovalResponse::denied("approval request abandoned"),
        }
    }
}
