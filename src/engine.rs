// ABOUTME: Governance orchestrator — classify, resolve policy, mediate approval, execute, audit.
// ABOUTME: Each request is an independent unit of work; one terminal audit event per request.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::approval::{ApprovalPrompt, ApprovalProvider, ApprovalResponse};
use crate::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::fsops::{DiffPreview, mutate};
use crate::policy::{
    EXECUTE_COMMAND_ACTION, PatternStore, PolicyDecision, RiskLevel, analyze_command, classify,
    command_target, matches_any, resolve,
};
use crate::request::{ActionRequest, MutationRequest};

/// Lifecycle states of a governed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Classified,
    PolicyResolved,
    ApprovalPending,
    Executing,
    Completed,
    Denied,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Denied | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Classified)
                | (Classified, PolicyResolved)
                | (PolicyResolved, ApprovalPending)
                | (PolicyResolved, Executing)
                | (PolicyResolved, Denied)
                | (ApprovalPending, Executing)
                | (ApprovalPending, Denied)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

fn advance(state: &mut RequestState, next: RequestState) {
    debug_assert!(
        state.can_transition(next),
        "illegal transition {:?} -> {:?}",
        state,
        next,
    );
    *state = next;
}

/// What an executor produced for a completed action.
#[derive(Debug)]
pub struct ExecutionOutput {
    /// Human-readable result text, returned to the requesting agent.
    pub content: String,
    /// Diff preview for file-affecting actions.
    pub preview: Option<DiffPreview>,
}

/// An action implementation the orchestrator can delegate to after a
/// request clears policy and approval.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> Result<ExecutionOutput, GovernanceError>;

    /// Optional preview (a diff, a plan) shown in the approval prompt.
    fn preview(&self, _request: &ActionRequest) -> Option<String> {
        None
    }
}

/// Registry mapping action names to executors.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn register(&mut self, names: &[&str], executor: Arc<dyn ActionExecutor>) {
        for name in names {
            self.executors.insert(name.to_string(), executor.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.executors.get(name).cloned()
    }
}

/// Action names routed to the built-in mutation executor.
pub const MUTATION_ACTIONS: &[&str] = &[
    "create_file",
    "edit_file",
    "edit_lines",
    "append_file",
    "delete_file",
];

/// Built-in executor wrapping the atomic mutator.
pub struct MutationExecutor {
    config: GovernanceConfig,
}

impl MutationExecutor {
    pub fn new(config: GovernanceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ActionExecutor for MutationExecutor {
    async fn execute(&self, request: &ActionRequest) -> Result<ExecutionOutput, GovernanceError> {
        let mutation = MutationRequest::from_action(request)?;
        let outcome = mutate(&mutation, &self.config)?;

        let content = if let Some((path, when)) = &outcome.deleted {
            format!("Deleted '{}' at {}", path.display(), when.to_rfc3339())
        } else if outcome.dry_run {
            format!(
                "Dry run: {} region(s) would change\n\n{}",
                outcome.preview.edit_count(),
                outcome.preview.unified_text,
            )
        } else {
            format!(
                "Wrote {} bytes to '{}'\n\n{}",
                outcome.bytes_written,
                mutation.file_path.display(),
                outcome.preview.unified_text,
            )
        };

        Ok(ExecutionOutput {
            content,
            preview: Some(outcome.preview),
        })
    }

    fn preview(&self, request: &ActionRequest) -> Option<String> {
        let mut mutation = MutationRequest::from_action(request).ok()?;
        mutation.dry_run = true;
        let outcome = mutate(&mutation, &self.config).ok()?;
        Some(outcome.preview.unified_text)
    }
}

/// The result of governing one request, returned to the caller after the
/// terminal audit event is written.
#[derive(Debug)]
pub struct GovernanceReport {
    pub state: RequestState,
    pub risk: RiskLevel,
    pub decision: PolicyDecision,
    pub approval: Option<ApprovalResponse>,
    pub output: Option<ExecutionOutput>,
    pub error: Option<String>,
}

/// Orchestrator tying together classification, policy, approval, execution,
/// and the audit trail.
pub struct GovernanceEngine {
    config: GovernanceConfig,
    provider: Arc<dyn ApprovalProvider>,
    audit: Arc<dyn AuditSink>,
    executors: ExecutorRegistry,
    store: Mutex<PatternStore>,
    store_path: Option<PathBuf>,
}

impl GovernanceEngine {
    /// Create an engine with the built-in mutation executor registered.
    pub fn new(
        config: GovernanceConfig,
        provider: Arc<dyn ApprovalProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let mut executors = ExecutorRegistry::default();
        executors.register(
            MUTATION_ACTIONS,
            Arc::new(MutationExecutor::new(config.clone())),
        );
        Self {
            config,
            provider,
            audit,
            executors,
            store: Mutex::new(PatternStore::default()),
            store_path: None,
        }
    }

    /// Attach a persistent pattern store; "always allow" approvals are
    /// appended to it and saved to `path`.
    pub fn with_pattern_store(mut self, store: PatternStore, path: PathBuf) -> Self {
        self.store = Mutex::new(store);
        self.store_path = Some(path);
        self
    }

    /// Register an executor for additional action names.
    pub fn register_executor(&mut self, names: &[&str], executor: Arc<dyn ActionExecutor>) {
        self.executors.register(names, executor);
    }

    /// Govern a request to its terminal state.
    pub async fn govern(&self, request: ActionRequest) -> GovernanceReport {
        self.run(request, None).await
    }

    /// Govern a request with a cancellation handle. Firing the handle while
    /// the request awaits approval denies it with reason "cancelled"; it is
    /// never executed after cancellation is observed.
    pub async fn govern_with_cancel(
        &self,
        request: ActionRequest,
        cancel: oneshot::Receiver<()>,
    ) -> GovernanceReport {
        self.run(request, Some(cancel)).await
    }

    async fn run(
        &self,
        request: ActionRequest,
        mut cancel: Option<oneshot::Receiver<()>>,
    ) -> GovernanceReport {
        let action = request.action_name.clone();
        let mut state = RequestState::Received;
        self.record(AuditEvent::new(
            AuditEventKind::Request,
            &action,
            request.describe(),
        ));

        let risk = classify(&request);
        advance(&mut state, RequestState::Classified);

        let target = primary_target(&request);
        let whitelisted = self.is_whitelisted(&action, target.as_deref());
        let blacklisted = self.is_blacklisted(&action, target.as_deref());
        let decision = resolve(risk, self.config.policy_mode, whitelisted, blacklisted);
        advance(&mut state, RequestState::PolicyResolved);

        let mut report = GovernanceReport {
            state,
            risk,
            decision: decision.clone(),
            approval: None,
            output: None,
            error: None,
        };

        match decision.outcome {
            crate::policy::DecisionOutcome::Deny => {
                self.record(
                    AuditEvent::new(AuditEventKind::Denial, &action, decision.reason.clone())
                        .with_decision("deny"),
                );
                advance(&mut state, RequestState::Denied);
                report.state = state;
                return report;
            }
            crate::policy::DecisionOutcome::RequireApproval => {
                advance(&mut state, RequestState::ApprovalPending);

                let prompt = ApprovalPrompt {
                    action_name: action.clone(),
                    risk_label: risk.label().to_string(),
                    description: request.describe(),
                    preview: self
                        .executors
                        .get(&action)
                        .and_then(|executor| executor.preview(&request)),
                };

                match self.await_approval(prompt, cancel.take()).await {
                    Waited::Cancelled => {
                        self.record(
                            AuditEvent::new(AuditEventKind::Denial, &action, "cancelled")
                                .with_decision("deny"),
                        );
                        advance(&mut state, RequestState::Denied);
                        report.state = state;
                        return report;
                    }
                    Waited::Response(response) if !response.approved => {
                        let reason = response
                            .reason
                            .clone()
                            .unwrap_or_else(|| "denied".to_string());
                        self.record(
                            AuditEvent::new(AuditEventKind::Denial, &action, reason)
                                .with_decision("deny"),
                        );
                        advance(&mut state, RequestState::Denied);
                        report.state = state;
                        report.approval = Some(response);
                        return report;
                    }
                    Waited::Response(response) => {
                        self.record(
                            AuditEvent::new(AuditEventKind::Approval, &action, "approved")
                                .with_decision("approve"),
                        );
                        if response.remember {
                            self.remember(target.as_deref().unwrap_or(&action));
                        }
                        report.approval = Some(response);
                    }
                }
            }
            crate::policy::DecisionOutcome::AutoApprove => {
                self.record(
                    AuditEvent::new(AuditEventKind::Approval, &action, decision.reason.clone())
                        .with_decision("auto-approve"),
                );
            }
        }

        advance(&mut state, RequestState::Executing);
        let result = match self.executors.get(&action) {
            Some(executor) => executor.execute(&request).await,
            None => Err(GovernanceError::UnknownAction(action.clone())),
        };

        match result {
            Ok(output) => {
                self.record(
                    AuditEvent::new(AuditEventKind::Result, &action, "completed")
                        .with_decision("approve"),
                );
                advance(&mut state, RequestState::Completed);
                report.output = Some(output);
            }
            Err(err) => {
                // The error text reaches the audit trail verbatim.
                self.record(AuditEvent::new(
                    AuditEventKind::Error,
                    &action,
                    err.to_string(),
                ));
                advance(&mut state, RequestState::Failed);
                report.error = Some(err.to_string());
            }
        }

        report.state = state;
        report
    }

    async fn await_approval(
        &self,
        prompt: ApprovalPrompt,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> Waited {
        let fut = self.provider.request_approval(prompt);
        tokio::pin!(fut);

        match cancel {
            Some(mut cancel_rx) => {
                tokio::select! {
                    response = &mut fut => Waited::Response(response),
                    result = &mut cancel_rx => {
                        if result.is_ok() {
                            Waited::Cancelled
                        } else {
                            // The cancel handle was dropped, not fired; keep
                            // waiting for the provider.
                            Waited::Response(fut.await)
                        }
                    }
                }
            }
            None => Waited::Response(fut.await),
        }
    }

    fn is_whitelisted(&self, action: &str, target: Option<&str>) -> bool {
        let config_hit = matches_any(&self.config.whitelist_patterns, action)
            || target.is_some_and(|t| matches_any(&self.config.whitelist_patterns, t));
        if config_hit {
            return true;
        }
        let mut store = self.store.lock().expect("pattern store lock poisoned");
        store.is_allowed(action) || target.is_some_and(|t| store.is_allowed(t))
    }

    fn is_blacklisted(&self, action: &str, target: Option<&str>) -> bool {
        matches_any(&self.config.blocklist_patterns, action)
            || target.is_some_and(|t| matches_any(&self.config.blocklist_patterns, t))
    }

    /// Persist an "always allow" pattern. Save failures are diagnostic only.
    fn remember(&self, pattern: &str) {
        let mut store = self.store.lock().expect("pattern store lock poisoned");
        store.add(pattern);
        if let Some(path) = &self.store_path {
            if let Err(err) = store.save(path) {
                tracing::warn!("failed to persist approval pattern: {err}");
            }
        }
    }

    fn record(&self, event: AuditEvent) {
        if let Err(err) = self.audit.append(&event) {
            // Audit failure never suppresses the action's own outcome.
            tracing::warn!("audit append failed: {err}");
        }
    }
}

enum Waited {
    Response(ApprovalResponse),
    Cancelled,
}

/// The string whitelist/blacklist patterns are matched against, besides the
/// action name: the resolved executable for commands, the path for mutations.
fn primary_target(request: &ActionRequest) -> Option<String> {
    if request.action_name == EXECUTE_COMMAND_ACTION {
        let command = request.argument("command").and_then(|v| v.as_str())?;
        return command_target(&analyze_command(command));
    }
    request
        .argument("path")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
