// ABOUTME: Error taxonomy for the governance engine.
// ABOUTME: Distinguishes recoverable validation/match failures from concurrency and IO faults.

use thiserror::Error;

/// Errors surfaced by the governance engine and its file-mutation core.
///
/// Validation and match errors are recoverable by the caller with fresh
/// input; they are never retried automatically. `ConcurrentModification`
/// requires the caller to re-read the file and recompute its request.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The request failed a pre-execution check (path, extension, size,
    /// existence). The kind string is stable and matchable: "path traversal",
    /// "blocked path", "not a file", "extension not allowed",
    /// "payload too large", "exists", "line range out of bounds",
    /// "too many edits".
    #[error("validation failed: {0}")]
    Validation(String),

    /// The file changed between the caller's read and this write attempt.
    #[error("file changed since read (expected {expected}, found {actual}); re-read and retry")]
    ConcurrentModification { expected: String, actual: String },

    /// The search block matched more than one location.
    #[error("search block matched {count} locations; provide more context to disambiguate")]
    AmbiguousMatch { count: usize },

    /// The search block matched nowhere, even under the requested tolerance.
    #[error("search block not found")]
    NoMatch { suggestions: Vec<String> },

    /// The policy resolver denied the request. An expected business outcome,
    /// not an exceptional one.
    #[error("denied by policy: {0}")]
    PolicyDenied(String),

    /// An approval provider gave no answer within its deadline.
    #[error("approval timed out")]
    ApprovalTimeout,

    /// No executor is registered for the requested action.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Filesystem failure from the mutator or audit logger. Fatal for the
    /// current request only; the orchestrator stays up.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GovernanceError {
    /// The stable validation kind, if this is a validation failure.
    pub fn validation_kind(&self) -> Option<&str> {
        match self {
            Self::Validation(kind) => Some(kind.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_kind_is_exposed() {
        let err = GovernanceError::Validation("exists".to_string());
        assert_eq!(err.validation_kind(), Some("exists"));
        assert_eq!(err.to_string(), "validation failed: exists");
    }

    #[test]
    fn non_validation_has_no_kind() {
        let err = GovernanceError::ApprovalTimeout;
        assert_eq!(err.validation_kind(), None);
    }

    #[test]
    fn concurrent_modification_names_both_hashes() {
        let err = GovernanceError::ConcurrentModification {
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("def"));
        assert!(msg.contains("re-read"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: GovernanceError = io.into();
        assert!(matches!(err, GovernanceError::Io(_)));
    }
}
