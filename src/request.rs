// ABOUTME: Request types — ActionRequest for any governed action, MutationRequest for files.
// ABOUTME: Requests are immutable once built; only the audit trail outlives them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GovernanceError;
use crate::fsops::hash::ContentFingerprint;
use crate::fsops::matcher::MatchTolerance;

/// An agent's request to perform one action, as handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_name: String,
    /// Argument mapping in the order the caller supplied it.
    pub arguments: serde_json::Map<String, Value>,
    pub session_id: String,
    pub requested_at: DateTime<Utc>,
}

impl ActionRequest {
    pub fn new(
        action_name: impl Into<String>,
        arguments: serde_json::Map<String, Value>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            arguments,
            session_id: session_id.into(),
            requested_at: Utc::now(),
        }
    }

    /// Look up a single argument by key.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// One-line description for prompts and audit summaries, with the
    /// argument payload truncated to 80 characters.
    pub fn describe(&self) -> String {
        let args = Value::Object(self.arguments.clone()).to_string();
        let truncated: String = args.chars().take(80).collect();
        if truncated.len() < args.len() {
            format!("{}({}...)", self.action_name, truncated)
        } else {
            format!("{}({})", self.action_name, args)
        }
    }
}

/// File mutation operations the atomic mutator understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum MutationOp {
    /// Replace an inclusive 1-based line range with new text.
    EditLines {
        start_line: usize,
        end_line: usize,
        replacement: String,
    },
    /// Locate `search` via the progressive matcher and replace it.
    SearchReplace {
        search: String,
        replace: String,
        tolerance: MatchTolerance,
    },
    /// Write a new file.
    Create { content: String, overwrite: bool },
    /// Append to the end of an existing file.
    Append { content: String },
    /// Remove the file.
    Delete,
}

/// A file-affecting specialization of `ActionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    pub file_path: PathBuf,
    #[serde(flatten)]
    pub operation: MutationOp,
    /// Optimistic lock: the fingerprint the caller last observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<ContentFingerprint>,
    #[serde(default)]
    pub dry_run: bool,
}

impl MutationRequest {
    /// Build a mutation request from a governed action's name and arguments.
    ///
    /// Returns a validation error when required arguments are missing or the
    /// action is not a file mutation.
    pub fn from_action(request: &ActionRequest) -> Result<Self, GovernanceError> {
        let path = request
            .argument("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GovernanceError::Validation("missing path argument".to_string()))?;

        let str_arg = |key: &str| -> Result<String, GovernanceError> {
            request
                .argument(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    GovernanceError::Validation(format!("missing {key} argument"))
                })
        };

        let operation = match request.action_name.as_str() {
            "create_file" => MutationOp::Create {
                content: str_arg("content")?,
                overwrite: request
                    .argument("overwrite")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
            "append_file" => MutationOp::Append {
                content: str_arg("content")?,
            },
            "edit_file" => {
                let tolerance = request
                    .argument("tolerance")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or(MatchTolerance::Strict);
                MutationOp::SearchReplace {
                    search: str_arg("search")?,
                    replace: str_arg("replace")?,
                    tolerance,
                }
            }
            "edit_lines" => {
                let line = |key: &str| -> Result<usize, GovernanceError> {
                    request
                        .argument(key)
                        .and_then(|v| v.as_u64())
                        .map(|n| n as usize)
                        .ok_or_else(|| {
                            GovernanceError::Validation(format!("missing {key} argument"))
                        })
                };
                MutationOp::EditLines {
                    start_line: line("start_line")?,
                    end_line: line("end_line")?,
                    replacement: str_arg("replacement")?,
                }
            }
            "delete_file" => MutationOp::Delete,
            other => {
                return Err(GovernanceError::Validation(format!(
                    "not a file mutation action: {other}"
                )));
            }
        };

        let expected_hash = request
            .argument("expected_hash")
            .and_then(|v| v.as_str())
            .map(|s| ContentFingerprint::from_hex(s.to_string()));

        Ok(Self {
            file_path: PathBuf::from(path),
            operation,
            expected_hash,
            dry_run: request
                .argument("dry_run")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn describe_truncates_long_arguments() {
        let long = "x".repeat(200);
        let req = ActionRequest::new("create_file", args(json!({"content": long})), "s1");
        let described = req.describe();
        assert!(described.starts_with("create_file("));
        assert!(described.ends_with("...)"));
        assert!(described.len() < 120);
    }

    #[test]
    fn describe_keeps_short_arguments_intact() {
        let req = ActionRequest::new(
            "read_file",
            args(json!({"path": "src/lib.rs"})),
            "s1",
        );
        assert_eq!(req.describe(), r#"read_file({"path":"src/lib.rs"})"#);
    }

    #[test]
    fn arguments_preserve_caller_order() {
        let req = ActionRequest::new(
            "edit_file",
            args(json!({"path": "a.rs", "search": "x", "replace": "y"})),
            "s1",
        );
        let keys: Vec<&String> = req.arguments.keys().collect();
        assert_eq!(keys, ["path", "search", "replace"]);
    }

    #[test]
    fn create_request_parses() {
        let req = ActionRequest::new(
            "create_file",
            args(json!({"path": "new.txt", "content": "hello", "overwrite": true})),
            "s1",
        );
        let mutation = MutationRequest::from_action(&req).unwrap();
        assert_eq!(mutation.file_path, PathBuf::from("new.txt"));
        match mutation.operation {
            MutationOp::Create { content, overwrite } => {
                assert_eq!(content, "hello");
                assert!(overwrite);
            }
            other => panic!("expected Create, got {:?}", other),
        }
    }

    #[test]
    fn edit_file_defaults_to_strict_tolerance() {
        let req = ActionRequest::new(
            "edit_file",
            args(json!({"path": "a.rs", "search": "old", "replace": "new"})),
            "s1",
        );
        let mutation = MutationRequest::from_action(&req).unwrap();
        match mutation.operation {
            MutationOp::SearchReplace { tolerance, .. } => {
                assert_eq!(tolerance, MatchTolerance::Strict);
            }
            other => panic!("expected SearchReplace, got {:?}", other),
        }
    }

    #[test]
    fn edit_file_accepts_explicit_tolerance() {
        let req = ActionRequest::new(
            "edit_file",
            args(json!({
                "path": "a.rs",
                "search": "old",
                "replace": "new",
                "tolerance": "fuzzy"
            })),
            "s1",
        );
        let mutation = MutationRequest::from_action(&req).unwrap();
        match mutation.operation {
            MutationOp::SearchReplace { tolerance, .. } => {
                assert_eq!(tolerance, MatchTolerance::Fuzzy);
            }
            other => panic!("expected SearchReplace, got {:?}", other),
        }
    }

    #[test]
    fn missing_path_is_a_validation_error() {
        let req = ActionRequest::new("delete_file", args(json!({})), "s1");
        let err = MutationRequest::from_action(&req).unwrap_err();
        assert_eq!(err.validation_kind(), Some("missing path argument"));
    }

    #[test]
    fn non_mutation_action_is_rejected() {
        let req = ActionRequest::new(
            "execute_command",
            args(json!({"path": "x", "command": "ls"})),
            "s1",
        );
        assert!(MutationRequest::from_action(&req).is_err());
    }

    #[test]
    fn expected_hash_and_dry_run_parse() {
        let req = ActionRequest::new(
            "delete_file",
            args(json!({"path": "a.txt", "expected_hash": "deadbeef", "dry_run": true})),
            "s1",
        );
        let mutation = MutationRequest::from_action(&req).unwrap();
        assert_eq!(
            mutation.expected_hash.as_ref().map(|h| h.as_str()),
            Some("deadbeef"),
        );
        assert!(mutation.dry_run);
    }
}
