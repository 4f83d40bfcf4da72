// ABOUTME: Atomic mutator — applies file mutations with optimistic locking and tmp+rename commit.
// ABOUTME: Readers observe either the old or the fully new content, never a partial write.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::request::{MutationOp, MutationRequest};

use super::diff::{DiffPreview, diff_preview};
use super::hash::{ContentFingerprint, fingerprint};
use super::matcher::{MatchResult, MatchTolerance, find, reindent_replacement};
use super::validate::{validate_payload, validate_target};

/// What a successful mutation produced.
#[derive(Debug)]
pub struct MutationOutcome {
    /// Bytes committed to disk; zero for dry runs.
    pub bytes_written: u64,
    /// Fingerprint of the content on disk after the call: the new content
    /// for committed writes, the unchanged current content for dry runs,
    /// and `None` once a file has been deleted.
    pub fingerprint: Option<ContentFingerprint>,
    pub preview: DiffPreview,
    pub dry_run: bool,
    /// For deletes: the removed file's absolute path and deletion time.
    pub deleted: Option<(PathBuf, DateTime<Utc>)>,
}

/// Apply a mutation request.
///
/// Read → fingerprint → optimistic-lock check → compute new content →
/// enforce the edit cap → dry-run short-circuit → tmp write + atomic rename.
/// The optimistic-lock check runs before any content work, so a stale
/// `expected_hash` fails with the target byte-identical to its prior state.
pub fn mutate(
    request: &MutationRequest,
    config: &GovernanceConfig,
) -> Result<MutationOutcome, GovernanceError> {
    let path = &request.file_path;
    validate_target(path, config)?;

    let label = path.to_string_lossy().into_owned();
    let exists = path.exists();

    if let MutationOp::Create { overwrite, .. } = &request.operation {
        if exists && !(*overwrite && config.allow_overwrite) {
            return Err(GovernanceError::Validation("exists".to_string()));
        }
    }

    // Delete needs the real file type, not just existence.
    if matches!(request.operation, MutationOp::Delete) {
        let meta = fs::metadata(path)
            .map_err(|_| GovernanceError::Validation("not a file".to_string()))?;
        if !meta.is_file() {
            return Err(GovernanceError::Validation("not a file".to_string()));
        }
    }

    let old_content = if exists {
        fs::read_to_string(path)?
    } else if matches!(request.operation, MutationOp::Create { .. }) {
        String::new()
    } else {
        return Err(GovernanceError::Validation("not a file".to_string()));
    };

    let current = fingerprint(old_content.as_bytes());
    if let Some(expected) = &request.expected_hash {
        if *expected != current {
            return Err(GovernanceError::ConcurrentModification {
                expected: expected.as_str().to_string(),
                actual: current.as_str().to_string(),
            });
        }
    }

    let new_content = match &request.operation {
        MutationOp::Delete => String::new(),
        op => apply_operation(&old_content, op, config)?,
    };

    let preview = diff_preview(&label, &old_content, &new_content);
    if preview.edit_count() > config.max_edits_per_request {
        return Err(GovernanceError::Validation("too many edits".to_string()));
    }

    if request.dry_run {
        return Ok(MutationOutcome {
            bytes_written: 0,
            fingerprint: Some(current),
            preview,
            dry_run: true,
            deleted: None,
        });
    }

    if matches!(request.operation, MutationOp::Delete) {
        let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
        fs::remove_file(path)?;
        return Ok(MutationOutcome {
            bytes_written: 0,
            fingerprint: None,
            preview,
            dry_run: false,
            deleted: Some((absolute, Utc::now())),
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Sibling tmp file in the same directory, then rename over the target:
    // the commit is the rename, which is atomic on POSIX filesystems.
    let tmp_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{name}.tmp"),
        None => return Err(GovernanceError::Validation("not a file".to_string())),
    };
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, &new_content)?;
    fs::rename(&tmp_path, path)?;

    Ok(MutationOutcome {
        bytes_written: new_content.len() as u64,
        fingerprint: Some(fingerprint(new_content.as_bytes())),
        preview,
        dry_run: false,
        deleted: None,
    })
}

/// Compute the new file content for a non-delete operation.
fn apply_operation(
    old: &str,
    op: &MutationOp,
    config: &GovernanceConfig,
) -> Result<String, GovernanceError> {
    match op {
        MutationOp::Create { content, .. } => {
            validate_payload(content.len(), config)?;
            Ok(content.clone())
        }
        MutationOp::Append { content } => {
            validate_payload(content.len(), config)?;
            Ok(format!("{old}{content}"))
        }
        MutationOp::EditLines {
            start_line,
            end_line,
            replacement,
        } => {
            validate_payload(replacement.len(), config)?;
            splice_lines(old, *start_line, *end_line, replacement)
        }
        MutationOp::SearchReplace {
            search,
            replace,
            tolerance,
        } => {
            validate_payload(replace.len(), config)?;
            search_and_replace(old, search, replace, *tolerance)
        }
        MutationOp::Delete => unreachable!("delete handled by the caller"),
    }
}

/// Replace an inclusive 1-based line range with new text.
fn splice_lines(
    old: &str,
    start_line: usize,
    end_line: usize,
    replacement: &str,
) -> Result<String, GovernanceError> {
    let lines: Vec<&str> = old.lines().collect();
    if start_line == 0 || start_line > end_line || end_line > lines.len() {
        return Err(GovernanceError::Validation(
            "line range out of bounds".to_string(),
        ));
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend(&lines[..start_line - 1]);
    out.extend(replacement.lines());
    out.extend(&lines[end_line..]);

    let mut text = out.join("\n");
    if old.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

fn search_and_replace(
    old: &str,
    search: &str,
    replace: &str,
    tolerance: MatchTolerance,
) -> Result<String, GovernanceError> {
    match find(old, search, tolerance) {
        MatchResult::Found { range, warning, .. } => {
            if let Some(warning) = warning {
                tracing::warn!("{warning}");
            }
            let replacement = match tolerance {
                MatchTolerance::Strict => replace.to_string(),
                MatchTolerance::Whitespace | MatchTolerance::Fuzzy => {
                    reindent_replacement(old, &range, search, replace)
                }
            };
            let mut text = String::with_capacity(old.len() + replacement.len());
            text.push_str(&old[..range.start]);
            text.push_str(&replacement);
            text.push_str(&old[range.end..]);
            Ok(text)
        }
        MatchResult::Ambiguous { ranges } => Err(GovernanceError::AmbiguousMatch {
            count: ranges.len(),
        }),
        MatchResult::NotFound { suggestions } => Err(GovernanceError::NoMatch { suggestions }),
    }
}
