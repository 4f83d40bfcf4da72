// ABOUTME: Path and payload validation run before any mutation touches disk.
// ABOUTME: Checks run in a fixed order: cheaper, more dangerous failures first.

use std::path::{Component, Path, PathBuf};

use glob::Pattern;

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;

/// Validate a mutation target path against the governance config.
///
/// Check order is load-bearing: traversal rejection before symlink
/// resolution, blocked-path rejection before type and extension checks.
/// Pure apart from filesystem reads; deterministic given the same config.
pub fn validate_target(path: &Path, config: &GovernanceConfig) -> Result<(), GovernanceError> {
    // 1. Parent-directory traversal segments are rejected outright, before
    //    any resolution could normalize them away.
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(GovernanceError::Validation("path traversal".to_string()));
    }

    // 2. Resolve symlinks to the real target, then test blocked prefixes and
    //    globs against what the path actually points at.
    let resolved = resolve_real_path(path);
    if is_blocked(&resolved, &config.blocked_paths) || is_blocked(path, &config.blocked_paths) {
        return Err(GovernanceError::Validation("blocked path".to_string()));
    }

    // 3. Mutation targets must be regular files.
    if resolved.is_dir() {
        return Err(GovernanceError::Validation("not a file".to_string()));
    }

    // 4. Extension allowlist; empty means all extensions are allowed, and an
    //    explicit "" entry admits extensionless files.
    if !config.allowed_extensions.is_empty() {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let allowed = config
            .allowed_extensions
            .iter()
            .any(|a| a.to_lowercase() == ext);
        if !allowed {
            return Err(GovernanceError::Validation(
                "extension not allowed".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate a payload's byte length against the config cap.
pub fn validate_payload(len: usize, config: &GovernanceConfig) -> Result<(), GovernanceError> {
    if len > config.max_payload_bytes {
        return Err(GovernanceError::Validation("payload too large".to_string()));
    }
    Ok(())
}

/// Canonicalize as much of the path as exists, so symlinked targets and
/// symlinked parents of not-yet-created files both resolve.
fn resolve_real_path(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Ok(real_parent) = parent.canonicalize() {
            return real_parent.join(name);
        }
    }
    path.to_path_buf()
}

/// Test a path against blocked prefixes and glob patterns.
fn is_blocked(path: &Path, blocked: &[String]) -> bool {
    blocked.iter().any(|entry| {
        if path.starts_with(entry) {
            return true;
        }
        Pattern::new(entry)
            .map(|p| p.matches_path(path))
            .unwrap_or(false)
    })
}
