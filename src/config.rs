// ABOUTME: Configuration loading for wardclaw.
// ABOUTME: Reads ~/.wardclaw/config.toml with serde defaults for every field.

use std::path::PathBuf;

use serde::Deserialize;

use crate::policy::PolicyMode;

/// Governance configuration, loaded once per session and read-only to the
/// engine afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Active policy mode for the session.
    pub policy_mode: PolicyMode,
    /// Extensions mutation targets may have; empty means all are allowed,
    /// and an explicit "" entry admits extensionless files.
    pub allowed_extensions: Vec<String>,
    /// Path prefixes and glob patterns no mutation may touch.
    pub blocked_paths: Vec<String>,
    /// Largest payload a single mutation may carry, in bytes.
    pub max_payload_bytes: usize,
    /// Most disjoint edited regions a single mutation may produce.
    pub max_edits_per_request: usize,
    /// Whether create may replace an existing file when the caller asks.
    pub allow_overwrite: bool,
    /// Globs that auto-approve matching actions (mode permitting).
    pub whitelist_patterns: Vec<String>,
    /// Globs that deny matching actions outright.
    pub blocklist_patterns: Vec<String>,
    /// Deadline for remote approval responses, in seconds.
    pub approval_timeout_seconds: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            policy_mode: PolicyMode::Balanced,
            allowed_extensions: Vec::new(),
            blocked_paths: vec![
                "/etc".to_string(),
                "/boot".to_string(),
                "/dev".to_string(),
                "/proc".to_string(),
                "/sys".to_string(),
            ],
            max_payload_bytes: 1024 * 1024,
            max_edits_per_request: 32,
            allow_overwrite: false,
            whitelist_patterns: Vec::new(),
            blocklist_patterns: Vec::new(),
            approval_timeout_seconds: 120,
        }
    }
}

impl GovernanceConfig {
    /// Load config from ~/.wardclaw/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path (for testing).
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Deadline for remote approvals, as a Duration.
    pub fn approval_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.approval_timeout_seconds)
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wardclaw")
            .join("config.toml")
    }

    /// Path to the persistent approval-pattern store.
    pub fn patterns_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wardclaw")
            .join("approvals.json")
    }

    /// Directory audit session logs are written under.
    pub fn audit_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wardclaw")
            .join("audit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = GovernanceConfig::default();
        assert_eq!(config.policy_mode, PolicyMode::Balanced);
        assert!(config.allowed_extensions.is_empty());
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
        assert_eq!(config.max_edits_per_request, 32);
        assert!(!config.allow_overwrite);
        assert_eq!(config.approval_timeout_seconds, 120);
        assert_eq!(config.approval_timeout(), std::time::Duration::from_secs(120));
        assert!(config.blocked_paths.iter().any(|p| p == "/etc"));
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
policy_mode = "trusting"
allowed_extensions = ["rs", "md", ""]
blocked_paths = ["/etc", "**/.git/**"]
max_payload_bytes = 4096
max_edits_per_request = 8
allow_overwrite = true
whitelist_patterns = ["read_file", "/usr/bin/*"]
blocklist_patterns = ["delete_file"]
approval_timeout_seconds = 30
"#;
        let config: GovernanceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policy_mode, PolicyMode::Trusting);
        assert_eq!(config.allowed_extensions, vec!["rs", "md", ""]);
        assert_eq!(config.max_payload_bytes, 4096);
        assert_eq!(config.max_edits_per_request, 8);
        assert!(config.allow_overwrite);
        assert_eq!(config.whitelist_patterns.len(), 2);
        assert_eq!(config.blocklist_patterns, vec!["delete_file"]);
        assert_eq!(config.approval_timeout_seconds, 30);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml_str = r#"
policy_mode = "paranoid"
"#;
        let config: GovernanceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policy_mode, PolicyMode::Paranoid);
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
        assert!(!config.allow_overwrite);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GovernanceConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.policy_mode, PolicyMode::Balanced);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "policy_mode = \"unrestricted\"\n").unwrap();
        let config = GovernanceConfig::load_from(&path).unwrap();
        assert_eq!(config.policy_mode, PolicyMode::Unrestricted);
    }
}
