// ABOUTME: Glob-based whitelist/blacklist matching and the persistent pattern store.
// ABOUTME: "Always allow" approvals are remembered here as JSON-backed glob entries.

use std::path::Path;

use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

/// Check whether a candidate string matches any pattern in the list.
///
/// Each pattern is compiled as a glob; invalid patterns never match.
pub fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|raw| {
        Pattern::new(raw)
            .map(|p| p.matches(candidate))
            .unwrap_or(false)
    })
}

/// A remembered approval pattern with usage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Glob matched against an action's name or primary target.
    pub pattern: String,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// The candidate string that last matched this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_matched: Option<String>,
}

/// Persistent store of whitelist patterns accumulated from "always allow"
/// approval responses. Serialized to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternStore {
    /// Schema version for forward compatibility.
    pub version: u32,
    #[serde(default)]
    pub whitelist: Vec<PatternEntry>,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self {
            version: 1,
            whitelist: Vec::new(),
        }
    }
}

impl PatternStore {
    /// Load a store from disk. A missing file yields an empty store.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the store, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check whether a candidate is whitelisted, updating usage metadata on
    /// the first entry that matches.
    pub fn is_allowed(&mut self, candidate: &str) -> bool {
        for entry in &mut self.whitelist {
            let hit = Pattern::new(&entry.pattern)
                .map(|p| p.matches(candidate))
                .unwrap_or(false);
            if hit {
                entry.last_used_at = Some(Utc::now());
                entry.last_matched = Some(candidate.to_string());
                return true;
            }
        }
        false
    }

    /// Add a pattern, skipping exact duplicates.
    pub fn add(&mut self, pattern: &str) {
        if self.whitelist.iter().any(|e| e.pattern == pattern) {
            return;
        }
        self.whitelist.push(PatternEntry {
            pattern: pattern.to_string(),
            added_at: Utc::now(),
            last_used_at: None,
            last_matched: None,
        });
    }
}
