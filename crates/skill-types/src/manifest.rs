use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A skill's position in its lifecycle, as tracked by the Kernel.
///
/// Transitions only move forward except `loaded -> unloaded` (eviction)
/// and `unloaded -> scanned` (stale reload after a `file.changed` event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Referenced (e.g. in a manifest) but not yet found on disk.
    Unknown,
    /// Found by the Scanner, not yet parsed.
    Discovered,
    /// Parsed; its `ToolRecord`s are known.
    Scanned,
    /// Passed (or explicitly failed) the Security Gate.
    Gated,
    /// Resident in `SkillContext`'s loaded-skill map.
    Loaded,
    /// Evicted from `SkillContext`, either by LRU/TTL or explicit unload.
    Unloaded,
}

/// The runtime a skill declares it needs to execute under.
///
/// `Native` is the only variant this kernel actually executes; `Wasm` and
/// `Docker` are kept as recognized enum members purely so manifests
/// authored for a different runtime still parse instead of failing
/// deserialization outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillRuntime {
    /// Direct native command execution (script or compiled binary).
    #[default]
    Native,
    /// WASM Component Model — recognized, never executed.
    Wasm,
    /// Docker container — recognized, never executed.
    Docker,
}

/// A skill's manifest, as read from `skill.toml`/`SKILL.md` front matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    /// Skill name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Author or organization.
    #[serde(default)]
    pub author: String,
    /// Declared runtime (defaults to `Native`).
    #[serde(default)]
    pub runtime: SkillRuntime,
    /// Declared permissions (`exec`, `shell`, `filesystem`, `network`).
    #[serde(default)]
    pub permissions: HashMap<String, serde_json::Value>,
    /// Glob patterns of commands this skill is allowed to invoke; an
    /// entry prefixed with `!` is an allow-exception carved out of an
    /// otherwise-denying pattern, consumed by the Executor's
    /// filter-commands step.
    #[serde(default)]
    pub filter_commands: Vec<String>,
}

impl SkillManifest {
    /// Reads and parses a manifest from its serialized TOML form.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Severity tier of a security finding, shared by the static scanner and
/// the manifest permission validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, rarely enough alone to warn.
    Low,
    /// Worth surfacing, not normally blocking.
    Medium,
    /// Dangerous capability; contributes heavily toward a block.
    High,
    /// Unambiguously dangerous; a single critical finding can block.
    Critical,
}

/// The Security Gate's verdict for a skill, combining the static scanner
/// score and the manifest permission audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityDecision {
    /// No concerning findings; load normally.
    Allow,
    /// Concerning but not disqualifying; load, but log and surface to
    /// operators.
    Warn,
    /// Load only with restricted capabilities. Degrades to `Warn` when no
    /// sandbox backend is configured (see DESIGN.md).
    Sandbox,
    /// Refuse to load. Sticky: re-evaluating does not re-run the scan.
    Block,
}
