//! Shared domain types for the skill kernel.
//!
//! Every other crate in the workspace depends on this one for the
//! vocabulary a skill, a tool and its parameters, a security decision, and
//! a tool response are expressed in. Nothing in here talks to the
//! filesystem, a process, or a network socket.

#![warn(missing_docs)]

mod error;
mod manifest;
mod response;
mod tool;

pub use error::{ErrorCategory, KernelError};
pub use manifest::{LoadState, SecurityDecision, Severity, SkillManifest, SkillRuntime};
pub use response::{ToolResponse, ToolStatus};
pub use tool::{Parameter, ParameterType, ToolCommand, ToolRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered, fully-described skill: the unit the Scanner produces and
/// the Indexer diffs against what is currently known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Unique skill name (the namespace prefix of every tool it exposes).
    pub name: String,
    /// Semantic version from the skill's manifest, if any.
    pub version: String,
    /// Human-readable description, falling back to the first docstring
    /// line of the skill's entry script when the manifest omits one.
    pub description: String,
    /// Absolute path to the skill's root directory.
    pub path: std::path::PathBuf,
    /// Current position in the skill lifecycle.
    pub state: LoadState,
    /// blake3 hash of the skill's concatenated source, used to detect
    /// changes between scans without re-parsing unchanged content.
    pub content_hash: String,
    /// When this skill was last (re)scanned.
    pub scanned_at: DateTime<Utc>,
    /// Tools this skill registers, keyed by their local (non-qualified)
    /// name.
    pub tools: Vec<ToolRecord>,
}

impl Skill {
    /// Fully-qualified prefix every tool of this skill is addressed under.
    pub fn namespace(&self) -> &str {
        &self.name
    }
}
