//! Per-skill registry: root directory and parsed manifest, keyed by skill
//! name. Built during the boot scan and consulted by the closures handed
//! to `SkillContext` and `skill_mcp::McpServer` so neither has to depend
//! on manifest parsing or discovery directly.

use dashmap::DashMap;
use skill_scanner::DiscoveredSkill;
use skill_types::SkillManifest;
use std::path::{Path, PathBuf};

/// A skill's root and manifest, as last seen by a scan.
#[derive(Debug, Clone)]
pub struct RegisteredSkill {
    /// Root directory on disk.
    pub root: PathBuf,
    /// Parsed (or synthesized, if no `skill.toml` exists) manifest.
    pub manifest: SkillManifest,
}

/// Lock-free-read map from skill name to its root and manifest.
#[derive(Default)]
pub struct SkillRegistry {
    entries: DashMap<String, RegisteredSkill>,
}

impl SkillRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Records (or replaces) a skill's root and manifest.
    pub fn insert(&self, name: &str, root: PathBuf, manifest: SkillManifest) {
        self.entries.insert(name.to_string(), RegisteredSkill { root, manifest });
    }

    /// The skill's root directory, if registered.
    pub fn root_of(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).map(|e| e.root.clone())
    }

    /// The skill's `filter_commands` glob policy, empty if unregistered.
    pub fn filter_commands_of(&self, name: &str) -> Vec<String> {
        self.entries
            .get(name)
            .map(|e| e.manifest.filter_commands.clone())
            .unwrap_or_default()
    }

    /// The skill's manifest, if registered.
    pub fn manifest_of(&self, name: &str) -> Option<SkillManifest> {
        self.entries.get(name).map(|e| e.manifest.clone())
    }

    /// Every registered skill name.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

/// Parses `root/skill.toml` into a manifest, falling back to a minimal
/// manifest synthesized from the scan when no manifest file exists.
/// `default_filter_commands` backs the skill-wide default declared in
/// `KernelConfig`, used when the skill's own manifest declares none.
pub fn load_manifest(discovered: &DiscoveredSkill, default_filter_commands: &[String]) -> SkillManifest {
    let toml_path = discovered.root.join("skill.toml");
    match std::fs::read_to_string(&toml_path)
        .ok()
        .and_then(|s| SkillManifest::from_toml_str(&s).ok())
    {
        Some(mut manifest) => {
            if manifest.filter_commands.is_empty() {
                manifest.filter_commands = default_filter_commands.to_vec();
            }
            manifest
        }
        None => SkillManifest {
            name: discovered.name.clone(),
            version: "0.0.0".to_string(),
            description: String::new(),
            author: String::new(),
            runtime: skill_types::SkillRuntime::default(),
            permissions: std::collections::HashMap::new(),
            filter_commands: default_filter_commands.to_vec(),
        },
    }
}

/// Enumerates the immediate subdirectories of `skills_dir`, each treated
/// as one skill root.
pub fn skill_roots(skills_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !skills_dir.exists() {
        return Ok(Vec::new());
    }
    let mut roots = Vec::new();
    for entry in std::fs::read_dir(skills_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            roots.push(entry.path());
        }
    }
    roots.sort();
    Ok(roots)
}
