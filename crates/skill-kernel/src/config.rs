//! `KernelConfig`: every key in spec.md §6's configuration surface,
//! loaded from `.skill-engine.toml`/`skill-engine.toml` the way the
//! teacher's `SkillManifest::load` does, with the same `${VAR}`/
//! `${VAR:-default}`/`${VAR:?msg}` expansion applied to string fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// An alias/doc override for one fully-qualified tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOverride {
    /// Alternate public name this tool may be called by, in addition to
    /// its fully-qualified name.
    #[serde(default)]
    pub alias: Option<String>,
    /// Text appended to the tool's description shown over MCP.
    #[serde(default)]
    pub append_doc: Option<String>,
}

/// `skills.*` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Skills pinned at boot and never evicted.
    #[serde(default)]
    pub preload: Vec<String>,
    /// Additional preload names for CLI-run contexts.
    #[serde(default)]
    pub cli_extend: Vec<String>,
    /// Eviction threshold.
    #[serde(default = "default_max_loaded")]
    pub max_loaded: usize,
    /// Idle TTL, seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_timeout_seconds: u64,
    /// TTL sweep cadence, seconds.
    #[serde(default = "default_ttl_check_interval")]
    pub ttl_check_interval_seconds: u64,
    /// Max tools returned from the Router.
    #[serde(default = "default_dynamic_tools")]
    pub dynamic_tools: usize,
    /// Minimum core tools always included by the Router.
    #[serde(default = "default_core_min")]
    pub core_min: usize,
    /// Validation cache expiry, seconds.
    #[serde(default = "default_schema_cache_ttl")]
    pub schema_cache_ttl_seconds: u64,
    /// Block-list glob patterns; `!`-prefixed entries are allow
    /// exceptions, applied to every skill unless overridden by its own
    /// manifest.
    #[serde(default)]
    pub filter_commands: Vec<String>,
    /// Per-tool alias/doc overrides, keyed by fully-qualified name.
    #[serde(default)]
    pub overrides: HashMap<String, ToolOverride>,
}

fn default_max_loaded() -> usize {
    15
}
fn default_ttl_seconds() -> u64 {
    1800
}
fn default_ttl_check_interval() -> u64 {
    300
}
fn default_dynamic_tools() -> usize {
    15
}
fn default_core_min() -> usize {
    3
}
fn default_schema_cache_ttl() -> u64 {
    300
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            preload: Vec::new(),
            cli_extend: Vec::new(),
            max_loaded: default_max_loaded(),
            ttl_timeout_seconds: default_ttl_seconds(),
            ttl_check_interval_seconds: default_ttl_check_interval(),
            dynamic_tools: default_dynamic_tools(),
            core_min: default_core_min(),
            schema_cache_ttl_seconds: default_schema_cache_ttl(),
            filter_commands: Vec::new(),
            overrides: HashMap::new(),
        }
    }
}

/// `security.*` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Scanner score at or above which a skill is blocked.
    #[serde(default = "default_block_threshold")]
    pub block_threshold: u32,
    /// Scanner score at or above which a skill warns.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: u32,
    /// Repository URL prefixes that bypass manifest permission warnings.
    #[serde(default)]
    pub trusted_sources: Vec<String>,
}

fn default_block_threshold() -> u32 {
    30
}
fn default_warn_threshold() -> u32 {
    10
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            block_threshold: default_block_threshold(),
            warn_threshold: default_warn_threshold(),
            trusted_sources: Vec::new(),
        }
    }
}

/// `reindex.*` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// When a single `FileChanged` batch touches at least this many
    /// paths, rebuild the whole index from a fresh scan rather than
    /// diffing skill-by-skill.
    #[serde(default = "default_full_rebuild_threshold")]
    pub full_rebuild_threshold: usize,
}

fn default_full_rebuild_threshold() -> usize {
    20
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            full_rebuild_threshold: default_full_rebuild_threshold(),
        }
    }
}

/// Which transport `serve` should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Stdio, the default for a locally-spawned MCP client.
    #[default]
    Stdio,
    /// Streaming HTTP (SSE), for networked deployments.
    Http,
}

/// `transport.*` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Which transport to start under `serve`.
    #[serde(default)]
    pub kind: TransportKind,
    /// Bind host, HTTP transport only.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port, HTTP transport only.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-call wall-clock budget, seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8420
}
fn default_timeout_seconds() -> u64 {
    60
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Top-level kernel configuration, loaded from `.skill-engine.toml` /
/// `skill-engine.toml` in the current directory or an explicit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Directory scanned for skill subdirectories at boot. Defaults to
    /// `./skills` relative to the config file.
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
    /// Where the index snapshot is persisted between runs.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    /// SQLite path for the Persistence Service's checkpoint backend.
    #[serde(default = "default_persistence_path")]
    pub persistence_db_path: PathBuf,
    /// `skills.*`.
    #[serde(default)]
    pub skills: SkillsConfig,
    /// `security.*`.
    #[serde(default)]
    pub security: SecurityConfig,
    /// `transport.*`.
    #[serde(default)]
    pub transport: TransportConfig,
    /// `reindex.*`.
    #[serde(default)]
    pub reindex: ReindexConfig,
    /// Directory this config was loaded from, used to resolve relative
    /// paths above. Not itself a TOML key.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from("skills")
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".skill-engine/index.json")
}
fn default_persistence_path() -> PathBuf {
    PathBuf::from(".skill-engine/checkpoints.db")
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            skills_dir: default_skills_dir(),
            index_path: default_index_path(),
            persistence_db_path: default_persistence_path(),
            skills: SkillsConfig::default(),
            security: SecurityConfig::default(),
            transport: TransportConfig::default(),
            reindex: ReindexConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl KernelConfig {
    /// Loads config from `.skill-engine.toml` or `skill-engine.toml` in
    /// `dir`, or returns the default config if neither exists.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        for name in [".skill-engine.toml", "skill-engine.toml"] {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self {
            base_dir: dir.to_path_buf(),
            ..Self::default()
        })
    }

    /// Loads and expands config from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let expanded = expand_env_vars(&raw).context("expanding ${VAR} references in config")?;
        let mut config: Self = toml::from_str(&expanded).context("failed to parse config file")?;
        config.base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        if config.skills_dir.is_relative() {
            config.skills_dir = config.base_dir.join(&config.skills_dir);
        }
        if config.index_path.is_relative() {
            config.index_path = config.base_dir.join(&config.index_path);
        }
        if config.persistence_db_path.is_relative() {
            config.persistence_db_path = config.base_dir.join(&config.persistence_db_path);
        }
        Ok(config)
    }
}

/// Expands `${VAR}`, `${VAR:-default}`, `${VAR:?message}` references
/// against the process environment.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            let mut depth = 1;
            for c in chars.by_ref() {
                if c == '{' {
                    depth += 1;
                    var_expr.push(c);
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    var_expr.push(c);
                } else {
                    var_expr.push(c);
                }
            }

            let value = if let Some(pos) = var_expr.find(":-") {
                let var_name = &var_expr[..pos];
                let default_value = &var_expr[pos + 2..];
                std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
            } else if let Some(pos) = var_expr.find(":?") {
                let var_name = &var_expr[..pos];
                let error_msg = &var_expr[pos + 2..];
                std::env::var(var_name)
                    .with_context(|| format!("environment variable {var_name} not set: {error_msg}"))?
            } else {
                std::env::var(&var_expr)
                    .with_context(|| format!("environment variable {var_expr} not set"))?
            };
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_surface() {
        let config = KernelConfig::default();
        assert_eq!(config.skills.max_loaded, 15);
        assert_eq!(config.skills.ttl_timeout_seconds, 1800);
        assert_eq!(config.skills.ttl_check_interval_seconds, 300);
        assert_eq!(config.skills.dynamic_tools, 15);
        assert_eq!(config.skills.core_min, 3);
        assert_eq!(config.security.block_threshold, 30);
        assert_eq!(config.security.warn_threshold, 10);
        assert_eq!(config.reindex.full_rebuild_threshold, 20);
    }

    #[test]
    fn expands_default_and_required_vars() {
        std::env::set_var("KERNEL_CFG_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${KERNEL_CFG_TEST_VAR}").unwrap(), "hello");
        assert_eq!(expand_env_vars("${MISSING_VAR:-fallback}").unwrap(), "fallback");
        assert!(expand_env_vars("${DEFINITELY_MISSING_VAR}").is_err());
    }

    #[test]
    fn parses_toml_with_nested_tables() {
        let toml_src = r#"
            skills_dir = "my-skills"

            [skills]
            preload = ["core"]
            max_loaded = 5

            [security]
            block_threshold = 40
        "#;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".skill-engine.toml");
        std::fs::write(&path, toml_src).unwrap();
        let config = KernelConfig::load(&path).unwrap();
        assert_eq!(config.skills.preload, vec!["core".to_string()]);
        assert_eq!(config.skills.max_loaded, 5);
        assert_eq!(config.security.block_threshold, 40);
        assert_eq!(config.skills_dir, tmp.path().join("my-skills"));
    }

    #[test]
    fn parses_reindex_section() {
        let toml_src = r#"
            [reindex]
            full_rebuild_threshold = 5
        "#;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".skill-engine.toml");
        std::fs::write(&path, toml_src).unwrap();
        let config = KernelConfig::load(&path).unwrap();
        assert_eq!(config.reindex.full_rebuild_threshold, 5);
    }
}
