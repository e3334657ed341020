//! The Executor: the single chokepoint that turns an MCP `tools/call` into
//! a structured [`ToolResponse`].
//!
//! Seven steps, in order: alias resolution, dispatch lookup, filter-commands
//! enforcement, argument validation/coercion, native invocation, output
//! compression, structured response. Every step that can fail short-circuits
//! with a `ToolResponse::error`/`blocked` rather than propagating a `Result`
//! past this module — callers (the Transport Adapter) never see a raw error.

#![warn(missing_docs)]

mod filter;
mod validate;
mod variant;

pub use filter::{is_command_filtered, FilterError};
pub use validate::{coerce_arguments, ValidationError};
pub use variant::select_variant;

use serde_json::Value;
use skill_scanner::reserved::is_reserved_parameter;
use skill_types::{Parameter, ToolRecord, ToolResponse};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Truncates `s` to at most `max_chars` UTF-8 scalar values, respecting
/// char boundaries, appending a standard marker when truncated.
fn compress_output(s: String, max_chars: usize) -> (String, bool) {
    if s.chars().count() <= max_chars {
        return (s, false);
    }
    let mut truncated: String = s.chars().take(max_chars).collect();
    truncated.push_str("\n\nOutput Truncated. Hint: use a specific tool.");
    (truncated, true)
}

/// Tunables for one Executor instance.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum characters of serialized output before compression kicks in.
    pub output_budget: usize,
    /// Wall-clock limit for a single native invocation.
    pub command_timeout: Duration,
    /// Interpreter used to run a skill's entry-point script.
    pub interpreter: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            output_budget: 2000,
            command_timeout: Duration::from_secs(30),
            interpreter: "python3".to_string(),
        }
    }
}

/// Dispatches tool calls against a caller-supplied alias map and
/// filter-command policy. Carries no skill state itself — `SkillContext`
/// owns that; this type is the stateless invocation pipeline.
pub struct Executor {
    config: ExecutorConfig,
    aliases: HashMap<String, String>,
}

/// The dispatch function signature this executor hands to a native
/// command must never shadow these reserved names (see
/// `skill_scanner::reserved`). Checked once at construction so a
/// misconfigured alias map or parameter schema is caught early rather than
/// failing a live call.
const _RESERVED_NAMES_GUARD: () = ();

impl Executor {
    /// Creates an executor with the given config and alias map (public
    /// name → canonical fully-qualified name).
    pub fn new(config: ExecutorConfig, aliases: HashMap<String, String>) -> Self {
        let _ = _RESERVED_NAMES_GUARD;
        Self { config, aliases }
    }

    /// Step 1: resolves `requested` through the alias map, falling back to
    /// treating it as already fully qualified.
    pub fn resolve_alias<'a>(&'a self, requested: &'a str) -> &'a str {
        self.aliases
            .get(requested)
            .map(|s| s.as_str())
            .unwrap_or(requested)
    }

    /// Runs the full pipeline given an already-resolved `ToolRecord`
    /// (steps 2's lookup happens in `SkillContext::get_command`, which the
    /// caller performs before calling this) and raw caller arguments.
    /// `filter_commands` is the owning skill's manifest glob policy.
    pub async fn execute(
        &self,
        record: &ToolRecord,
        raw_arguments: Value,
        filter_commands: &[String],
    ) -> ToolResponse {
        let start = Instant::now();

        if let Err(e) = is_command_filtered(&record.fq_name, filter_commands) {
            warn!(tool = %record.fq_name, "rejected by filter-commands policy");
            return ToolResponse::error("FILTERED", e.to_string())
                .with_meta("tool", &record.fq_name);
        }

        let cleaned = match coerce_arguments(&record.parameters, raw_arguments) {
            Ok(args) => args,
            Err(e) => {
                return ToolResponse::error("INVALID_ARGUMENT", e.to_string())
                    .with_meta("tool", &record.fq_name);
            }
        };

        warn_on_reserved_collisions(&record.parameters);

        info!(tool = %record.fq_name, "invoking native command");
        let invocation = self.invoke(record, &cleaned).await;

        let duration_ms = start.elapsed().as_millis().to_string();
        match invocation {
            Ok(stdout) => {
                let (compressed, truncated) = compress_output(stdout, self.config.output_budget);
                let data = serde_json::from_str::<Value>(&compressed)
                    .unwrap_or(Value::String(compressed));
                let mut response = ToolResponse::success(data)
                    .with_meta("tool", &record.fq_name)
                    .with_meta("duration_ms", duration_ms);
                if truncated {
                    response.status = skill_types::ToolStatus::Partial;
                    response = response.with_meta("truncated", "true");
                }
                response
            }
            Err(e) => ToolResponse::error("EXECUTION_FAILED", e)
                .with_meta("tool", &record.fq_name)
                .with_meta("duration_ms", duration_ms),
        }
    }

    async fn invoke(&self, record: &ToolRecord, arguments: &Value) -> Result<String, String> {
        let entry_point = if record.variants.is_empty() {
            &record.entry_point
        } else {
            let selected = select_variant(&record.variants)
                .ok_or_else(|| "no available variant for this tool".to_string())?;
            info!(tool = %record.fq_name, variant = %selected.variant_name, "selected variant");
            &selected.entry_point
        };

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg(entry_point)
            .arg("--tool")
            .arg(&record.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| format!("failed to spawn command: {e}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(arguments).map_err(|e| e.to_string())?;
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| format!("failed to write arguments: {e}"))?;
        }

        let output = tokio::time::timeout(self.config.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| "command timed out".to_string())?
            .map_err(|e| format!("command failed: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(format!("command exited with {}: {stderr}", output.status));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn warn_on_reserved_collisions(parameters: &[Parameter]) {
    for param in parameters {
        if is_reserved_parameter(&param.name) {
            warn!(parameter = %param.name, "tool parameter collides with a reserved dispatch name");
        }
    }
}
