use serde::{Deserialize, Serialize};

/// Supported parameter types for a tool command's declared schema.
///
/// Mirrors the teacher runtime's `ParameterType` but drops the
/// WASM-component-specific `File` variant, since native skills pass
/// file paths as plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Text string value.
    String,
    /// Numeric value (integer or float).
    Number,
    /// Boolean true/false value.
    Boolean,
    /// JSON object or structured data.
    Json,
    /// Array of values.
    Array,
}

/// Declared parameter of a tool command.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Parameter {
    /// Parameter identifier as it appears in the call arguments.
    pub name: String,
    /// Data type of the parameter.
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Human-readable description, usually lifted from the originating
    /// decorator call or, failing that, the function's first doc line.
    pub description: String,
    /// Whether the caller must supply this parameter.
    pub required: bool,
    /// Default value serialized as JSON text, used when `required` is
    /// false and the caller omits the argument.
    pub default_value: Option<String>,
}

/// Availability of a [`ToolVariant`], mirroring the original prototype's
/// provider-variant system (`variants.py`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    /// Ready to serve calls.
    Available,
    /// Usable but with known limitations (e.g. a fallback implementation).
    Degraded,
    /// Not eligible for selection.
    Unavailable,
}

/// One alternate implementation of a tool — e.g. a Rust-accelerated
/// entry point alongside a pure-Python one. Most tools have none of
/// these; `ToolRecord.variants` is empty and the record's own
/// `entry_point`/`content_hash` is used directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVariant {
    /// Unique identifier among the variants of one tool (e.g. `"rust"`,
    /// `"local"`, `"remote"`).
    pub variant_name: String,
    /// Current availability.
    pub status: VariantStatus,
    /// Selection priority among variants with equal status; lower wins.
    pub priority: i32,
    /// Entry point this variant's command is invoked through.
    pub entry_point: std::path::PathBuf,
    /// blake3 hash of this variant's declaring script content.
    pub content_hash: String,
}

/// A single tool a skill exposes, as recorded by the Scanner and carried
/// through the Indexer, Router, SkillContext, and Executor.
///
/// `ToolRecord` is the unit of diffing: two records with the same
/// `fq_name` and equal `content_hash` are considered identical and are
/// skipped by `Indexer::diff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Fully qualified name, `"<skill>.<tool>"`.
    pub fq_name: String,
    /// Owning skill's name.
    pub skill_name: String,
    /// Local (non-qualified) tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared parameters.
    pub parameters: Vec<Parameter>,
    /// Free-text keywords used for sparse/keyword matching in the Router.
    pub keywords: Vec<String>,
    /// Category label, used to group related tools (e.g. `"kubernetes"`).
    pub category: Option<String>,
    /// Alternate names this tool may also be addressed by.
    pub aliases: Vec<String>,
    /// Path to the script file the tool's entry point lives in, relative
    /// to the owning skill's root.
    pub entry_point: std::path::PathBuf,
    /// blake3 hash of the declaring script's content at scan time.
    pub content_hash: String,
    /// Alternate implementations of this same tool, selected by status
    /// then priority at dispatch time. Empty for the common
    /// single-implementation case.
    #[serde(default)]
    pub variants: Vec<ToolVariant>,
}

/// A command dispatched through the Executor: a resolved `ToolRecord`
/// together with the concrete arguments a caller supplied.
///
/// This is distinct from `ToolRecord` because a `ToolCommand` only exists
/// for the lifetime of one `execute_tool` call, while a `ToolRecord`
/// persists across the Indexer's snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    /// The resolved tool being invoked (alias already resolved to its
    /// canonical `fq_name`).
    pub record: ToolRecord,
    /// Caller-supplied arguments, already validated against
    /// `record.parameters` and coerced to their declared types.
    pub arguments: serde_json::Value,
}
