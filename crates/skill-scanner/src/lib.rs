//! Discovers skills and the tools they register, without executing a
//! single line of skill code.
//!
//! A skill directory is recognized by the presence of a `skill.toml`
//! manifest or a `SKILL.md`. Tool registration inside a skill's scripts
//! is recognized by a decorator-shaped call immediately preceding a
//! function definition — `@tool(name=..., description=..., ...)` — found
//! with a line-oriented pattern scan, since interpreting the script's own
//! language is out of scope.

#![warn(missing_docs)]

mod error;
mod reserved;

pub use error::ScannerError;
pub use reserved::{is_reserved_parameter, RESERVED_PARAMETER_NAMES};

use regex::Regex;
use skill_types::{Parameter, ParameterType, ToolRecord, ToolVariant, VariantStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One file the Scanner examined, either read from disk or supplied
/// in-memory (a "virtual file").
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the file is addressed by. For virtual files this need not
    /// exist on disk.
    pub path: PathBuf,
    /// Raw script content.
    pub content: String,
}

/// A skill discovered by a scan, together with the tools its scripts
/// register.
#[derive(Debug, Clone)]
pub struct DiscoveredSkill {
    /// Skill name, taken from its manifest or its directory name.
    pub name: String,
    /// Root directory (or virtual-root path) of the skill.
    pub root: PathBuf,
    /// Tools registered across all of the skill's scanned scripts.
    pub tools: Vec<ToolRecord>,
    /// Declarative sniffer rules the skill's manifest or scripts declare,
    /// surfaced so `skill-sniffer` can adopt them without a second scan.
    pub sniffer_rules: Vec<DeclaredSnifferRule>,
}

/// A sniffer rule declared alongside a skill, adopted verbatim by
/// `Sniffer::load_from_index`.
#[derive(Debug, Clone)]
pub struct DeclaredSnifferRule {
    /// The tool this rule should route toward.
    pub fq_name: String,
    /// `file_exists:<glob>` or `file_pattern:<regex>`.
    pub rule: String,
}

fn decorator_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*@tool\(\s*(?P<args>[^)]*)\)\s*\n[ \t]*(?:async\s+)?def\s+(?P<fname>[A-Za-z_][A-Za-z0-9_]*)\s*\("#,
        )
        .expect("decorator pattern is a valid regex")
    })
}

fn kwarg_pattern(key: &str) -> Regex {
    Regex::new(&format!(
        r#"{}\s*=\s*["']([^"']*)["']"#,
        regex::escape(key)
    ))
    .expect("kwarg pattern is a valid regex")
}

fn numeric_kwarg_pattern(key: &str) -> Regex {
    Regex::new(&format!(r#"{}\s*=\s*(-?\d+)"#, regex::escape(key)))
        .expect("numeric kwarg pattern is a valid regex")
}

fn parse_variant_status(raw: &str) -> VariantStatus {
    match raw {
        "degraded" => VariantStatus::Degraded,
        "unavailable" => VariantStatus::Unavailable,
        _ => VariantStatus::Available,
    }
}

fn docstring_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)def\s+[A-Za-z_][A-Za-z0-9_]*\s*\([^)]*\)[^:]*:\s*\n\s*["']{3}(.*?)["']{3}"#)
            .expect("docstring pattern is a valid regex")
    })
}

/// Parses one script's content for `@tool(...)` registrations.
///
/// Does not execute anything; this is a pure text scan.
pub fn parse_script_content(skill_name: &str, file: &SourceFile) -> Vec<ToolRecord> {
    let content_hash = blake3::hash(file.content.as_bytes()).to_hex().to_string();
    let mut records = Vec::new();

    for caps in decorator_pattern().captures_iter(&file.content) {
        let args = caps.name("args").map(|m| m.as_str()).unwrap_or_default();
        let fname = caps
            .name("fname")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let name = kwarg_pattern("name")
            .captures(args)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| fname.clone());

        let description = kwarg_pattern("description")
            .captures(args)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .or_else(|| first_docstring_line(&file.content, &fname))
            .unwrap_or_default();

        let parameters = parse_reserved_warnings(&name, args);

        // `variant=...` marks this decorator occurrence as one of several
        // alternate implementations of the same tool name; occurrences
        // sharing a name are merged into one record's `variants` list by
        // `merge_variants` once every file in the skill has been scanned.
        let variants = kwarg_pattern("variant")
            .captures(args)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .map(|variant_name| {
                let status = kwarg_pattern("variant_status")
                    .captures(args)
                    .and_then(|c| c.get(1).map(|m| parse_variant_status(m.as_str())))
                    .unwrap_or(VariantStatus::Available);
                let priority = numeric_kwarg_pattern("variant_priority")
                    .captures(args)
                    .and_then(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
                    .unwrap_or(100);
                vec![ToolVariant {
                    variant_name,
                    status,
                    priority,
                    entry_point: file.path.clone(),
                    content_hash: content_hash.clone(),
                }]
            })
            .unwrap_or_default();

        records.push(ToolRecord {
            fq_name: format!("{skill_name}.{name}"),
            skill_name: skill_name.to_string(),
            name,
            description,
            parameters,
            keywords: Vec::new(),
            category: None,
            aliases: Vec::new(),
            entry_point: file.path.clone(),
            content_hash: content_hash.clone(),
            variants,
        });
    }

    records
}

/// Merges decorator occurrences that share a fully-qualified name and
/// collectively declare at least one `variant=...` tag into a single
/// record carrying every tagged implementation in `variants`. Groups with
/// no variant tags pass through unchanged — this is the common case and
/// must not alter today's one-record-per-decorator behavior.
fn merge_variants(tools: Vec<ToolRecord>) -> Vec<ToolRecord> {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<ToolRecord>> = HashMap::new();
    for tool in tools {
        if !groups.contains_key(&tool.fq_name) {
            order.push(tool.fq_name.clone());
        }
        groups.entry(tool.fq_name.clone()).or_default().push(tool);
    }

    let mut merged = Vec::with_capacity(order.len());
    for fq_name in order {
        let mut group = groups.remove(&fq_name).unwrap_or_default();
        if group.len() == 1 || !group.iter().any(|t| !t.variants.is_empty()) {
            merged.extend(group);
            continue;
        }

        let mut primary = group.remove(0);
        let mut variants = Vec::new();
        for tool in std::iter::once(&primary).chain(group.iter()) {
            if tool.variants.is_empty() {
                variants.push(ToolVariant {
                    variant_name: tool
                        .entry_point
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| "default".to_string()),
                    status: VariantStatus::Available,
                    priority: 100,
                    entry_point: tool.entry_point.clone(),
                    content_hash: tool.content_hash.clone(),
                });
            } else {
                variants.extend(tool.variants.clone());
            }
        }
        primary.variants = variants;
        merged.push(primary);
    }
    merged
}

fn first_docstring_line(content: &str, _fname: &str) -> Option<String> {
    docstring_pattern()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().lines().next().unwrap_or("").to_string())
        .filter(|s| !s.is_empty())
}

/// Warns (via `tracing`) but does not fail when a tool's inferred
/// parameter list would collide with a name the Executor's dispatch
/// function itself reserves.
fn parse_reserved_warnings(tool_name: &str, args: &str) -> Vec<Parameter> {
    let params_pattern = Regex::new(r#"parameters\s*=\s*\[(?P<body>[^\]]*)\]"#).unwrap();
    let mut out = Vec::new();
    if let Some(caps) = params_pattern.captures(args) {
        let body = caps.name("body").map(|m| m.as_str()).unwrap_or_default();
        let name_pattern = Regex::new(r#"["']([A-Za-z_][A-Za-z0-9_]*)["']"#).unwrap();
        for m in name_pattern.find_iter(body) {
            let pname = m.as_str().trim_matches(|c| c == '"' || c == '\'');
            if is_reserved_parameter(pname) {
                warn!(tool = tool_name, parameter = pname, "parameter name collides with a reserved executor parameter");
            }
            out.push(Parameter {
                name: pname.to_string(),
                param_type: ParameterType::String,
                description: String::new(),
                required: true,
                default_value: None,
            });
        }
    }
    out
}

/// Scans a real directory on disk, recursing per `walkdir`'s default
/// traversal, skipping common non-source directories.
pub fn scan_directory(root: &Path) -> Result<DiscoveredSkill, ScannerError> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ScannerError::InvalidPath(root.to_path_buf()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_denied(path) {
            continue;
        }
        if matches!(path.extension().and_then(|e| e.to_str()), Some("py" | "sh" | "js")) {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ScannerError::Io(path.to_path_buf(), e))?;
            files.push(SourceFile {
                path: path.to_path_buf(),
                content,
            });
        }
    }

    Ok(scan_paths(&name, root, &files))
}

/// Scans an in-memory set of `(path, content)` pairs as if they were a
/// skill's files, without touching the filesystem. Used for incremental
/// reindex when the Watcher already has the changed content in hand, and
/// for tests.
pub fn scan_paths(skill_name: &str, root: &Path, files: &[SourceFile]) -> DiscoveredSkill {
    let mut tools = Vec::new();
    for file in files {
        debug!(path = %file.path.display(), "scanning file");
        tools.extend(parse_script_content(skill_name, file));
    }

    DiscoveredSkill {
        name: skill_name.to_string(),
        root: root.to_path_buf(),
        tools: merge_variants(tools),
        sniffer_rules: Vec::new(),
    }
}

fn is_denied(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some(".git" | "node_modules" | "__pycache__" | "target" | ".hg" | ".svn")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            content: content.to_string(),
        }
    }

    #[test]
    fn parses_decorator_with_explicit_name_and_description() {
        let src = file(
            "tools.py",
            r#"
@tool(name="list_pods", description="List pods in a namespace")
def _list_pods(namespace: str):
    pass
"#,
        );
        let records = parse_script_content("kubernetes", &src);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fq_name, "kubernetes.list_pods");
        assert_eq!(records[0].description, "List pods in a namespace");
    }

    #[test]
    fn falls_back_to_function_name_and_docstring() {
        let src = file(
            "tools.py",
            r#"
@tool()
def get_logs(pod: str):
    """Fetch logs for a pod.

    Longer explanation here.
    """
    pass
"#,
        );
        let records = parse_script_content("kubernetes", &src);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "get_logs");
        assert_eq!(records[0].description, "Fetch logs for a pod.");
    }

    #[test]
    fn flags_reserved_parameter_names_without_failing() {
        let src = file(
            "tools.py",
            r#"
@tool(name="run", description="run a command", parameters=["command", "timeout"])
def run(command: str, timeout: int):
    pass
"#,
        );
        let records = parse_script_content("shell", &src);
        assert_eq!(records.len(), 1);
        assert!(records[0].parameters.iter().any(|p| p.name == "command"));
    }

    #[test]
    fn scan_paths_merges_variant_tagged_tools_across_files() {
        let files = vec![
            file(
                "rust_search.py",
                r#"@tool(name="code_search", description="search code", variant="rust", variant_priority=0)
def rust_search():
    pass
"#,
            ),
            file(
                "local_search.py",
                r#"@tool(name="code_search", description="search code", variant="local", variant_status="degraded", variant_priority=50)
def local_search():
    pass
"#,
            ),
        ];
        let discovered = scan_paths("search", Path::new("/skills/search"), &files);
        assert_eq!(discovered.tools.len(), 1);
        let tool = &discovered.tools[0];
        assert_eq!(tool.fq_name, "search.code_search");
        assert_eq!(tool.variants.len(), 2);
        assert!(tool.variants.iter().any(|v| v.variant_name == "rust" && v.status == VariantStatus::Available));
        assert!(tool.variants.iter().any(|v| v.variant_name == "local" && v.status == VariantStatus::Degraded));
    }

    #[test]
    fn scan_paths_handles_multiple_files() {
        let files = vec![
            file("a.py", r#"@tool(name="a")
def a():
    pass
"#),
            file("b.py", r#"@tool(name="b")
def b():
    pass
"#),
        ];
        let discovered = scan_paths("multi", Path::new("/skills/multi"), &files);
        assert_eq!(discovered.tools.len(), 2);
    }
}
