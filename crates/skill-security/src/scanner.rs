use regex::Regex;
use serde::{Deserialize, Serialize};
use skill_types::Severity;
use std::path::Path;
use std::sync::OnceLock;

/// One security-relevant pattern the static scanner looked for and the
/// line it matched on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFinding {
    /// Name of the pattern that matched (not the matched text itself).
    pub pattern: String,
    /// Severity tier of this finding.
    pub severity: Severity,
    /// 1-based line number the match occurred on.
    pub line_number: usize,
    /// The full source line, for operator review.
    pub line_content: String,
    /// Human-readable explanation of why this is concerning.
    pub description: String,
    /// Points this finding contributes to the total score.
    pub score: u32,
}

/// The result of scanning one skill's source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Name of the skill that was scanned.
    pub skill_name: String,
    /// Every finding across every scanned file, in scan order.
    pub findings: Vec<SecurityFinding>,
    /// Sum of all findings' scores.
    pub total_score: u32,
    /// `total_score >= block_threshold`.
    pub is_blocked: bool,
    /// `total_score >= warn_threshold` and not blocked.
    pub is_warning: bool,
}

impl SecurityReport {
    /// Serializes the report to a `serde_json::Value` for operator
    /// tooling and the `doctor` CLI subcommand.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "skill_name": self.skill_name,
            "findings": self.findings,
            "total_score": self.total_score,
            "is_blocked": self.is_blocked,
            "is_warning": self.is_warning,
        })
    }
}

struct PatternRule {
    name: &'static str,
    regex: Regex,
    severity: Severity,
    score: u32,
    description: &'static str,
}

fn rules() -> &'static Vec<PatternRule> {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            PatternRule {
                name: "os.system shell execution",
                regex: Regex::new(r"os\.system\s*\(").unwrap(),
                severity: Severity::Critical,
                score: 50,
                description: "Shell command execution via os.system".into(),
            },
            PatternRule {
                name: "subprocess shell=True",
                regex: Regex::new(r"shell\s*=\s*True").unwrap(),
                severity: Severity::Critical,
                score: 50,
                description: "Shell injection risk via subprocess shell=True".into(),
            },
            PatternRule {
                name: "eval()",
                regex: Regex::new(r"\beval\s*\(").unwrap(),
                severity: Severity::Critical,
                score: 50,
                description: "Arbitrary code execution via eval".into(),
            },
            PatternRule {
                name: "exec()",
                regex: Regex::new(r"\bexec\s*\(").unwrap(),
                severity: Severity::Critical,
                score: 50,
                description: "Arbitrary code execution via exec".into(),
            },
            PatternRule {
                name: "__import__() dynamic import",
                regex: Regex::new(r"__import__\s*\(").unwrap(),
                severity: Severity::Critical,
                score: 50,
                description: "Dynamic import can bypass static review".into(),
            },
            PatternRule {
                name: "unbounded file write",
                regex: Regex::new(r#"open\([^)]*["'][wa]["'][^)]*\)\s*\.\s*write\s*\("#).unwrap(),
                severity: Severity::High,
                score: 30,
                description: "Unbounded file write".into(),
            },
            PatternRule {
                name: "network call without timeout",
                regex: Regex::new(r"(?:requests|httpx)\.(?:get|post|put|delete)\([^)]*timeout\s*=\s*None").unwrap(),
                severity: Severity::High,
                score: 30,
                description: "Network request with no timeout".into(),
            },
            PatternRule {
                name: "subprocess execution",
                regex: Regex::new(r"subprocess\.(run|Popen|call|check_output)\s*\(").unwrap(),
                severity: Severity::Medium,
                score: 15,
                description: "Subprocess execution".into(),
            },
            PatternRule {
                name: "file read from sensitive path",
                regex: Regex::new(r#"open\([^)]*["']r["']?[^)]*\)\s*\.\s*read\s*\("#).unwrap(),
                severity: Severity::Medium,
                score: 15,
                description: "File read operation".into(),
            },
            PatternRule {
                name: "environment/system inspection",
                regex: Regex::new(r"os\.(getcwd|environ|getenv)\s*\(?").unwrap(),
                severity: Severity::Low,
                score: 5,
                description: "System/environment inspection".into(),
            },
        ]
    })
}

/// Block threshold and warn threshold are owned by the caller
/// (`SecurityGate`) so they can be overridden by configuration; the
/// scanner itself only produces a score.
pub struct SecurityScanner;

impl SecurityScanner {
    /// Creates a new scanner. Stateless — pattern tables are static.
    pub fn new() -> Self {
        Self
    }

    /// Scans raw source text for a named skill.
    pub fn scan_code(&self, code: &str, skill_name: &str) -> SecurityReport {
        let mut findings = Vec::new();
        for (idx, line) in code.lines().enumerate() {
            for rule in rules() {
                if rule.regex.is_match(line) {
                    findings.push(SecurityFinding {
                        pattern: rule.name.to_string(),
                        severity: rule.severity,
                        line_number: idx + 1,
                        line_content: line.trim().to_string(),
                        description: rule.description.to_string(),
                        score: rule.score,
                    });
                }
            }
        }
        // Complementary call-shape pass: catches a dangerous call whose
        // opening paren is on a different line than this line-oriented
        // pass can see, by joining each function-call expression first.
        findings.extend(scan_call_shapes(code));

        let total_score: u32 = findings.iter().map(|f| f.score).sum();
        SecurityReport {
            skill_name: skill_name.to_string(),
            findings,
            total_score,
            is_blocked: false,
            is_warning: false,
        }
    }

    /// Scans every `.py`/`.sh`/`.js` file under `skill_dir`.
    pub fn scan(&self, skill_dir: &Path) -> SecurityReport {
        let skill_name = skill_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut combined = SecurityReport {
            skill_name: skill_name.clone(),
            findings: Vec::new(),
            total_score: 0,
            is_blocked: false,
            is_warning: false,
        };

        for entry in walkdir::WalkDir::new(skill_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if !matches!(entry.path().extension().and_then(|e| e.to_str()), Some("py" | "sh" | "js")) {
                continue;
            }
            if let Ok(content) = std::fs::read_to_string(entry.path()) {
                let report = self.scan_code(&content, &skill_name);
                combined.findings.extend(report.findings);
            }
        }
        combined.total_score = combined.findings.iter().map(|f| f.score).sum();
        combined
    }
}

impl Default for SecurityScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// A join of consecutive non-blank lines, call-shape-matched against the
/// same dangerous-call patterns as the line scan, so a call whose
/// arguments span multiple lines is not missed. Findings here are tagged
/// distinctly so duplicates against the line scan are visible, not
/// silently merged.
fn scan_call_shapes(code: &str) -> Vec<SecurityFinding> {
    let joined = code.lines().collect::<Vec<_>>().join(" ");
    let call_shape = Regex::new(r"\b(eval|exec)\s*\(").unwrap();
    let mut findings = Vec::new();
    for m in call_shape.find_iter(&joined) {
        findings.push(SecurityFinding {
            pattern: format!("{} (call-shape analyzer)", m.as_str().trim_end_matches('(').trim()),
            severity: Severity::Critical,
            line_number: 0,
            line_content: m.as_str().to_string(),
            description: "Dangerous call detected by cross-line call-shape analysis".into(),
            score: 0,
        });
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_os_system_as_critical() {
        let scanner = SecurityScanner::new();
        let report = scanner.scan_code(r#"import os; os.system("rm -rf /")"#, "test_skill");
        assert!(report.findings.iter().any(|f| f.severity == Severity::Critical));
    }

    #[test]
    fn detects_eval_and_exec_separately() {
        let scanner = SecurityScanner::new();
        let report = scanner.scan_code("eval(user_input); exec('print(1)')", "test_skill");
        let critical = report.findings.iter().filter(|f| f.severity == Severity::Critical).count();
        assert!(critical >= 2);
    }

    #[test]
    fn accumulates_score_across_findings() {
        let scanner = SecurityScanner::new();
        let code = "import os\nimport subprocess\nos.system(\"cmd\")\nopen(\"file\", \"w\").write(\"data\")";
        let report = scanner.scan_code(code, "test_skill");
        assert!(report.total_score >= 50);
    }

    #[test]
    fn empty_code_has_no_findings() {
        let scanner = SecurityScanner::new();
        let report = scanner.scan_code("", "test_skill");
        assert_eq!(report.findings.len(), 0);
        assert_eq!(report.total_score, 0);
    }

    #[test]
    fn scan_directory_finds_low_severity_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        let skill_dir = tmp.path().join("test_skill");
        std::fs::create_dir(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("main.py"), "print(\"safe\")").unwrap();
        std::fs::write(skill_dir.join("utils.py"), "import os; print(os.getcwd())").unwrap();

        let scanner = SecurityScanner::new();
        let report = scanner.scan(&skill_dir);
        assert_eq!(report.skill_name, "test_skill");
        assert!(!report.findings.is_empty());
    }
}
