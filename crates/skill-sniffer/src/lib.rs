//! Declarative rule-based intent sniffing: a cheap, deterministic
//! fast-path that matches the caller's working directory against rules a
//! skill declares (`file_exists`, `file_pattern`), without touching the
//! Router's scoring pipeline.

#![warn(missing_docs)]

use regex::Regex;
use skill_scanner::DeclaredSnifferRule;
use std::path::Path;

/// A registered rule: a skill name paired with the condition that must
/// hold in a directory listing for the skill to be suggested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffRule {
    /// Name of the skill this rule suggests.
    pub skill_name: String,
    /// `"file_exists"` or `"file_pattern"`.
    pub rule_type: String,
    /// Exact filename (for `file_exists`) or glob (for `file_pattern`).
    pub pattern: String,
}

/// Registry of declarative rules and the matcher over them.
#[derive(Debug, Default)]
pub struct Sniffer {
    rules: Vec<SniffRule>,
}

impl Sniffer {
    /// Creates an empty sniffer.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registers rules for `skill_name`. Each rule is a `(rule_type,
    /// pattern)` pair.
    pub fn register_rules(&mut self, skill_name: &str, rules: &[(&str, &str)]) {
        for (rule_type, pattern) in rules {
            self.rules.push(SniffRule {
                skill_name: skill_name.to_string(),
                rule_type: rule_type.to_string(),
                pattern: pattern.to_string(),
            });
        }
    }

    /// Adopts rules the Scanner already discovered alongside a skill's
    /// tools, without re-scanning the skill's files.
    pub fn load_from_index(&mut self, discovered: &[(String, Vec<DeclaredSnifferRule>)]) -> usize {
        let mut count = 0;
        for (skill_name, rules) in discovered {
            for rule in rules {
                let (rule_type, pattern) = split_rule(&rule.rule);
                self.rules.push(SniffRule {
                    skill_name: skill_name.clone(),
                    rule_type: rule_type.to_string(),
                    pattern: pattern.to_string(),
                });
                count += 1;
            }
        }
        count
    }

    /// Returns every skill whose rules match `cwd`'s directory listing,
    /// in registration order with duplicates removed.
    pub fn sniff(&self, cwd: &Path) -> Vec<String> {
        self.sniff_with_scores(cwd)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Like [`Sniffer::sniff`] but also returns each match's score.
    /// Declarative rules always score `1.0` — they are exact matches, not
    /// ranked guesses.
    pub fn sniff_with_scores(&self, cwd: &Path) -> Vec<(String, f32)> {
        let entries = list_dir(cwd);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for rule in &self.rules {
            if seen.contains(&rule.skill_name) {
                continue;
            }
            let matched = match rule.rule_type.as_str() {
                "file_exists" => entries.iter().any(|e| e == &rule.pattern),
                "file_pattern" => {
                    let re = glob_to_regex(&rule.pattern);
                    entries.iter().any(|e| re.is_match(e))
                }
                _ => false,
            };
            if matched {
                seen.insert(rule.skill_name.clone());
                out.push((rule.skill_name.clone(), 1.0));
            }
        }
        out
    }
}

fn split_rule(rule: &str) -> (&str, &str) {
    rule.split_once(':').unwrap_or(("file_exists", rule))
}

fn list_dir(cwd: &Path) -> Vec<String> {
    std::fs::read_dir(cwd)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn glob_to_regex(glob: &str) -> Regex {
    let escaped = regex::escape(glob).replace(r"\*", ".*").replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_exists_rule_matches() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "").unwrap();
        let mut sniffer = Sniffer::new();
        sniffer.register_rules("rust_engineering", &[("file_exists", "Cargo.toml")]);
        let suggestions = sniffer.sniff(tmp.path());
        assert_eq!(suggestions, vec!["rust_engineering".to_string()]);
    }

    #[test]
    fn file_pattern_rule_matches_glob() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), "").unwrap();
        let mut sniffer = Sniffer::new();
        sniffer.register_rules("python_skill", &[("file_pattern", "*.py")]);
        let suggestions = sniffer.sniff(tmp.path());
        assert!(suggestions.contains(&"python_skill".to_string()));
    }

    #[test]
    fn no_match_is_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "").unwrap();
        let mut sniffer = Sniffer::new();
        sniffer.register_rules("go_skill", &[("file_exists", "go.mod")]);
        let suggestions = sniffer.sniff(tmp.path());
        assert!(!suggestions.contains(&"go_skill".to_string()));
    }

    #[test]
    fn declarative_matches_score_full() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("pyproject.toml"), "").unwrap();
        let mut sniffer = Sniffer::new();
        sniffer.register_rules("python", &[("file_exists", "pyproject.toml")]);
        let scored = sniffer.sniff_with_scores(tmp.path());
        assert_eq!(scored, vec![("python".to_string(), 1.0)]);
    }

    #[test]
    fn multiple_skills_multiple_rules() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("pyproject.toml"), "").unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(tmp.path().join("package.json"), "").unwrap();
        let mut sniffer = Sniffer::new();
        sniffer.register_rules("python", &[("file_exists", "pyproject.toml")]);
        sniffer.register_rules("rust", &[("file_exists", "Cargo.toml")]);
        sniffer.register_rules("nodejs", &[("file_exists", "package.json")]);
        let suggestions = sniffer.sniff(tmp.path());
        assert_eq!(suggestions.len(), 3);
    }
}
