use serde::{Deserialize, Serialize};
use skill_types::SkillManifest;
use std::path::Path;

/// A single flagged permission from a skill's manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionWarning {
    /// The permission key (`"exec"`, `"shell"`, `"filesystem"`, `"network"`).
    pub permission: String,
    /// The declared value, stringified.
    pub value: String,
    /// `"danger"` or `"warning"`.
    pub severity: String,
    /// Human-readable explanation.
    pub message: String,
}

/// Outcome of validating one manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Schema is well-formed (`name`/`version` present, JSON parses).
    pub is_valid: bool,
    /// The danger-permission count met or exceeded `BLOCK_THRESHOLD`.
    pub is_blocked: bool,
    /// At least one warning was raised and the result isn't blocked.
    pub is_warning: bool,
    /// Schema-level problems (missing fields, unparsable JSON/TOML).
    pub errors: Vec<String>,
    /// Permission-level concerns.
    pub warnings: Vec<PermissionWarning>,
}

impl ValidationResult {
    /// Serializes to a `serde_json::Value` for CLI/operator reporting.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "is_valid": self.is_valid,
            "is_blocked": self.is_blocked,
            "is_warning": self.is_warning,
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}

/// Validates a skill manifest's schema and audits its declared
/// permissions, producing a [`ValidationResult`].
pub struct ManifestValidator {
    /// Danger-permission count at or above which the result is blocked.
    pub block_threshold: usize,
    /// Danger-permission count at or above which the result warns (but
    /// is not yet blocked).
    pub warn_threshold: usize,
    /// Repository URL prefixes that bypass permission warnings.
    pub trusted_sources: Vec<String>,
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self {
            block_threshold: 2,
            warn_threshold: 1,
            trusted_sources: vec!["https://github.com/omni-dev/".to_string()],
        }
    }
}

impl ManifestValidator {
    /// Creates a validator with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a manifest already parsed into a `serde_json::Value`
    /// (used directly by tests and by callers that already hold parsed
    /// JSON rather than a `SkillManifest`).
    pub fn validate(&self, manifest: &serde_json::Value) -> ValidationResult {
        let mut result = ValidationResult {
            is_valid: true,
            ..Default::default()
        };

        if manifest.get("name").and_then(|v| v.as_str()).map(str::is_empty).unwrap_or(true) {
            result.is_valid = false;
            result.errors.push("manifest missing required field: name".to_string());
        }
        if manifest.get("version").and_then(|v| v.as_str()).map(str::is_empty).unwrap_or(true) {
            result.is_valid = false;
            result.errors.push("manifest missing required field: version".to_string());
        }

        if let Some(permissions) = manifest.get("permissions").and_then(|v| v.as_object()) {
            let mut danger_count = 0usize;
            for (key, value) in permissions {
                if let Some(warning) = self.audit_permission(key, value) {
                    if warning.severity == "danger" {
                        danger_count += 1;
                    }
                    result.warnings.push(warning);
                }
            }
            if danger_count >= self.block_threshold {
                result.is_blocked = true;
            } else if danger_count >= self.warn_threshold && !result.warnings.is_empty() {
                result.is_warning = true;
            } else if !result.warnings.is_empty() {
                result.is_warning = true;
            }
        }

        result
    }

    /// Validates the manifest at `path` (JSON or TOML, by extension).
    pub fn validate_file(&self, path: &Path) -> ValidationResult {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                return ValidationResult {
                    is_valid: false,
                    errors: vec![format!("manifest file not found: {}", path.display())],
                    ..Default::default()
                };
            }
        };

        let parsed: Result<serde_json::Value, _> = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::from_str::<SkillManifest>(&content)
                .map(|m| serde_json::to_value(m).unwrap())
                .map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(value) => self.validate(&value),
            Err(e) => ValidationResult {
                is_valid: false,
                errors: vec![format!("invalid json: {e}")],
                ..Default::default()
            },
        }
    }

    /// Audits a single permission key/value, returning a warning when the
    /// permission is dangerous or merely worth flagging.
    fn audit_permission(&self, key: &str, value: &serde_json::Value) -> Option<PermissionWarning> {
        match key {
            "exec" | "shell" => {
                if truthy(value) {
                    Some(PermissionWarning {
                        permission: key.to_string(),
                        value: value.to_string(),
                        severity: "danger".to_string(),
                        message: format!("{key} permission allows arbitrary command execution"),
                    })
                } else {
                    None
                }
            }
            "filesystem" => value.as_str().map(|mode| PermissionWarning {
                permission: key.to_string(),
                value: mode.to_string(),
                severity: "warning".to_string(),
                message: format!("filesystem {mode} access requested"),
            }),
            "network" => {
                if truthy(value) {
                    Some(PermissionWarning {
                        permission: key.to_string(),
                        value: value.to_string(),
                        severity: "warning".to_string(),
                        message: "network access requested".to_string(),
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Checks whether `source_url` is recognized as trusted, returning
    /// the match reason either way.
    pub fn check_trusted_source(&self, source_url: &str, _metadata: &serde_json::Value) -> (bool, String) {
        for prefix in &self.trusted_sources {
            if source_url.starts_with(prefix.as_str()) {
                return (true, format!("matches trusted prefix {prefix}"));
            }
        }
        (false, format!("{source_url} is not in trusted list"))
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty() && s != "false",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_manifest_passes() {
        let validator = ManifestValidator::new();
        let manifest = serde_json::json!({"name": "test-skill", "version": "1.0.0"});
        let result = validator.validate(&manifest);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_name_is_rejected() {
        let validator = ManifestValidator::new();
        let manifest = serde_json::json!({"version": "1.0.0"});
        let result = validator.validate(&manifest);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.to_lowercase().contains("name")));
    }

    #[test]
    fn exec_permission_is_a_danger_warning() {
        let validator = ManifestValidator::new();
        let manifest = serde_json::json!({"name": "s", "version": "1.0.0", "permissions": {"exec": true}});
        let result = validator.validate(&manifest);
        assert!(result.is_valid);
        let exec_warning = result.warnings.iter().find(|w| w.permission == "exec").unwrap();
        assert_eq!(exec_warning.severity, "danger");
    }

    #[test]
    fn two_dangers_blocks_with_default_threshold() {
        let validator = ManifestValidator::new();
        let manifest = serde_json::json!({
            "name": "s", "version": "1.0.0",
            "permissions": {"exec": true, "shell": true}
        });
        let result = validator.validate(&manifest);
        assert!(result.is_blocked);
    }

    #[test]
    fn single_danger_warns_with_raised_block_threshold() {
        let mut validator = ManifestValidator::new();
        validator.block_threshold = 3;
        validator.warn_threshold = 1;
        let manifest = serde_json::json!({"name": "s", "version": "1.0.0", "permissions": {"shell": true}});
        let result = validator.validate(&manifest);
        assert!(result.is_warning);
        assert!(!result.is_blocked);
    }

    #[test]
    fn trusted_source_matches_prefix() {
        let validator = ManifestValidator::new();
        let (trusted, reason) = validator.check_trusted_source("https://github.com/omni-dev/skill-docker", &serde_json::json!({}));
        assert!(trusted);
        assert!(reason.contains("omni-dev"));
    }

    #[test]
    fn untrusted_source_is_reported() {
        let validator = ManifestValidator::new();
        let (trusted, reason) = validator.check_trusted_source("https://github.com/random-user/skill", &serde_json::json!({}));
        assert!(!trusted);
        assert!(reason.contains("not in trusted list"));
    }
}
