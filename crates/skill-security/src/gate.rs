use crate::manifest_validator::ManifestValidator;
use crate::scanner::SecurityScanner;
use skill_types::SecurityDecision;
use std::path::Path;
use tracing::warn;

/// Combined verdict of the Security Gate: the static scanner's report and
/// the manifest validator's result, reduced to a single decision.
pub struct SecurityGate {
    scanner: SecurityScanner,
    validator: ManifestValidator,
    /// Scanner score at or above which a skill is blocked outright,
    /// absent a trusted-source bypass.
    pub block_threshold: u32,
    /// Scanner score at or above which a skill warns.
    pub warn_threshold: u32,
    /// Whether a sandbox backend is configured. With none configured (the
    /// default in this build — no container/WASI isolation is
    /// implemented) a would-be `Sandbox` decision degrades to `Warn`.
    pub sandbox_available: bool,
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self {
            scanner: SecurityScanner::new(),
            validator: ManifestValidator::new(),
            block_threshold: 30,
            warn_threshold: 10,
            sandbox_available: false,
        }
    }
}

impl SecurityGate {
    /// Creates a gate with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate with thresholds and trusted-source prefixes taken
    /// from deployer configuration (`security.*`).
    pub fn configured(block_threshold: u32, warn_threshold: u32, trusted_sources: Vec<String>) -> Self {
        Self {
            scanner: SecurityScanner::new(),
            validator: ManifestValidator {
                trusted_sources,
                ..ManifestValidator::default()
            },
            block_threshold,
            warn_threshold,
            sandbox_available: false,
        }
    }

    /// Assesses a skill directory and its parsed manifest, returning the
    /// combined decision.
    pub fn assess(
        &self,
        skill_dir: &Path,
        manifest: &serde_json::Value,
        source_url: Option<&str>,
    ) -> SecurityDecision {
        let report = self.scanner.scan(skill_dir);
        let validation = self.validator.validate(manifest);

        let trusted = source_url
            .map(|url| self.validator.check_trusted_source(url, manifest).0)
            .unwrap_or(false);

        if validation.is_blocked && !trusted {
            return SecurityDecision::Block;
        }
        if report.total_score >= self.block_threshold && !trusted {
            return SecurityDecision::Block;
        }

        let wants_sandbox =
            report.total_score >= self.warn_threshold && report.total_score < self.block_threshold;
        if wants_sandbox {
            if self.sandbox_available {
                return SecurityDecision::Sandbox;
            }
            warn!(skill = %report.skill_name, "sandbox decision requested but no sandbox backend is configured, degrading to warn");
            return SecurityDecision::Warn;
        }

        if validation.is_warning || report.total_score > 0 {
            return SecurityDecision::Warn;
        }

        SecurityDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_skill_is_allowed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), "print('hello')").unwrap();
        let gate = SecurityGate::new();
        let decision = gate.assess(tmp.path(), &serde_json::json!({"name": "s", "version": "1.0.0"}), None);
        assert_eq!(decision, SecurityDecision::Allow);
    }

    #[test]
    fn dangerous_code_is_blocked() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), "eval('x'); exec('y'); os.system('z')").unwrap();
        let gate = SecurityGate::new();
        let decision = gate.assess(tmp.path(), &serde_json::json!({"name": "s", "version": "1.0.0"}), None);
        assert_eq!(decision, SecurityDecision::Block);
    }

    #[test]
    fn trusted_source_bypasses_manifest_block() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), "print('hi')").unwrap();
        let gate = SecurityGate::new();
        let manifest = serde_json::json!({
            "name": "s", "version": "1.0.0",
            "permissions": {"exec": true, "shell": true}
        });
        let decision = gate.assess(
            tmp.path(),
            &manifest,
            Some("https://github.com/omni-dev/trusted-skill"),
        );
        assert_ne!(decision, SecurityDecision::Block);
    }
}
