//! Kernel-level failures and the CLI exit-code taxonomy of spec.md §6:
//! 0 success, 1 generic failure, 2 configuration error, 3 security block
//! on a pinned skill.

/// A failure during `start()`, `stop()`, or a directly-dispatched
/// `execute_tool` call.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// `KernelConfig` failed to load or parse.
    #[error("configuration error: {0}")]
    Config(String),
    /// A skill named in `skills.preload` is blocked by the Security Gate.
    #[error("security block on pinned skill '{0}': {1}")]
    PinnedSkillBlocked(String, String),
    /// Any other failure during boot or shutdown.
    #[error("kernel error: {0}")]
    Other(String),
}

impl StartupError {
    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => 2,
            StartupError::PinnedSkillBlocked(_, _) => 3,
            StartupError::Other(_) => 1,
        }
    }
}

impl From<anyhow::Error> for StartupError {
    fn from(e: anyhow::Error) -> Self {
        StartupError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_taxonomy() {
        assert_eq!(StartupError::Config("x".into()).exit_code(), 2);
        assert_eq!(StartupError::PinnedSkillBlocked("a".into(), "b".into()).exit_code(), 3);
        assert_eq!(StartupError::Other("x".into()).exit_code(), 1);
    }
}
