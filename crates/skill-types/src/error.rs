use thiserror::Error;

/// Broad category an error falls into, used to pick the MCP/JSON-RPC
/// error code at the Transport Adapter boundary and to group errors for
/// operator-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input the caller sent (bad JSON, schema mismatch).
    Protocol,
    /// A named tool or skill does not exist.
    NotFound,
    /// The Security Gate refused the operation.
    Security,
    /// The tool ran but failed, or the process could not be spawned.
    Execution,
    /// Reading or writing persisted state (index snapshot, checkpoints).
    Storage,
    /// A dependency outside this process misbehaved (embedding provider,
    /// vector store).
    External,
    /// Anything else.
    Internal,
}

/// Top-level error type shared by crates that don't need a narrower,
/// crate-local error enum. Crates with a distinct failure surface
/// (`skill-scanner`, `skill-security`, ...) define their own
/// `thiserror` enum and convert into this one at their public boundary.
#[derive(Error, Debug)]
pub enum KernelError {
    /// The request could not be parsed or violated the wire schema.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No tool or skill matches the given name.
    #[error("not found: {0}")]
    NotFound(String),

    /// The Security Gate blocked this operation.
    #[error("blocked by security gate: {0}")]
    Security(String),

    /// Execution of a tool's command failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Reading or writing persisted state failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An external dependency failed.
    #[error("external dependency error: {0}")]
    External(String),

    /// Unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wraps an I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KernelError {
    /// The broad category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KernelError::Protocol(_) => ErrorCategory::Protocol,
            KernelError::NotFound(_) => ErrorCategory::NotFound,
            KernelError::Security(_) => ErrorCategory::Security,
            KernelError::Execution(_) => ErrorCategory::Execution,
            KernelError::Storage(_) => ErrorCategory::Storage,
            KernelError::External(_) => ErrorCategory::External,
            KernelError::Internal(_) | KernelError::Io(_) => ErrorCategory::Internal,
        }
    }

    /// The machine-readable code carried in `ToolResponse::error_code`.
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::Protocol(_) => "PROTOCOL_ERROR",
            KernelError::NotFound(_) => "NOT_FOUND",
            KernelError::Security(_) => "SECURITY_BLOCKED",
            KernelError::Execution(_) => "EXECUTION_FAILED",
            KernelError::Storage(_) => "STORAGE_ERROR",
            KernelError::External(_) => "EXTERNAL_ERROR",
            KernelError::Internal(_) | KernelError::Io(_) => "INTERNAL_ERROR",
        }
    }
}
