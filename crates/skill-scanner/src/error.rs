use std::path::PathBuf;
use thiserror::Error;

/// Errors a scan can fail with.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// The path given as a skill root has no usable final component.
    #[error("invalid skill root path: {0}")]
    InvalidPath(PathBuf),

    /// Reading a candidate source file failed.
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}
