//! Error types for credeval
//!
//! Code-level failures inside the sandbox (non-zero exits, timeouts) are
//! ordinary [`crate::sandbox::ExecutionResult`] values, never errors. This
//! enum covers the truly exceptional paths: the isolation backend itself
//! failing, or IO around artifact staging.

use thiserror::Error;

/// Errors that can occur while driving the evaluation pipeline
#[derive(Error, Debug)]
pub enum CredevalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The isolation runtime could not be reached or set up.
    /// Distinct from failures of the executed code itself.
    #[error("sandbox failure: {reason}")]
    Sandbox { reason: String },
}

impl CredevalError {
    /// Create an error for a failed sandbox-infrastructure operation
    pub fn sandbox(reason: impl std::fmt::Display) -> Self {
        CredevalError::Sandbox {
            reason: reason.to_string(),
        }
    }

    /// Stable identifier used as `exception_kind` when an infrastructure
    /// failure is folded into an execution result.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CredevalError::Io(_) => "IoError",
            CredevalError::Json(_) => "JsonError",
            CredevalError::Sandbox { .. } => "SandboxError",
        }
    }
}

/// Result type alias for credeval operations
pub type Result<T> = std::result::Result<T, CredevalError>;
