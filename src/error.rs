//! Error types for hwprobe
//!
//! Every failure is detected up front and reported; nothing is retried.
//! The binary maps errors onto process exit codes with
//! [`HwprobeError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for hwprobe operations
pub type Result<T> = std::result::Result<T, HwprobeError>;

/// Error type for all hwprobe operations
#[derive(Error, Debug)]
pub enum HwprobeError {
    /// A configuration value is out of range or inconsistent
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending parameter
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Kernel name not recognised
    #[error("unknown kernel '{0}' (expected saxpy, dot, mul, stencil3, rwmix or chase)")]
    UnknownKernel(String),

    /// Element data type not recognised
    #[error("unknown dtype '{0}' (expected f32 or f64)")]
    UnknownDtype(String),

    /// Access pattern selector not recognised
    #[error("unknown access pattern '{0}' (expected 0/sequential, 1/strided or 2/random)")]
    UnknownPattern(String),

    /// Buffer allocation failed
    #[error("failed to allocate {bytes} bytes aligned to {align}")]
    AllocationFailed {
        /// Requested size in bytes
        bytes: usize,
        /// Requested alignment in bytes
        align: usize,
    },

    /// Timer driven out of order
    #[error("timer is {actual}, expected {expected}")]
    InvalidState {
        /// Phase the operation requires
        expected: &'static str,
        /// Phase the timer was in
        actual: &'static str,
    },

    /// History file had no data rows
    #[error("no benchmark rows in {}", .0.display())]
    EmptyHistory(PathBuf),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HwprobeError {
    /// Shorthand for [`HwprobeError::InvalidConfig`]
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Process exit code for this error
    ///
    /// Allocation failures exit with `2`; everything else exits with `1`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AllocationFailed { .. } => 2,
            _ => 1,
        }
    }
}
