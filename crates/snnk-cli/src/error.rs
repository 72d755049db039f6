//! Error handling for the snnk CLI

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Kernel error, surfaced verbatim.
    #[error("kernel error: {0}")]
    Kernel(#[from] snnk_kernel::KernelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, from `--json` status output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Build a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit code for this error, per spec.md §6 "Exit codes":
    /// a `KernelException` maps to 134 (assertion failure); everything
    /// else is a plain usage/config failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Kernel(k) => k.exit_code(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_exception_propagates_its_exit_code() {
        let err = CliError::Kernel(snnk_kernel::KernelError::kernel_exception("boom"));
        assert_eq!(err.exit_code(), 134);
    }

    #[test]
    fn config_errors_exit_with_one() {
        assert_eq!(CliError::config("bad").exit_code(), 1);
    }
}
