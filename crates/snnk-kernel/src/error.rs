//! Error taxonomy for the scheduling kernel (spec.md §7)

use thiserror::Error;

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors the kernel can raise.
///
/// The variants mirror spec.md §7's taxonomy: `BadProperty` and
/// `UnknownModel`/`UnknownSynapse` are synchronous, caller-correctable
/// errors that leave kernel state unchanged; `KernelException` is fatal and
/// terminates the run; `IOError` is surfaced but the simulation continues.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A caller-supplied parameter violates a documented constraint (e.g. a
    /// delay of zero, or changing `resolution` on a non-empty network).
    #[error("bad property {property}: {value} (expected {constraint})")]
    BadProperty {
        /// Name of the offending property.
        property: String,
        /// The value that was rejected.
        value: String,
        /// Human-readable description of the constraint that was violated.
        constraint: String,
    },

    /// An internal invariant was violated in a way that cannot be resolved
    /// by resizing a buffer (e.g. a negative delay reaching the delivery
    /// manager, or a send-buffer chunk too small to hold even a marker).
    /// Fatal: the simulation must be aborted before the next gather.
    #[error("kernel exception: {reason}")]
    KernelException {
        /// Description of the violated invariant.
        reason: String,
    },

    /// `create`/`connect` referenced a node-model name that was never
    /// registered with `register_node_model`.
    #[error("unknown node model: {name}")]
    UnknownModel {
        /// The unregistered model name.
        name: String,
    },

    /// `connect` referenced a connection-model name that was never
    /// registered with `register_connection_model`.
    #[error("unknown connection model: {name}")]
    UnknownSynapse {
        /// The unregistered connection-model name.
        name: String,
    },

    /// A model-library recording failure. Surfaced to the caller; the
    /// kernel itself continues running.
    #[error("I/O error: {reason}")]
    IoError {
        /// Description of the failure.
        reason: String,
    },
}

impl KernelError {
    /// Build a `BadProperty` error.
    pub fn bad_property(
        property: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::BadProperty {
            property: property.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Build a `KernelException` error.
    pub fn kernel_exception(reason: impl Into<String>) -> Self {
        Self::KernelException {
            reason: reason.into(),
        }
    }

    /// Build an `UnknownModel` error.
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    /// Build an `UnknownSynapse` error.
    pub fn unknown_synapse(name: impl Into<String>) -> Self {
        Self::UnknownSynapse { name: name.into() }
    }

    /// Build an `IoError` error.
    pub fn io_error(reason: impl Into<String>) -> Self {
        Self::IoError {
            reason: reason.into(),
        }
    }

    /// Is this error fatal to the run (per spec.md §7's propagation
    /// policy)?
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KernelException { .. })
    }

    /// Process exit code this error corresponds to, per spec.md §6
    /// "Exit codes".
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::KernelException { .. } => 134,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_only_for_kernel_exception() {
        assert!(KernelError::kernel_exception("buffer overflow").is_fatal());
        assert!(!KernelError::bad_property("delay", "0", ">= 1").is_fatal());
        assert!(!KernelError::unknown_model("iaf_psc_alpha").is_fatal());
    }

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(KernelError::kernel_exception("x").exit_code(), 134);
        assert_eq!(KernelError::bad_property("a", "b", "c").exit_code(), 1);
    }

    #[test]
    fn display_messages_are_readable() {
        let err = KernelError::bad_property("t_ref", "0.05", "t_ref >= h");
        assert!(format!("{err}").contains("t_ref"));
    }
}
