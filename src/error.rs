//! Error types for kernel selection and dispatch configuration
//!
//! Every failure in this crate is deterministic: selection is a pure
//! computation, so repeating a call on identical inputs reproduces the
//! identical error. Nothing here is retried internally.

use thiserror::Error;

use crate::params::OperatorFamily;

/// Errors produced by parameter validation, registration, and selection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DespacharError {
    /// Malformed parameter model (construction-time only, never recoverable)
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Human-readable description of the violated invariant
        reason: String,
    },

    /// The operator family has no registered kernel implementations
    #[error("no kernel candidates registered for family {family}")]
    NoCandidatesRegistered {
        /// Family that was looked up
        family: OperatorFamily,
    },

    /// Candidates exist but none can execute this shape/layout/dtype combination
    #[error("no applicable kernel candidate for family {family}")]
    NoApplicableCandidate {
        /// Family that was filtered
        family: OperatorFamily,
    },

    /// A forced kernel name does not exist in the registry
    #[error("forced kernel '{name}' not registered for family {family}")]
    ForcedCandidateNotFound {
        /// Family the override targeted
        family: OperatorFamily,
        /// The kernel name that was forced
        name: String,
    },

    /// A forced kernel exists but rejects this operator instance.
    /// Forcing never silently falls back to automatic selection.
    #[error("forced kernel '{name}' is not applicable to this {family} instance")]
    ForcedCandidateNotApplicable {
        /// Family the override targeted
        family: OperatorFamily,
        /// The kernel name that was forced
        name: String,
    },

    /// Two candidates for the same family share a name (registry misconfiguration)
    #[error("duplicate kernel candidate '{name}' for family {family}")]
    DuplicateCandidate {
        /// Family being registered into
        family: OperatorFamily,
        /// The colliding kernel name
        name: String,
    },
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DespacharError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_structure() {
        let err = DespacharError::ForcedCandidateNotFound {
            family: OperatorFamily::Gemm,
            name: "gemm_super".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gemm_super"));
        assert!(msg.contains("gemm"));
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = DespacharError::InvalidParameter {
            reason: "rank mismatch".to_string(),
        };
        assert!(err.to_string().contains("rank mismatch"));
    }
}
