//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure is synchronous and deterministic: retrying the same call with
/// the same input against the same state fails the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input to a constructor, factory or operation.
    ///
    /// Covers blank required strings, out-of-range numbers, length violations
    /// and derived values that disagree beyond the consistency tolerance.
    #[error("invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// The operation is not allowed in the current state.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl DomainError {
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }

    /// Name of the offending parameter, for `InvalidArgument` errors.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument { parameter, .. } => Some(parameter),
            Self::IllegalState(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_names_the_parameter() {
        let err = DomainError::invalid_argument("quantity", "must be positive");
        assert!(err.is_invalid_argument());
        assert_eq!(err.parameter(), Some("quantity"));
        assert_eq!(
            err.to_string(),
            "invalid argument `quantity`: must be positive"
        );
    }

    #[test]
    fn illegal_state_has_no_parameter() {
        let err = DomainError::illegal_state("transaction is finalized");
        assert!(err.is_illegal_state());
        assert_eq!(err.parameter(), None);
        assert_eq!(err.to_string(), "illegal state: transaction is finalized");
    }
}
