//! Request-shape errors.

use thiserror::Error;

/// Errors raised while validating a request body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A required field was absent or null.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field was present but unusable.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}
