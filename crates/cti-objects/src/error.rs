use cti_types::TypeError;
use thiserror::Error;

use crate::validation::Violation;

/// Errors produced by object construction, validation and decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The object type is not registered.
    #[error("unknown object type: {0}")]
    UnknownType(String),

    /// One or more fields are missing or malformed. Carries every violation
    /// found, not just the first.
    #[error("validation failed: {}", Violation::join(.0))]
    Validation(Vec<Violation>),

    /// The canonical form could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ObjectError {
    /// The violations carried by a validation error, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation(v) => v,
            _ => &[],
        }
    }
}

/// Result alias for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
