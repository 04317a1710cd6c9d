//! Error types for Gatekeep.
//!
//! All errors are strongly typed using thiserror. A missing rule match is
//! not an error (see [`crate::matcher::best_match`]); only invalid
//! configuration and exhausted generation are reported here.

use thiserror::Error;

/// Validation errors raised while building schemas, facts, rules or configs.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Schema must declare at least one attribute")]
    EmptySchema,

    #[error("Attribute '{attribute}' has an empty domain")]
    EmptyDomain {
        attribute: String,
    },

    #[error("Attribute name cannot be empty")]
    EmptyAttributeName,

    #[error("Attribute '{attribute}' is declared more than once")]
    DuplicateAttribute {
        attribute: String,
    },

    #[error("Attribute '{attribute}' has invalid bounds [{min}, {max}]")]
    InvalidBounds {
        attribute: String,
        min: i64,
        max: i64,
    },

    #[error("Unknown attribute '{attribute}'")]
    UnknownAttribute {
        attribute: String,
    },

    #[error("Value {value} is outside the domain of attribute '{attribute}'")]
    ValueOutOfDomain {
        attribute: String,
        value: String,
    },

    #[error("Expected {expected} attribute values, got {actual}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Rule must constrain at least one attribute")]
    WildcardRule,

    #[error("Invalid session config: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Failed to parse configuration: {message}")]
    Parse {
        message: String,
    },
}

/// Failures of the bounded-retry rule generator.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("No conflict-free rule found at difficulty {difficulty} after {attempts} attempts")]
    Exhausted {
        difficulty: u32,
        attempts: u32,
    },
}

/// Top-level error type for Gatekeep.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a generation error.
    #[must_use]
    pub const fn is_generation(&self) -> bool {
        matches!(self, Self::Generation(_))
    }

    /// Returns true if a later attempt could succeed.
    ///
    /// Generation is randomized, so an exhausted milestone may find a rule on
    /// the next try. Bad configuration never fixes itself.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

/// Result type alias for Gatekeep operations.
pub type GateResult<T> = Result<T, GateError>;
