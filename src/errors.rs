// Copyright 2025 Cowboy AI, LLC.

//! Error types for class composition

use thiserror::Error;

/// Errors that can occur while deriving, constructing or dispatching
///
/// Resolution misses inside `parent()` are never errors; they degrade to
/// `Ok(None)`. Everything here is either construction misuse or a failure
/// raised by user code (a method or hook) that propagates unmodified.
#[derive(Debug, Error)]
pub enum ClassError {
    /// No class is registered under the given name
    #[error("Class not found: {0}")]
    UnknownClass(String),

    /// Member could not be resolved on an instance
    #[error("Member not found: {member} on {class}")]
    MissingMember {
        /// Class of the instance the lookup started from
        class: String,
        /// Name that was looked up
        member: String,
    },

    /// A data member was invoked as a method
    #[error("Member is not callable: {member} on {class}")]
    NotCallable {
        /// Class of the instance the lookup started from
        class: String,
        /// Name of the data member
        member: String,
    },

    /// Configuration could not be parsed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failure raised by a method or hook body
    #[error("Method error: {0}")]
    Method(String),

    /// Arbitrary failure raised by user code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for class operations
pub type ClassResult<T> = Result<T, ClassError>;

impl From<serde_json::Error> for ClassError {
    fn from(err: serde_json::Error) -> Self {
        ClassError::SerializationError(err.to_string())
    }
}

impl ClassError {
    /// Create a method failure with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        ClassError::Method(msg.into())
    }

    /// Check if this is a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClassError::UnknownClass(_) | ClassError::MissingMember { .. }
        )
    }

    /// Check if this failure was raised by user code
    pub fn is_user_failure(&self) -> bool {
        matches!(self, ClassError::Method(_) | ClassError::Other(_))
    }
}
