//! Error types for sketch operations

use std::fmt;

/// Errors that can occur during sketch operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SketchError {
    /// Invalid parameter provided to a sketch constructor or operation
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Invalid value provided
        value: String,
        /// Constraint that was violated
        constraint: String,
    },

    /// Register storage could not be allocated
    AllocationFailure {
        /// Requested buffer size in bytes
        bytes: u64,
    },

    /// Register index outside the sketch's register range
    IndexOutOfRange {
        /// Requested register index
        index: u64,
        /// Number of registers in the sketch
        size: u64,
    },

    /// Error during deserialization
    DeserializationError(String),

    /// Attempted to merge incompatible sketches
    IncompatibleSketches {
        /// Reason for incompatibility
        reason: String,
    },
}

impl fmt::Display for SketchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchError::InvalidParameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}': value '{}' {}",
                    param, value, constraint
                )
            }
            SketchError::AllocationFailure { bytes } => {
                write!(f, "Could not allocate {} bytes of register storage", bytes)
            }
            SketchError::IndexOutOfRange { index, size } => {
                write!(f, "Register index {} out of range for {} registers", index, size)
            }
            SketchError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            SketchError::IncompatibleSketches { reason } => {
                write!(f, "Incompatible sketches: {}", reason)
            }
        }
    }
}

impl std::error::Error for SketchError {}

/// Result type alias for sketch operations
pub type Result<T> = std::result::Result<T, SketchError>;
