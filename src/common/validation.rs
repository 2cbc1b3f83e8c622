//! Validation utilities for parameter bounds and deserialization checks

use crate::common::{Result, SketchError};

/// Minimum precision value (2^2 = 4 registers)
pub const MIN_PRECISION: u8 = 2;

/// Maximum precision value (2^63 registers; memory becomes prohibitive
/// long before this, but the parameter domain permits it)
pub const MAX_PRECISION: u8 = 63;

/// Maximum serialized sketch size (256MB) to prevent resource exhaustion
pub const MAX_BYTE_SIZE: usize = 256 * 1024 * 1024; // 256MB

/// Validate that precision is within the permitted range [2, 63]
///
/// Precisions of 4-18 are the practical range; anything above costs memory
/// exponentially for diminishing accuracy.
pub fn validate_precision(precision: u8) -> Result<()> {
    if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        return Err(SketchError::InvalidParameter {
            param: "precision".to_string(),
            value: precision.to_string(),
            constraint: format!("must be in range [{}, {}]", MIN_PRECISION, MAX_PRECISION),
        });
    }
    Ok(())
}

/// Validate that a deserialized byte size doesn't exceed safety limits
pub fn validate_byte_size(size: usize) -> Result<()> {
    if size > MAX_BYTE_SIZE {
        return Err(SketchError::DeserializationError(format!(
            "Serialized sketch size {} exceeds maximum allowed size {}",
            size, MAX_BYTE_SIZE
        )));
    }
    Ok(())
}

/// Validate minimum required bytes for a deserialization header
pub fn validate_min_size(actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(SketchError::DeserializationError(format!(
            "Insufficient data: need at least {} bytes, got {}",
            required, actual
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_precision_valid() {
        assert!(validate_precision(2).is_ok());
        assert!(validate_precision(10).is_ok());
        assert!(validate_precision(18).is_ok());
        assert!(validate_precision(63).is_ok());
    }

    #[test]
    fn test_validate_precision_invalid() {
        assert!(validate_precision(0).is_err());
        assert!(validate_precision(1).is_err());
        assert!(validate_precision(64).is_err());
        assert!(validate_precision(255).is_err());
    }

    #[test]
    fn test_validate_byte_size() {
        assert!(validate_byte_size(1024).is_ok());
        assert!(validate_byte_size(MAX_BYTE_SIZE).is_ok());
        assert!(validate_byte_size(MAX_BYTE_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_min_size() {
        assert!(validate_min_size(100, 72).is_ok());
        assert!(validate_min_size(72, 72).is_ok());
        assert!(validate_min_size(71, 72).is_err());
    }
}
