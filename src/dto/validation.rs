//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::scoring::rules::MatchFormat;

/// Validates that a match length is an odd number of sets no longer than the maximum.
///
/// # Examples
///
/// ```ignore
/// validate_best_of(5) // Ok
/// validate_best_of(4) // Err - even
/// validate_best_of(11) // Err - too long
/// ```
pub fn validate_best_of(best_of: u8) -> Result<(), ValidationError> {
    if MatchFormat::new(best_of).is_some() {
        return Ok(());
    }

    let mut err = ValidationError::new("best_of");
    err.message = Some(format!("best_of must be odd and at most 9 (got {best_of})").into());
    Err(err)
}

/// Validates that an identifier has visible content.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
