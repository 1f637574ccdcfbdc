//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted in a session.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Validates that a join code is exactly 6 ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("123456") // Ok
/// validate_join_code("12345")  // Err - too short
/// validate_join_code("12a456") // Err - not a digit
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(format!("Join code must be exactly 6 digits (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a player display name: not blank and at most [`MAX_DISPLAY_NAME_LEN`] characters.
///
/// The name itself is kept verbatim; surrounding whitespace is not trimmed.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    validate_not_blank(name)?;

    let len = name.chars().count();
    if len > MAX_DISPLAY_NAME_LEN {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Display name must be at most {MAX_DISPLAY_NAME_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be empty".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_join_code_valid() {
        assert!(validate_join_code("123456").is_ok());
        assert!(validate_join_code("000000").is_ok());
    }

    #[test]
    fn test_validate_join_code_invalid() {
        assert!(validate_join_code("12345").is_err()); // too short
        assert!(validate_join_code("1234567").is_err()); // too long
        assert!(validate_join_code("").is_err()); // empty
        assert!(validate_join_code("12a456").is_err()); // letter
        assert!(validate_join_code("12 456").is_err()); // space
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Alice").is_ok());
        assert!(validate_display_name(" Bob ").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME_LEN + 1)).is_err());
    }
}
