//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that every player name has visible characters.
///
/// # Examples
///
/// ```ignore
/// validate_player_names(&["Emma".into(), "David".into()]) // Ok
/// validate_player_names(&["Emma".into(), "  ".into()])    // Err - blank
/// ```
pub fn validate_player_names(names: &[String]) -> Result<(), ValidationError> {
    if let Some(position) = names.iter().position(|name| name.trim().is_empty()) {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some(format!("Player name at position {position} is blank").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a free-text field is not only whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_names_valid() {
        assert!(validate_player_names(&["Emma".into(), "David".into()]).is_ok());
        assert!(validate_player_names(&[" Tanner ".into()]).is_ok());
        assert!(validate_player_names(&[]).is_ok());
    }

    #[test]
    fn test_validate_player_names_blank() {
        let err = validate_player_names(&["Emma".into(), " \t".into()]).unwrap_err();
        assert_eq!(err.code, "player_name_blank");
        assert!(validate_player_names(&["".into()]).is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("likes birdies").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}
