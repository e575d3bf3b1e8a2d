//! Input validation for account operations.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Maximum display name length.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum accepted password length, bounding hashing cost.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

/// Email validation regex (simplified RFC 5322).
/// The pattern is a constant, so `expect()` can only fail on a programming error.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$")
        .expect("EMAIL_REGEX is a valid regex pattern")
});

/// Email validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    /// No address given.
    Empty,
    /// Longer than [`MAX_EMAIL_LENGTH`].
    TooLong { max: usize, actual: usize },
    /// Does not look like an address.
    InvalidFormat,
}

impl std::fmt::Display for EmailValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Email is required"),
            Self::TooLong { max, actual } => {
                write!(f, "Email too long: {actual} characters (maximum {max})")
            }
            Self::InvalidFormat => write!(f, "Invalid email format"),
        }
    }
}

/// Trim and lowercase an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an already normalized email address.
pub fn validate_email(email: &str) -> Result<(), EmailValidationError> {
    if email.is_empty() {
        return Err(EmailValidationError::Empty);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(EmailValidationError::TooLong {
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(EmailValidationError::InvalidFormat);
    }
    Ok(())
}

/// Validate a display name, returning it trimmed.
pub fn validate_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("Name too long (maximum {MAX_NAME_LENGTH} characters)"));
    }
    Ok(trimmed.to_string())
}

/// Validate a password's presence and size. Strength rules are not applied.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password too long (maximum {MAX_PASSWORD_LENGTH} bytes)"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ann@X.com "), "ann@x.com");
        assert_eq!(normalize_email("bob@example.org"), "bob@example.org");
    }

    #[test]
    fn test_valid_emails() {
        for email in ["ann@x.com", "first.last+tag@news.example.co.uk", "a_b@c-d.io"] {
            assert_eq!(validate_email(email), Ok(()), "{email}");
        }
    }

    #[test]
    fn test_invalid_emails() {
        assert_eq!(validate_email(""), Err(EmailValidationError::Empty));
        for email in ["ann", "ann@", "@x.com", "ann@x", "ann x@x.com", "ann@-x.com"] {
            assert_eq!(
                validate_email(email),
                Err(EmailValidationError::InvalidFormat),
                "{email}"
            );
        }
        let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert!(matches!(
            validate_email(&long),
            Err(EmailValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ann  ").unwrap(), "Ann");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("pw123").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
