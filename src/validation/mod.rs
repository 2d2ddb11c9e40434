use bigdecimal::BigDecimal;
use std::fmt;

pub const MESSAGE_MAX_CHARS: usize = 200;
pub const USERNAME_MAX_LEN: usize = 64;
pub const AMOUNT_INPUT_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

/// Length check in characters, not bytes, so emoji count once.
pub fn validate_max_chars(field: &'static str, value: &str, max_chars: usize) -> ValidationResult {
    if value.chars().count() > max_chars {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_chars),
        ));
    }

    Ok(())
}

/// Streamer handles: optional leading `@`, then letters, digits, `_`, `-`, `.`.
pub fn validate_username(username: &str) -> ValidationResult {
    let username = sanitize_string(username);
    validate_required("recipient", &username)?;
    let handle = username.strip_prefix('@').unwrap_or(&username);
    validate_required("recipient", handle)?;
    validate_max_chars("recipient", handle, USERNAME_MAX_LEN)?;

    if !handle
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        return Err(ValidationError::new(
            "recipient",
            "must contain only letters, digits, '_', '-' or '.'",
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_min_amount(amount: &BigDecimal, min: &BigDecimal) -> ValidationResult {
    if amount < min {
        return Err(ValidationError::new(
            "amount",
            format!("must be at least {}", min),
        ));
    }

    Ok(())
}

pub fn validate_message(message: &str) -> ValidationResult {
    validate_max_chars("message", message, MESSAGE_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_chars_counts_characters() {
        assert!(validate_max_chars("field", "abc", 3).is_ok());
        assert!(validate_max_chars("field", "abcd", 3).is_err());
        assert!(validate_max_chars("field", "🎮🎮🎮", 3).is_ok());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn validates_username() {
        assert!(validate_username("ninja").is_ok());
        assert!(validate_username("@pokimane").is_ok());
        assert!(validate_username("xqc_official.tv").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("@").is_err());
        assert!(validate_username("bad name!").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn validates_positive_amount() {
        let positive = BigDecimal::from_str("1.23").expect("valid decimal");
        let zero = BigDecimal::from(0);
        let negative = BigDecimal::from(-1);

        assert!(validate_positive_amount(&positive).is_ok());
        assert!(validate_positive_amount(&zero).is_err());
        assert!(validate_positive_amount(&negative).is_err());
    }

    #[test]
    fn validates_min_amount() {
        let min = BigDecimal::from_str("0.1").unwrap();
        assert!(validate_min_amount(&BigDecimal::from_str("0.10").unwrap(), &min).is_ok());
        assert!(validate_min_amount(&BigDecimal::from_str("0.09").unwrap(), &min).is_err());
    }

    #[test]
    fn validates_message_length() {
        assert!(validate_message(&"x".repeat(200)).is_ok());
        assert!(validate_message(&"x".repeat(201)).is_err());
    }
}
