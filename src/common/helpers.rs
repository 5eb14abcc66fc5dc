// Helper functions for safe logging and email normalization

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    // Masking works on chars, not bytes: the input is attacker-controlled
    // and a byte slice would panic on a multibyte first character.
    if email.chars().count() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            let first: String = parts[0].chars().take(1).collect();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("K7NP3XY2M4QWRT8HJZ5VD0BC1FG6S9AE");
/// // Returns: "K7NP...S9AE"
/// ```
pub fn safe_token_log(token: &str) -> String {
    // Bearer tokens arrive straight off the wire, so the same char-boundary
    // rule applies here as in safe_email_log.
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Normalizes an email address for lookup and storage.
///
/// Emails are case-insensitive in this system, so everything is lowered
/// and trimmed before it touches the store.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural email validation.
///
/// Intentionally loose: exactly one '@', non-empty local part, domain with
/// at least one dot. Real validation happens when the verification token
/// is redeemed.
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("alice@example.com"), "a***@example.com");
        assert_eq!(safe_email_log("a"), "***@***.***");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
    }

    #[test]
    fn test_safe_email_log_handles_multibyte_local_part() {
        assert_eq!(safe_email_log("éve@example.com"), "é***@example.com");
        assert_eq!(safe_email_log("日本語@example.jp"), "日***@example.jp");
    }

    #[test]
    fn test_safe_token_log_masks_middle() {
        let masked = safe_token_log("K7NP3XY2M4QWRT8H");
        assert_eq!(masked, "K7NP...RT8H");
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_safe_token_log_handles_multibyte_token() {
        assert_eq!(safe_token_log("日本語日本語日本語"), "日本語日...語日本語");
        assert_eq!(safe_token_log("日本語日"), "***");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@example.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("spaced name@example.com"));
        assert!(!is_valid_email("two@@example.com"));
    }
}
