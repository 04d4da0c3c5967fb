//! Field checks applied to login submissions before any collaborator is called.

use percent_encoding::{utf8_percent_encode, CONTROLS};
use regex::Regex;

pub const EMAIL_INVALID: &str = "Email is invalid";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PASSWORD_TOO_SHORT: &str = "Password is too short";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Where visitors land when no usable redirect target was submitted.
pub const DEFAULT_REDIRECT: &str = "/";

/// Syntactic email check: non-empty local part, `@`, and a dotted domain.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Length is counted in UTF-16 code units, the unit browsers use for
/// `minlength` and `String.length`.
pub fn password_long_enough(password: &str) -> bool {
    password.encode_utf16().count() >= MIN_PASSWORD_LENGTH
}

/// Resolve a submitted redirect target, falling back to `default` for anything
/// that is not a same-origin absolute path.
///
/// `//host` and `/\host` are rejected because browsers treat both as
/// protocol-relative URLs. Targets with control characters are rejected;
/// non-ASCII characters are percent-encoded so the target fits a `Location` header.
pub fn safe_redirect(to: Option<&str>, default: &str) -> String {
    let Some(to) = to else {
        return default.to_string();
    };

    if !to.starts_with('/') || to.starts_with("//") || to.starts_with("/\\") {
        return default.to_string();
    }

    if to.chars().any(char::is_control) {
        return default.to_string();
    }

    utf8_percent_encode(to, CONTROLS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@b.co"));
        assert!(valid_email("name.surname@example.com"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email(""));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("user@localhost"));
        assert!(!valid_email("user@example."));
        assert!(!valid_email("us er@example.com"));
    }

    #[test]
    fn password_length_counts_utf16_units() {
        assert!(!password_long_enough("short1"));
        assert!(!password_long_enough("seven77"));
        assert!(password_long_enough("eight888"));
        assert!(password_long_enough("longenough1"));
        // eleven bytes, seven units
        assert!(!password_long_enough("ññññ123"));
        // four emoji are eight units
        assert!(password_long_enough("😀😀😀😀"));
        assert!(!password_long_enough("😀😀😀"));
    }

    #[test]
    fn safe_redirect_keeps_relative_paths() {
        assert_eq!(safe_redirect(Some("/notes"), "/"), "/notes");
        assert_eq!(safe_redirect(Some("/notes?page=2"), "/"), "/notes?page=2");
        assert_eq!(safe_redirect(Some("/"), "/fallback"), "/");
    }

    #[test]
    fn safe_redirect_falls_back() {
        assert_eq!(safe_redirect(None, "/"), "/");
        assert_eq!(safe_redirect(Some(""), "/"), "/");
        assert_eq!(safe_redirect(Some("notes"), "/"), "/");
        assert_eq!(safe_redirect(Some("https://evil.example"), "/"), "/");
        assert_eq!(safe_redirect(Some("//evil.example"), "/"), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example"), "/"), "/");
        assert_eq!(safe_redirect(Some("/notes\r\nSet-Cookie: x"), "/"), "/");
        assert_eq!(safe_redirect(Some("/notes\u{85}x"), "/"), "/");
    }

    #[test]
    fn safe_redirect_encodes_non_ascii() {
        assert_eq!(safe_redirect(Some("/café"), "/"), "/caf%C3%A9");
        assert_eq!(
            safe_redirect(Some("/gallery?q=精灵"), "/"),
            "/gallery?q=%E7%B2%BE%E7%81%B5"
        );
        assert_eq!(safe_redirect(Some("/a%20b"), "/"), "/a%20b");
    }
}
