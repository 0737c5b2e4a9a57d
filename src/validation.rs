//! Client-side form checks
//!
//! Nothing that fails here is ever sent to the API.

use url::Url;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Normalizes what the user typed into something worth validating.
///
/// Strips every whitespace character and assumes `https://` when no http(s)
/// scheme was given. Empty input stays empty.
pub fn sanitize_url(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return compact;
    }

    let lower = compact.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        compact
    } else {
        format!("https://{}", compact)
    }
}

pub fn is_valid_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// Sanitizes and validates a URL submitted for shortening.
pub fn validate_target(raw: &str) -> Result<String, &'static str> {
    let sanitized = sanitize_url(raw);
    if sanitized.is_empty() {
        return Err("Please enter a URL.");
    }
    if !is_valid_http_url(&sanitized) {
        return Err("Please enter a valid http(s) URL (example: https://google.com)");
    }
    Ok(sanitized)
}

/// The API expects lower-cased, trimmed e-mail usernames.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

fn email_ok(username: &str) -> bool {
    let trimmed = username.trim();
    !trimmed.is_empty() && trimmed.contains('@')
}

fn password_ok(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub fn validate_login(username: &str, password: &str) -> Result<(), &'static str> {
    if !email_ok(username) || !password_ok(password) {
        return Err("Please enter a valid email and password.");
    }
    Ok(())
}

pub fn validate_registration(
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<(), &'static str> {
    if !email_ok(username) {
        return Err("Please enter a valid email.");
    }
    if !password_ok(password) {
        return Err("Password must be at least 6 characters.");
    }
    if password != confirm {
        return Err("Passwords do not match.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_https_scheme() {
        assert_eq!(sanitize_url("  example.com/a b "), "https://example.com/ab");
    }

    #[test]
    fn keeps_existing_scheme() {
        assert_eq!(sanitize_url("HTTP://Example.com"), "HTTP://Example.com");
        assert!(is_valid_http_url(&sanitize_url("HTTP://Example.com")));
    }

    #[test]
    fn rejects_javascript_urls() {
        assert!(!is_valid_http_url("javascript:alert(1)"));
    }

    #[test]
    fn rejects_empty_target() {
        assert!(validate_target("   ").is_err());
    }

    #[test]
    fn registration_reports_first_failure() {
        assert_eq!(
            validate_registration("nobody", "short", "other"),
            Err("Please enter a valid email.")
        );
        assert_eq!(
            validate_registration("a@b.c", "secret1", "secret2"),
            Err("Passwords do not match.")
        );
        assert!(validate_registration("a@b.c", "secret1", "secret1").is_ok());
    }
}
