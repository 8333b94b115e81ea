//! Utility functions for muster
//!
//! Common helper functions used across the codebase.

use std::sync::LazyLock;

use rand::Rng;

use crate::TIMESTAMP_FORMAT;

/// Regex pattern for validating host ids (lowercase FQDNs)
static HOST_ID_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z0-9][a-z0-9\-]*(\.[a-z0-9][a-z0-9\-]*)+$")
        .expect("Invalid regex pattern")
});

/// Regex pattern for validating host keys (32 hex characters)
static HOST_KEY_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[0-9a-f]{32}$").expect("Invalid regex pattern"));

/// Check whether a string is a valid host id
///
/// Host ids are fully-qualified, lowercase domain names.
///
/// # Examples
///
/// ```
/// use muster_common::is_host_id;
///
/// assert!(is_host_id("client1.example.org"));
/// assert!(!is_host_id("client1"));
/// assert!(!is_host_id("Client1.Example.Org"));
/// ```
pub fn is_host_id(str: &str) -> bool {
    HOST_ID_PATTERN.is_match(str)
}

/// Lowercase a caller-supplied host id without validating it
pub fn forced_host_id(str: &str) -> String {
    str.trim().to_lowercase()
}

/// Check whether a string is a valid host key (32 hex characters)
pub fn is_host_key(str: &str) -> bool {
    HOST_KEY_PATTERN.is_match(str)
}

/// Generate a new random host key
///
/// # Examples
///
/// ```
/// use muster_common::{generate_host_key, is_host_key};
///
/// assert!(is_host_key(&generate_host_key()));
/// ```
pub fn generate_host_key() -> String {
    let mut rng = rand::rng();
    (0..crate::HOST_KEY_LENGTH)
        .map(|_| std::char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
        .collect()
}

/// Current time formatted as a persisted timestamp
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_id_validation() {
        assert!(is_host_id("depot.example.org"));
        assert!(is_host_id("a-1.b-2.c"));
        assert!(!is_host_id(""));
        assert!(!is_host_id("nodots"));
        assert!(!is_host_id("under_score.example.org"));
        assert!(!is_host_id("-leading.example.org"));
    }

    #[test]
    fn test_forced_host_id() {
        assert_eq!(forced_host_id(" Client1.Example.ORG "), "client1.example.org");
    }

    #[test]
    fn test_generated_host_key_is_valid() {
        let key = generate_host_key();
        assert_eq!(key.len(), 32);
        assert!(is_host_key(&key));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }
}
