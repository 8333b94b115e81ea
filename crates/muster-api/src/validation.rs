//! Input validation utilities for the muster entity model
//!
//! This module provides validation functions for entity fields.

use std::sync::LazyLock;

use validator::ValidationError;

/// Maximum length for host ids
pub const MAX_HOST_ID_LENGTH: usize = 255;

/// Maximum length for object ids (configs, products, groups, pools)
pub const MAX_OBJECT_ID_LENGTH: usize = 256;

/// Maximum length for version strings
pub const MAX_VERSION_LENGTH: usize = 64;

static OBJECT_ID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z0-9._:\-]+$").expect("Invalid regex pattern"));

static VERSION_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z0-9.]+$").expect("Invalid regex pattern"));

/// Validate a host id
///
/// Host ids must:
/// - Not be empty
/// - Not exceed MAX_HOST_ID_LENGTH characters
/// - Be fully-qualified, lowercase domain names
pub fn validate_host_id(host_id: &str) -> Result<(), ValidationError> {
    if host_id.is_empty() {
        return Err(ValidationError::new("host_id_empty"));
    }
    if host_id.len() > MAX_HOST_ID_LENGTH {
        return Err(ValidationError::new("host_id_too_long"));
    }
    if !muster_common::is_host_id(host_id) {
        return Err(ValidationError::new("host_id_not_fqdn"));
    }
    Ok(())
}

/// Validate an object id (config, product, group, pool, contract, ...)
///
/// Object ids must:
/// - Not be empty
/// - Not exceed MAX_OBJECT_ID_LENGTH characters
/// - Contain only alphanumeric characters, dots, colons, hyphens, and
///   underscores
pub fn validate_object_id(object_id: &str) -> Result<(), ValidationError> {
    if object_id.is_empty() {
        return Err(ValidationError::new("object_id_empty"));
    }
    if object_id.len() > MAX_OBJECT_ID_LENGTH {
        return Err(ValidationError::new("object_id_too_long"));
    }
    if !OBJECT_ID_PATTERN.is_match(object_id) {
        return Err(ValidationError::new("object_id_invalid_chars"));
    }
    Ok(())
}

/// Validate a product or package version
///
/// Versions must not be empty, must not contain `_` or `-` (the dash
/// separates product from package version in display form), and are
/// otherwise alphanumeric with dots.
pub fn validate_version(version: &str) -> Result<(), ValidationError> {
    if version.is_empty() {
        return Err(ValidationError::new("version_empty"));
    }
    if version.len() > MAX_VERSION_LENGTH {
        return Err(ValidationError::new("version_too_long"));
    }
    if !VERSION_PATTERN.is_match(version) {
        return Err(ValidationError::new("version_invalid_chars"));
    }
    Ok(())
}

/// Validate a product priority (-100..=100)
pub fn validate_priority(priority: i32) -> Result<(), ValidationError> {
    if !(-100..=100).contains(&priority) {
        return Err(ValidationError::new("priority_out_of_range"));
    }
    Ok(())
}

/// Validate a host key (32 hex characters)
pub fn validate_host_key(key: &str) -> Result<(), ValidationError> {
    if !muster_common::is_host_key(key) {
        return Err(ValidationError::new("host_key_malformed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_host_id() {
        assert!(validate_host_id("client1.example.org").is_ok());
        assert!(validate_host_id("").is_err());
        assert!(validate_host_id("client1").is_err());
        assert!(validate_host_id("Client1.Example.Org").is_err());
    }

    #[test]
    fn test_validate_object_id() {
        assert!(validate_object_id("clientconfig.depot.id").is_ok());
        assert!(validate_object_id("product_sort_algorithm").is_ok());
        assert!(validate_object_id("firefox-esr").is_ok());
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id("with spaces").is_err());
        assert!(validate_object_id("with/slash").is_err());
    }

    #[test]
    fn test_validate_version() {
        assert!(validate_version("1.0").is_ok());
        assert!(validate_version("140.0.4esr").is_ok());
        assert!(validate_version("1.0_2").is_err());
        assert!(validate_version("1.0-2").is_err());
        assert!(validate_version("").is_err());
    }

    #[test]
    fn test_validate_priority() {
        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(-100).is_ok());
        assert!(validate_priority(100).is_ok());
        assert!(validate_priority(101).is_err());
    }
}
