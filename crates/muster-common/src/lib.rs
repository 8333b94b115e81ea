//! Muster Common - Shared types, errors, and utilities
//!
//! This crate provides the foundational pieces used across all muster
//! components:
//! - Error types and the anyhow-based application error wrapper
//! - Domain constants shared between the backend and business layers
//! - Utility functions (timestamps, host ids, host keys)

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{AppError, MusterError};
pub use utils::{forced_host_id, generate_host_key, is_host_id, is_host_key, timestamp};

/// Config id holding a client's assigned depot
pub const CONFIG_ID_DEPOT: &str = "clientconfig.depot.id";

/// Config id selecting the product sequencing algorithm
pub const CONFIG_ID_PRODUCT_SORT_ALGORITHM: &str = "product_sort_algorithm";

/// Sequencing algorithm selected when no config value is present
pub const DEFAULT_PRODUCT_SORT_ALGORITHM: &str = "algorithm1";

/// Timestamp format used for all persisted date-time attributes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of a generated host key (hex characters)
pub const HOST_KEY_LENGTH: usize = 32;

/// Requirement types for product dependencies
pub const REQUIREMENT_TYPE_BEFORE: &str = "before";
pub const REQUIREMENT_TYPE_AFTER: &str = "after";
