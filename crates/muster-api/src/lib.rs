//! Muster API - Entity model and filter language
//!
//! This crate defines:
//! - The typed entity records (hosts, configs, products, groups, licenses,
//!   audit facts) with their composite natural keys
//! - The partial-match filter language used by every `*_get_objects`
//!   operation
//! - Field validation helpers

pub mod entity;
pub mod filter;
pub mod validation;

pub use entity::{Entity, Ident, object_to_map, project_attributes};
pub use filter::{Filter, FilterValue};
