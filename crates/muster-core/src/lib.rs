//! Muster Core - Business layer and composition root
//!
//! This crate provides:
//! - `ExtendedConfigDataBackend`: computed defaults, referential integrity,
//!   cascades, the ProductOnClient state machine, and the insert-or-update
//!   convenience operations over any storage backend
//! - The product action sequencer and dependency resolver
//! - The license pool allocator
//! - `BackendManager`: the composition root wiring dispatcher, business
//!   layer, and access control

pub mod extended;
pub mod manager;
pub mod sequence;
pub mod service;

pub use extended::ExtendedConfigDataBackend;
pub use manager::{BackendManager, BackendManagerBuilder};
