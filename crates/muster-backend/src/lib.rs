//! Muster Backend - Storage contract and method dispatcher
//!
//! This crate provides:
//! - The `ObjectBackend`/`ConfigDataBackend` storage contract and the
//!   `ExtendedBackend` business-layer surface
//! - Operation naming and interface introspection
//! - The in-memory reference backend
//! - The rule-driven method dispatcher with its merge semantics

pub mod contract;
pub mod dispatch;
pub mod memory;
pub mod operation;
pub mod options;

pub use contract::{
    BackendInfo, ClientToDepotserver, ConfigDataBackend, ExtendedBackend, ObjectBackend,
    ObjectBackendExt, PoolSelector,
};
pub use dispatch::{DispatchRule, Dispatcher};
pub use memory::MemoryBackend;
pub use operation::{MethodInterface, Verb, extended_interface, method_name, storage_interface};
pub use options::BackendOptions;
