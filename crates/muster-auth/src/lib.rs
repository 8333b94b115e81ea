//! Muster Auth - Authentication and access control
//!
//! This crate provides:
//! - Caller authentication (host-key or external credential provider)
//! - The ordered ACL rule table with attribute-level filtering
//! - `ProtectedBackend`, the per-session ACL-enforcing backend wrapper

pub mod model;
pub mod protected;
pub mod provider;
pub mod service;

pub use model::{AclEntry, AclRule, AclRuleKind, AuthContext, CallerKind};
pub use protected::ProtectedBackend;
pub use provider::{AuthenticationProvider, StaticAuthProvider};
pub use service::{Access, AccessControl, authenticate};
