//! Access-control model
//!
//! ACL configuration is an ordered list of entries, each pairing a
//! method-name pattern with the rules granting access to it. The structures
//! deserialize directly from the persisted rule table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use muster_api::entity::HostType;

/// Who a rule grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclRuleKind {
    /// Grants every caller
    All,
    /// Grants callers authenticated as a depot or config server
    DepotHost,
    /// Grants callers authenticated as a client
    ClientHost,
    /// Grants users belonging to one of the listed system groups
    SysGroup,
    /// Grants the listed users
    SysUser,
    /// Grants access only to rows identifying the caller itself
    #[serde(rename = "self")]
    SelfOnly,
}

/// One access grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AclRule {
    #[serde(rename = "type")]
    pub kind: AclRuleKind,
    /// Allow-list of host ids, user names, or group names, depending on the
    /// rule kind; empty means unrestricted
    pub ids: Vec<String>,
    /// Attribute whitelist; empty means all attributes
    pub allow_attributes: Vec<String>,
    /// Attribute blacklist applied to the full attribute set
    pub deny_attributes: Vec<String>,
}

impl Default for AclRule {
    fn default() -> Self {
        AclRule {
            kind: AclRuleKind::All,
            ids: Vec::new(),
            allow_attributes: Vec::new(),
            deny_attributes: Vec::new(),
        }
    }
}

impl AclRule {
    pub fn new(kind: AclRuleKind) -> Self {
        AclRule {
            kind,
            ..Default::default()
        }
    }

    /// Whether this rule grants everything it matches, without attribute
    /// restrictions
    pub fn is_unconditional(&self) -> bool {
        self.kind != AclRuleKind::SelfOnly
            && self.allow_attributes.is_empty()
            && self.deny_attributes.is_empty()
    }
}

/// One ACL table entry: a method-name pattern and its grant rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclEntry {
    pub pattern: String,
    pub rules: Vec<AclRule>,
}

impl AclEntry {
    pub fn new(pattern: impl Into<String>, rules: Vec<AclRule>) -> Self {
        AclEntry {
            pattern: pattern.into(),
            rules,
        }
    }
}

/// The authenticated caller of a request context
#[derive(Debug, Clone, PartialEq)]
pub enum CallerKind {
    /// Authenticated against a stored host key
    Host { host_type: HostType },
    /// Authenticated through the external credential provider
    User { groups: BTreeSet<String> },
}

/// Immutable per-session authentication result
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    /// Host id or user name the caller authenticated as
    pub identity: String,
    pub session_id: String,
    pub kind: CallerKind,
}

impl AuthContext {
    pub fn for_host(identity: impl Into<String>, host_type: HostType) -> Self {
        AuthContext {
            identity: identity.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            kind: CallerKind::Host { host_type },
        }
    }

    pub fn for_user(identity: impl Into<String>, groups: BTreeSet<String>) -> Self {
        AuthContext {
            identity: identity.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            kind: CallerKind::User { groups },
        }
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        match &self.kind {
            CallerKind::User { groups } => groups.contains(group),
            CallerKind::Host { .. } => false,
        }
    }
}
