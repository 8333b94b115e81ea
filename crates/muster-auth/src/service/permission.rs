//! ACL evaluation and attribute-level filtering
//!
//! The ACL table is compiled once at construction; evaluation walks the
//! rules of the first entry whose pattern matches the called method and
//! unions their grants. An unconditional grant short-circuits to full
//! access; otherwise the surviving grant scopes drive per-object attribute
//! filtering of parameters and results.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use muster_api::{Entity, entity::object_to_map};
use muster_common::MusterError;

use crate::model::{AclEntry, AclRule, AclRuleKind, AuthContext, CallerKind};

/// Attributes that identify an object as the caller's own record
pub const SELF_ATTRIBUTES: &'static [&'static str] =
    &["id", "objectId", "hostId", "clientId", "boundToHost"];

/// One surviving conditional grant
#[derive(Debug, Clone, PartialEq)]
pub struct GrantScope {
    /// Grant applies only to rows identifying the caller
    pub self_only: bool,
    /// Attribute whitelist; empty means all attributes
    pub allow_attributes: BTreeSet<String>,
    /// Attribute blacklist
    pub deny_attributes: BTreeSet<String>,
}

/// Result of evaluating the ACL for one call
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// At least one unconditional grant: parameters and results pass
    /// unfiltered
    Full,
    /// Only conditional grants: parameters and results are filtered
    /// per object and attribute
    Restricted(Vec<GrantScope>),
}

impl Access {
    /// Filter rows returned to the caller
    pub fn filter_read<E: Entity>(&self, identity: &str, rows: Vec<E>) -> Vec<E> {
        match self {
            Access::Full => rows,
            Access::Restricted(scopes) => rows
                .into_iter()
                .filter_map(|row| filter_object(scopes, identity, row))
                .collect(),
        }
    }

    /// Filter objects supplied by the caller for a write
    ///
    /// Dropping some objects is non-fatal; dropping all of them denies the
    /// call.
    pub fn filter_write<E: Entity>(
        &self,
        identity: &str,
        method: &str,
        objs: Vec<E>,
    ) -> Result<Vec<E>, MusterError> {
        match self {
            Access::Full => Ok(objs),
            Access::Restricted(scopes) => {
                let supplied = objs.len();
                let kept: Vec<E> = objs
                    .into_iter()
                    .filter_map(|obj| filter_object(scopes, identity, obj))
                    .collect();
                if kept.is_empty() && supplied > 0 {
                    return Err(MusterError::PermissionDenied(format!(
                        "{}: none of the {} supplied objects is accessible",
                        method, supplied
                    )));
                }
                if kept.len() < supplied {
                    warn!(
                        method,
                        dropped = supplied - kept.len(),
                        "objects removed from call parameters by acl"
                    );
                }
                Ok(kept)
            }
        }
    }

    /// Whether a row owned by `owner` is visible at all
    pub fn permits_owner(&self, identity: &str, owner: &str) -> bool {
        match self {
            Access::Full => true,
            Access::Restricted(scopes) => {
                scopes.iter().any(|s| !s.self_only || owner == identity)
            }
        }
    }
}

fn filter_object<E: Entity>(scopes: &[GrantScope], identity: &str, obj: E) -> Option<E> {
    let mut map = object_to_map(&obj);
    let is_self = SELF_ATTRIBUTES
        .iter()
        .any(|attr| map.get(*attr).and_then(Value::as_str) == Some(identity));

    let mut allowed: BTreeSet<&str> = BTreeSet::new();
    let mut granted = false;
    for scope in scopes {
        if scope.self_only && !is_self {
            continue;
        }
        granted = true;
        if scope.allow_attributes.is_empty() {
            allowed.extend(
                E::ATTRIBUTES
                    .iter()
                    .copied()
                    .filter(|a| !scope.deny_attributes.contains(*a)),
            );
        } else {
            allowed.extend(
                scope
                    .allow_attributes
                    .iter()
                    .map(String::as_str)
                    .filter(|a| !scope.deny_attributes.contains(*a)),
            );
        }
    }

    if !granted || allowed.is_empty() {
        return None;
    }

    // Dropped keys are refilled with defaults on deserialization
    map.retain(|key, _| {
        allowed.contains(key.as_str())
            || E::IDENT_ATTRIBUTES.contains(&key.as_str())
            || key == "type"
    });
    serde_json::from_value(Value::Object(map)).ok()
}

/// The compiled ACL table
pub struct AccessControl {
    entries: Vec<(Regex, Vec<AclRule>)>,
}

impl AccessControl {
    /// Compile the rule table; malformed patterns are a configuration error
    pub fn new(entries: &[AclEntry]) -> anyhow::Result<Self> {
        let mut compiled = Vec::with_capacity(entries.len());
        for entry in entries {
            let regex = Regex::new(&format!("^(?:{})$", entry.pattern)).map_err(|e| {
                MusterError::Configuration(format!(
                    "invalid acl pattern '{}': {}",
                    entry.pattern, e
                ))
            })?;
            compiled.push((regex, entry.rules.clone()));
        }
        Ok(AccessControl { entries: compiled })
    }

    /// Evaluate the table for one method call
    ///
    /// The first entry whose pattern matches decides; no matching entry or
    /// no applicable rule denies the call.
    pub fn evaluate(&self, ctx: &AuthContext, method: &str) -> Result<Access, MusterError> {
        let (_, rules) = self
            .entries
            .iter()
            .find(|(re, _)| re.is_match(method))
            .ok_or_else(|| {
                MusterError::PermissionDenied(format!("no acl entry matches method '{}'", method))
            })?;

        let mut scopes = Vec::new();
        for rule in rules {
            if !rule_applies(ctx, rule) {
                continue;
            }
            if rule.is_unconditional() {
                return Ok(Access::Full);
            }
            scopes.push(GrantScope {
                self_only: rule.kind == AclRuleKind::SelfOnly,
                allow_attributes: rule.allow_attributes.iter().cloned().collect(),
                deny_attributes: rule.deny_attributes.iter().cloned().collect(),
            });
        }

        if scopes.is_empty() {
            return Err(MusterError::PermissionDenied(format!(
                "no acl rule grants '{}' to '{}'",
                method, ctx.identity
            )));
        }
        Ok(Access::Restricted(scopes))
    }
}

fn rule_applies(ctx: &AuthContext, rule: &AclRule) -> bool {
    let id_listed = rule.ids.is_empty() || rule.ids.iter().any(|id| id == &ctx.identity);
    match rule.kind {
        AclRuleKind::All | AclRuleKind::SelfOnly => true,
        AclRuleKind::DepotHost => {
            matches!(&ctx.kind, CallerKind::Host { host_type } if host_type.is_depot())
                && id_listed
        }
        AclRuleKind::ClientHost => {
            matches!(
                &ctx.kind,
                CallerKind::Host {
                    host_type: muster_api::entity::HostType::Client
                }
            ) && id_listed
        }
        AclRuleKind::SysGroup => match &ctx.kind {
            CallerKind::User { groups } => {
                rule.ids.is_empty() || rule.ids.iter().any(|g| groups.contains(g))
            }
            CallerKind::Host { .. } => false,
        },
        AclRuleKind::SysUser => matches!(&ctx.kind, CallerKind::User { .. }) && id_listed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::entity::{Host, HostType};

    fn host_row(id: &str) -> Host {
        let mut host = Host::new_client(id);
        host.host_key = Some(muster_common::generate_host_key());
        host.description = Some("workstation".to_string());
        host
    }

    fn client_ctx(id: &str) -> AuthContext {
        AuthContext::for_host(id, HostType::Client)
    }

    fn admin_ctx() -> AuthContext {
        AuthContext::for_user("admin", ["admins".to_string()].into_iter().collect())
    }

    #[test]
    fn test_no_matching_pattern_denies() {
        let acl = AccessControl::new(&[AclEntry::new(
            "host_.*",
            vec![AclRule::new(AclRuleKind::All)],
        )])
        .unwrap();
        assert!(acl.evaluate(&admin_ctx(), "product_getObjects").is_err());
    }

    #[test]
    fn test_first_matching_entry_decides() {
        let acl = AccessControl::new(&[
            AclEntry::new("host_.*", vec![AclRule::new(AclRuleKind::SysUser)]),
            AclEntry::new(".*", vec![AclRule::new(AclRuleKind::All)]),
        ])
        .unwrap();

        // The client matches the first entry, whose only rule is user-kind
        let err = acl
            .evaluate(&client_ctx("client1.example.org"), "host_getObjects")
            .unwrap_err();
        assert!(matches!(err, MusterError::PermissionDenied(_)));
    }

    #[test]
    fn test_unconditional_grant_bypasses_filtering() {
        let acl = AccessControl::new(&[AclEntry::new(
            ".*",
            vec![
                AclRule {
                    deny_attributes: vec!["hostKey".to_string()],
                    ..AclRule::new(AclRuleKind::SelfOnly)
                },
                AclRule::new(AclRuleKind::SysGroup),
            ],
        )])
        .unwrap();

        let access = acl.evaluate(&admin_ctx(), "host_getObjects").unwrap();
        assert_eq!(access, Access::Full);

        let rows = access.filter_read(
            "admin",
            vec![host_row("client1.example.org"), host_row("client2.example.org")],
        );
        assert_eq!(rows.len(), 2);
        assert!(rows[0].host_key.is_some());
    }

    #[test]
    fn test_self_rule_hides_other_objects() {
        let acl = AccessControl::new(&[AclEntry::new(
            "host_.*",
            vec![AclRule::new(AclRuleKind::SelfOnly)],
        )])
        .unwrap();

        let ctx = client_ctx("client1.example.org");
        let access = acl.evaluate(&ctx, "host_getObjects").unwrap();
        let rows = access.filter_read(
            &ctx.identity,
            vec![host_row("client1.example.org"), host_row("client2.example.org")],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "client1.example.org");
        assert!(rows[0].host_key.is_some());
    }

    #[test]
    fn test_deny_attributes_are_removed() {
        let acl = AccessControl::new(&[AclEntry::new(
            "host_.*",
            vec![AclRule {
                deny_attributes: vec!["hostKey".to_string()],
                ..AclRule::new(AclRuleKind::ClientHost)
            }],
        )])
        .unwrap();

        let ctx = client_ctx("client1.example.org");
        let access = acl.evaluate(&ctx, "host_getObjects").unwrap();
        let rows = access.filter_read(&ctx.identity, vec![host_row("client2.example.org")]);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].host_key.is_none());
        assert_eq!(rows[0].description.as_deref(), Some("workstation"));
    }

    #[test]
    fn test_allow_attributes_are_monotonic() {
        let restricted = AclRule {
            allow_attributes: vec!["description".to_string()],
            ..AclRule::new(AclRuleKind::ClientHost)
        };
        let widened = AclRule {
            allow_attributes: vec!["description".to_string(), "notes".to_string()],
            ..AclRule::new(AclRuleKind::ClientHost)
        };

        let ctx = client_ctx("client1.example.org");
        let visible = |rules: Vec<AclRule>| {
            let acl = AccessControl::new(&[AclEntry::new("host_.*", rules)]).unwrap();
            let access = acl.evaluate(&ctx, "host_getObjects").unwrap();
            let mut row = host_row("client2.example.org");
            row.notes = Some("n".to_string());
            access.filter_read(&ctx.identity, vec![row])
        };

        let narrow = visible(vec![restricted.clone()]);
        let wide = visible(vec![widened]);
        assert_eq!(narrow[0].description.as_deref(), Some("workstation"));
        assert!(narrow[0].notes.is_none());
        // Widening the allow list never removes a previously-visible attribute
        assert_eq!(wide[0].description.as_deref(), Some("workstation"));
        assert_eq!(wide[0].notes.as_deref(), Some("n"));
    }

    #[test]
    fn test_write_with_all_objects_dropped_is_denied() {
        let acl = AccessControl::new(&[AclEntry::new(
            "host_.*",
            vec![AclRule::new(AclRuleKind::SelfOnly)],
        )])
        .unwrap();

        let ctx = client_ctx("client1.example.org");
        let access = acl.evaluate(&ctx, "host_updateObject").unwrap();

        let result = access.filter_write(
            &ctx.identity,
            "host_updateObject",
            vec![host_row("client2.example.org")],
        );
        assert!(result.is_err());

        // A mixed batch passes with the foreign object dropped
        let kept = access
            .filter_write(
                &ctx.identity,
                "host_updateObject",
                vec![host_row("client1.example.org"), host_row("client2.example.org")],
            )
            .unwrap();
        assert_eq!(kept.len(), 1);
    }
}
