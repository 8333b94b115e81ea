//! External credential provider boundary
//!
//! Non-host callers authenticate through an OS or directory service
//! (PAM, LDAP, domain groups). Those live outside this core; the trait is
//! their contract, and `StaticAuthProvider` is the in-memory reference
//! implementation used by tests and embedded deployments.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use muster_common::MusterError;

/// Credential verification and group lookup
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Verify a credential; failure raises an authentication error
    async fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<()>;

    /// Group memberships of a known user
    async fn get_groupnames(&self, username: &str) -> anyhow::Result<BTreeSet<String>>;
}

#[derive(Clone)]
struct StaticUser {
    password: String,
    groups: BTreeSet<String>,
}

/// In-memory credential store
#[derive(Default)]
pub struct StaticAuthProvider {
    users: DashMap<String, StaticUser>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        StaticAuthProvider::default()
    }

    pub fn add_user<I, S>(&self, username: &str, password: &str, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.to_string(),
            StaticUser {
                password: password.to_string(),
                groups: groups.into_iter().map(Into::into).collect(),
            },
        );
    }
}

#[async_trait]
impl AuthenticationProvider for StaticAuthProvider {
    async fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<()> {
        match self.users.get(username) {
            Some(user) if user.password == password => Ok(()),
            _ => Err(MusterError::Authentication(
                username.to_string(),
                "invalid credentials".to_string(),
            )
            .into()),
        }
    }

    async fn get_groupnames(&self, username: &str) -> anyhow::Result<BTreeSet<String>> {
        Ok(self
            .users
            .get(username)
            .map(|user| user.groups.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticAuthProvider::new();
        provider.add_user("admin", "linux123", ["admins", "staff"]);

        assert!(provider.authenticate("admin", "linux123").await.is_ok());
        assert!(provider.authenticate("admin", "wrong").await.is_err());
        assert!(provider.authenticate("nobody", "linux123").await.is_err());

        let groups = provider.get_groupnames("admin").await.unwrap();
        assert!(groups.contains("admins"));
    }
}
