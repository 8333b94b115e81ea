//! Caller authentication
//!
//! Two mutually exclusive modes, selected by the shape of the identity:
//! a fully-qualified host id authenticates against the host's stored key,
//! anything else goes through the external credential provider.

use tracing::debug;

use muster_api::entity::Host;
use muster_api::{Filter, FilterValue};
use muster_backend::{ConfigDataBackend, ObjectBackend};
use muster_common::MusterError;

use crate::model::AuthContext;
use crate::provider::AuthenticationProvider;

/// Authenticate an identity/secret pair against the backend or the
/// credential provider
pub async fn authenticate(
    backend: &dyn ConfigDataBackend,
    provider: Option<&dyn AuthenticationProvider>,
    identity: &str,
    secret: &str,
) -> anyhow::Result<AuthContext> {
    if muster_common::is_host_id(identity) {
        return authenticate_host(backend, identity, secret).await;
    }
    authenticate_user(provider, identity, secret).await
}

async fn authenticate_host(
    backend: &dyn ConfigDataBackend,
    host_id: &str,
    secret: &str,
) -> anyhow::Result<AuthContext> {
    let hosts: Vec<Host> = backend
        .get_objects(
            &[],
            Filter::new().with("id", FilterValue::from(host_id)),
        )
        .await?;

    let host = hosts.into_iter().next().ok_or_else(|| {
        MusterError::Authentication(host_id.to_string(), "unknown host".to_string())
    })?;

    match &host.host_key {
        Some(key) if !secret.is_empty() && key == secret => {
            debug!(host = %host_id, "host authenticated");
            Ok(AuthContext::for_host(host_id, host.host_type))
        }
        Some(_) => Err(MusterError::Authentication(
            host_id.to_string(),
            "invalid host key".to_string(),
        )
        .into()),
        None => Err(MusterError::Authentication(
            host_id.to_string(),
            "host has no key set".to_string(),
        )
        .into()),
    }
}

async fn authenticate_user(
    provider: Option<&dyn AuthenticationProvider>,
    username: &str,
    password: &str,
) -> anyhow::Result<AuthContext> {
    let provider = provider.ok_or_else(|| {
        MusterError::Authentication(
            username.to_string(),
            "no credential provider configured".to_string(),
        )
    })?;

    provider.authenticate(username, password).await?;
    let groups = provider.get_groupnames(username).await?;
    debug!(user = %username, groups = groups.len(), "user authenticated");
    Ok(AuthContext::for_user(username, groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CallerKind;
    use crate::provider::StaticAuthProvider;
    use muster_api::entity::HostType;
    use muster_backend::MemoryBackend;

    async fn backend_with_client(key: &str) -> MemoryBackend {
        let backend = MemoryBackend::new();
        let mut host = Host::new_client("client1.example.org");
        host.host_key = Some(key.to_string());
        backend.insert_object(host).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_host_authentication() {
        let key = muster_common::generate_host_key();
        let backend = backend_with_client(&key).await;

        let ctx = authenticate(&backend, None, "client1.example.org", &key)
            .await
            .unwrap();
        assert_eq!(ctx.identity, "client1.example.org");
        assert_eq!(
            ctx.kind,
            CallerKind::Host {
                host_type: HostType::Client
            }
        );

        let err = authenticate(&backend, None, "client1.example.org", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MusterError>(),
            Some(MusterError::Authentication(_, _))
        ));
    }

    #[tokio::test]
    async fn test_unknown_host_fails() {
        let backend = MemoryBackend::new();
        let result = authenticate(&backend, None, "ghost.example.org", "x").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_user_authentication_requires_provider() {
        let backend = MemoryBackend::new();
        assert!(authenticate(&backend, None, "admin", "x").await.is_err());

        let provider = StaticAuthProvider::new();
        provider.add_user("admin", "secret", ["admins"]);
        let ctx = authenticate(&backend, Some(&provider), "admin", "secret")
            .await
            .unwrap();
        assert!(ctx.is_in_group("admins"));
    }
}
