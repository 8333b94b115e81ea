//! Access-control scenarios over the composed stack: host and user
//! authentication, self rules, attribute filtering, and write denial.

use std::sync::Arc;

use muster_api::Filter;
use muster_api::entity::{Host, ProductOnClient};
use muster_auth::{AclEntry, AclRule, AclRuleKind, StaticAuthProvider};
use muster_backend::{ConfigDataBackend, MemoryBackend, ObjectBackend};
use muster_common::MusterError;
use muster_core::BackendManager;

use muster_integration_tests::{CLIENT1, CLIENT2, host_key, seed};

fn client_acl() -> Vec<AclEntry> {
    vec![
        AclEntry::new(
            "host_.*",
            vec![
                AclRule::new(AclRuleKind::SelfOnly),
                AclRule::new(AclRuleKind::SysGroup),
            ],
        ),
        AclEntry::new(
            "productOnClient_.*",
            vec![AclRule {
                kind: AclRuleKind::ClientHost,
                ..Default::default()
            }],
        ),
        AclEntry::new(
            "backend_.*",
            vec![AclRule::new(AclRuleKind::All)],
        ),
    ]
}

async fn manager_with_acl() -> (Arc<dyn ConfigDataBackend>, BackendManager) {
    let storage: Arc<dyn ConfigDataBackend> = Arc::new(MemoryBackend::new());
    seed(&*storage).await;

    let provider = StaticAuthProvider::new();
    provider.add_user("admin", "linux123", ["admins"]);

    let manager = BackendManager::builder()
        .backend("memory", storage.clone())
        .acl(client_acl())
        .auth_provider(Arc::new(provider))
        .build()
        .unwrap();
    (storage, manager)
}

#[tokio::test]
async fn test_self_rule_limits_host_reads_to_own_record() {
    let (storage, manager) = manager_with_acl().await;
    let key = host_key(&*storage, CLIENT1).await;

    let session = manager.login(CLIENT1, &key).await.unwrap();
    let hosts: Vec<Host> = session.get_objects(&[], Filter::new()).await.unwrap();

    // Three hosts exist, the caller sees only itself
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].id, CLIENT1);
    assert!(hosts[0].host_key.is_some());
}

#[tokio::test]
async fn test_group_member_sees_the_whole_fleet() {
    let (_, manager) = manager_with_acl().await;

    let session = manager.login("admin", "linux123").await.unwrap();
    let hosts: Vec<Host> = session.get_objects(&[], Filter::new()).await.unwrap();
    assert_eq!(hosts.len(), 3);
}

#[tokio::test]
async fn test_unmatched_method_is_denied() {
    let (storage, manager) = manager_with_acl().await;
    let key = host_key(&*storage, CLIENT1).await;
    let session = manager.login(CLIENT1, &key).await.unwrap();

    // No ACL entry covers config methods at all
    let result: anyhow::Result<Vec<muster_api::entity::Config>> =
        session.get_objects(&[], Filter::new()).await;
    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MusterError>(),
        Some(MusterError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_self_rule_denies_writes_for_other_hosts() {
    let (storage, manager) = manager_with_acl().await;
    let key = host_key(&*storage, CLIENT1).await;
    let session = manager.login(CLIENT1, &key).await.unwrap();

    let mut other = Host::new_client(CLIENT2);
    other.description = Some("hijacked".to_string());
    let err = session.update_object(other).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MusterError>(),
        Some(MusterError::PermissionDenied(_))
    ));

    // The caller's own record stays writable
    let mut own = Host::new_client(CLIENT1);
    own.description = Some("mine".to_string());
    session.update_object(own).await.unwrap();

    let rows: Vec<Host> = storage
        .get_objects(&[], Filter::new().with("id", CLIENT1))
        .await
        .unwrap();
    assert_eq!(rows[0].description.as_deref(), Some("mine"));
}

#[tokio::test]
async fn test_attribute_restriction_hides_host_keys() {
    let storage: Arc<dyn ConfigDataBackend> = Arc::new(MemoryBackend::new());
    seed(&*storage).await;

    let provider = StaticAuthProvider::new();
    provider.add_user("helpdesk", "s3cret", ["support"]);

    let manager = BackendManager::builder()
        .backend("memory", storage.clone())
        .acl(vec![AclEntry::new(
            ".*",
            vec![AclRule {
                kind: AclRuleKind::SysGroup,
                ids: vec!["support".to_string()],
                deny_attributes: vec!["hostKey".to_string()],
                ..Default::default()
            }],
        )])
        .auth_provider(Arc::new(provider))
        .build()
        .unwrap();

    let session = manager.login("helpdesk", "s3cret").await.unwrap();
    let hosts: Vec<Host> = session.get_objects(&[], Filter::new()).await.unwrap();
    assert_eq!(hosts.len(), 3);
    assert!(hosts.iter().all(|h| h.host_key.is_none()));
    // Idents and the discriminant survive the filter
    assert!(hosts.iter().all(|h| !h.id.is_empty()));
}

#[tokio::test]
async fn test_bad_credentials_abort_before_dispatch() {
    let (_, manager) = manager_with_acl().await;

    let err = manager.login(CLIENT1, "wrong-key").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MusterError>(),
        Some(MusterError::Authentication(_, _))
    ));

    let err = manager.login("admin", "wrong-pass").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MusterError>(),
        Some(MusterError::Authentication(_, _))
    ));
}

#[tokio::test]
async fn test_client_kind_rule_covers_product_on_client() {
    let (storage, manager) = manager_with_acl().await;
    let key = host_key(&*storage, CLIENT1).await;
    let session = manager.login(CLIENT1, &key).await.unwrap();

    session
        .insert_object(ProductOnClient::with_action(
            "firefox",
            CLIENT1,
            muster_api::entity::ActionRequest::Setup,
        ))
        .await
        .unwrap();

    let rows: Vec<ProductOnClient> = session.get_objects(&[], Filter::new()).await.unwrap();
    assert_eq!(rows.len(), 1);

    // The admin user is not a client host: the client-kind rule denies
    let admin = manager.login("admin", "linux123").await.unwrap();
    let result: anyhow::Result<Vec<ProductOnClient>> =
        admin.get_objects(&[], Filter::new()).await;
    assert!(result.is_err());
}
