//! The storage-backend and business-layer contracts
//!
//! `ObjectBackend<E>` carries the four CRUD primitives for one entity type;
//! `ConfigDataBackend` bundles them for every entity type together with the
//! lifecycle hooks every storage collaborator must implement.
//! `ExtendedBackend` is the surface the business layer adds on top.
//!
//! The original system mirrored backend methods through runtime proxy
//! generation; here the contract is a static trait family, so composition
//! types (dispatcher, business layer, access control) forward calls with
//! compile-time verification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use muster_api::entity::{
    AuditHardwareOnHost, AuditSoftware, AuditSoftwareOnClient, Config, ConfigState, Group, Host,
    LicenseContract, LicenseOnClient, LicensePool, ObjectToGroup, Product, ProductDependency,
    ProductOnClient, ProductOnDepot, ProductProperty, ProductPropertyState, SoftwareLicense,
    SoftwareLicenseToLicensePool,
};
use muster_api::{Entity, Filter};

use crate::operation::MethodInterface;
use crate::options::BackendOptions;

/// CRUD primitives for one entity type
#[async_trait]
pub trait ObjectBackend<E: Entity>: Send + Sync {
    /// Persist a new row; fails on malformed input
    async fn insert_object(&self, obj: E) -> anyhow::Result<()>;

    /// Update attributes of an existing row; the ident never changes and an
    /// unknown ident is a no-op
    async fn update_object(&self, obj: E) -> anyhow::Result<()>;

    /// Query rows by partial-match filter with optional attribute projection
    async fn get_objects(&self, attributes: &[String], filter: Filter) -> anyhow::Result<Vec<E>>;

    /// Delete the rows matching the given objects' idents
    async fn delete_objects(&self, objs: Vec<E>) -> anyhow::Result<()>;
}

/// Deployment information exposed by `backend_info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendInfo {
    pub version: String,
    /// Licensed module entitlement flags, signed upstream and passed
    /// through unverified by this layer
    pub modules: serde_json::Map<String, serde_json::Value>,
}

/// The contract every concrete storage backend implements
#[async_trait]
pub trait ConfigDataBackend:
    ObjectBackend<Host>
    + ObjectBackend<Config>
    + ObjectBackend<ConfigState>
    + ObjectBackend<Product>
    + ObjectBackend<ProductProperty>
    + ObjectBackend<ProductDependency>
    + ObjectBackend<ProductOnDepot>
    + ObjectBackend<ProductOnClient>
    + ObjectBackend<ProductPropertyState>
    + ObjectBackend<Group>
    + ObjectBackend<ObjectToGroup>
    + ObjectBackend<LicenseContract>
    + ObjectBackend<SoftwareLicense>
    + ObjectBackend<LicensePool>
    + ObjectBackend<SoftwareLicenseToLicensePool>
    + ObjectBackend<LicenseOnClient>
    + ObjectBackend<AuditSoftware>
    + ObjectBackend<AuditSoftwareOnClient>
    + ObjectBackend<AuditHardwareOnHost>
{
    /// Create the underlying storage structures
    async fn backend_create_base(&self) -> anyhow::Result<()>;

    /// Drop the underlying storage structures
    async fn backend_delete_base(&self) -> anyhow::Result<()>;

    /// Release held resources (connections, file handles)
    async fn backend_exit(&self) -> anyhow::Result<()>;

    async fn backend_set_options(&self, options: BackendOptions) -> anyhow::Result<()>;

    async fn backend_get_options(&self) -> anyhow::Result<BackendOptions>;

    /// Public method names and formal parameter lists, for client-side
    /// tooling. Computed once at construction.
    fn backend_get_interface(&self) -> Vec<MethodInterface>;

    async fn backend_info(&self) -> anyhow::Result<BackendInfo>;
}

/// Insert-or-update convenience operations for one entity type
///
/// "Create" on an existing ident behaves as an update, "update" on an
/// unknown ident behaves as an insert.
#[async_trait]
pub trait ObjectBackendExt<E: Entity>: ObjectBackend<E> {
    /// Insert or update each object, returning the affected rows when the
    /// `return_objects_on_update_and_create` option is set
    async fn create_objects(&self, objs: Vec<E>) -> anyhow::Result<Vec<E>>;

    /// Alias semantics of [`Self::create_objects`] with update-first probes
    async fn update_objects(&self, objs: Vec<E>) -> anyhow::Result<Vec<E>>;
}

/// One client's depot assignment, with interchangeable alternatives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientToDepotserver {
    pub client_id: String,
    pub depot_id: String,
    /// Depots whose product version vectors are identical for the
    /// constrained product set
    pub alternative_depot_ids: Vec<String>,
}

/// How to locate the license pool for an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolSelector {
    PoolId(String),
    ProductId(String),
    WindowsSoftwareId(String),
}

/// The business-layer surface: the storage contract plus convenience and
/// derived operations
#[async_trait]
pub trait ExtendedBackend:
    ConfigDataBackend
    + ObjectBackendExt<Host>
    + ObjectBackendExt<Config>
    + ObjectBackendExt<ConfigState>
    + ObjectBackendExt<Product>
    + ObjectBackendExt<ProductProperty>
    + ObjectBackendExt<ProductDependency>
    + ObjectBackendExt<ProductOnDepot>
    + ObjectBackendExt<ProductOnClient>
    + ObjectBackendExt<ProductPropertyState>
    + ObjectBackendExt<Group>
    + ObjectBackendExt<ObjectToGroup>
    + ObjectBackendExt<LicenseContract>
    + ObjectBackendExt<SoftwareLicense>
    + ObjectBackendExt<LicensePool>
    + ObjectBackendExt<SoftwareLicenseToLicensePool>
    + ObjectBackendExt<LicenseOnClient>
    + ObjectBackendExt<AuditSoftware>
    + ObjectBackendExt<AuditSoftwareOnClient>
    + ObjectBackendExt<AuditHardwareOnHost>
{
    /// Resolve the assigned depot of each client, optionally restricted to
    /// master depots, optionally computing interchangeable alternatives for
    /// the given product-id set
    async fn config_state_get_client_to_depotserver(
        &self,
        depot_ids: Vec<String>,
        client_ids: Vec<String>,
        master_only: bool,
        product_ids: Vec<String>,
    ) -> anyhow::Result<Vec<ClientToDepotserver>>;

    /// Reuse or allocate a license for one client out of one pool
    async fn license_on_client_get_or_create(
        &self,
        client_id: &str,
        selector: PoolSelector,
    ) -> anyhow::Result<LicenseOnClient>;

    /// Flip all present hardware audit rows of a host to obsolete
    async fn audit_hardware_on_host_set_obsolete(&self, host_id: &str) -> anyhow::Result<()>;
}
