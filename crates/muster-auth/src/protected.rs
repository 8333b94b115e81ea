//! ACL-enforcing backend wrapper
//!
//! `ProtectedBackend` is the per-session view of a composed backend: it
//! carries the authenticated caller, evaluates the ACL for every method
//! call, filters call parameters and results, and otherwise forwards to the
//! wrapped business layer.

use std::sync::Arc;

use async_trait::async_trait;

use muster_api::{Entity, Filter};
use muster_backend::contract::{
    BackendInfo, ClientToDepotserver, ConfigDataBackend, ExtendedBackend, ObjectBackend,
    ObjectBackendExt, PoolSelector,
};
use muster_backend::operation::{MethodInterface, Verb, method_name};
use muster_backend::options::BackendOptions;
use muster_common::MusterError;

use muster_api::entity::LicenseOnClient;

use crate::model::AuthContext;
use crate::service::permission::{Access, AccessControl};

/// A composed backend bound to one authenticated caller
pub struct ProtectedBackend {
    inner: Arc<dyn ExtendedBackend>,
    acl: Arc<AccessControl>,
    context: AuthContext,
}

impl std::fmt::Debug for ProtectedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedBackend")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ProtectedBackend {
    pub fn new(inner: Arc<dyn ExtendedBackend>, acl: Arc<AccessControl>, context: AuthContext) -> Self {
        ProtectedBackend {
            inner,
            acl,
            context,
        }
    }

    pub fn context(&self) -> &AuthContext {
        &self.context
    }

    fn require(&self, method: &str) -> Result<Access, MusterError> {
        self.acl.evaluate(&self.context, method)
    }

    fn require_owner(&self, method: &str, owner: &str) -> Result<Access, MusterError> {
        let access = self.require(method)?;
        if !access.permits_owner(&self.context.identity, owner) {
            return Err(MusterError::PermissionDenied(format!(
                "{}: '{}' may not act for '{}'",
                method, self.context.identity, owner
            )));
        }
        Ok(access)
    }
}

#[async_trait]
impl<E: Entity> ObjectBackend<E> for ProtectedBackend
where
    dyn ExtendedBackend: ObjectBackend<E>,
{
    async fn insert_object(&self, obj: E) -> anyhow::Result<()> {
        let method = method_name::<E>(Verb::InsertObject);
        let access = self.require(&method)?;
        for obj in access.filter_write(&self.context.identity, &method, vec![obj])? {
            self.inner.insert_object(obj).await?;
        }
        Ok(())
    }

    async fn update_object(&self, obj: E) -> anyhow::Result<()> {
        let method = method_name::<E>(Verb::UpdateObject);
        let access = self.require(&method)?;
        for obj in access.filter_write(&self.context.identity, &method, vec![obj])? {
            self.inner.update_object(obj).await?;
        }
        Ok(())
    }

    async fn get_objects(&self, attributes: &[String], filter: Filter) -> anyhow::Result<Vec<E>> {
        let access = self.require(&method_name::<E>(Verb::GetObjects))?;
        let rows = self.inner.get_objects(attributes, filter).await?;
        Ok(access.filter_read(&self.context.identity, rows))
    }

    async fn delete_objects(&self, objs: Vec<E>) -> anyhow::Result<()> {
        let method = method_name::<E>(Verb::DeleteObjects);
        let access = self.require(&method)?;
        let objs = access.filter_write(&self.context.identity, &method, objs)?;
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl<E: Entity> ObjectBackendExt<E> for ProtectedBackend
where
    dyn ExtendedBackend: ObjectBackendExt<E>,
{
    async fn create_objects(&self, objs: Vec<E>) -> anyhow::Result<Vec<E>> {
        let method = method_name::<E>(Verb::CreateObjects);
        let access = self.require(&method)?;
        let objs = access.filter_write(&self.context.identity, &method, objs)?;
        let rows = self.inner.create_objects(objs).await?;
        Ok(access.filter_read(&self.context.identity, rows))
    }

    async fn update_objects(&self, objs: Vec<E>) -> anyhow::Result<Vec<E>> {
        let method = method_name::<E>(Verb::UpdateObjects);
        let access = self.require(&method)?;
        let objs = access.filter_write(&self.context.identity, &method, objs)?;
        let rows = self.inner.update_objects(objs).await?;
        Ok(access.filter_read(&self.context.identity, rows))
    }
}

#[async_trait]
impl ConfigDataBackend for ProtectedBackend {
    async fn backend_create_base(&self) -> anyhow::Result<()> {
        self.require("backend_createBase")?;
        self.inner.backend_create_base().await
    }

    async fn backend_delete_base(&self) -> anyhow::Result<()> {
        self.require("backend_deleteBase")?;
        self.inner.backend_delete_base().await
    }

    async fn backend_exit(&self) -> anyhow::Result<()> {
        self.require("backend_exit")?;
        self.inner.backend_exit().await
    }

    async fn backend_set_options(&self, options: BackendOptions) -> anyhow::Result<()> {
        self.require("backend_setOptions")?;
        self.inner.backend_set_options(options).await
    }

    async fn backend_get_options(&self) -> anyhow::Result<BackendOptions> {
        self.require("backend_getOptions")?;
        self.inner.backend_get_options().await
    }

    fn backend_get_interface(&self) -> Vec<MethodInterface> {
        match self.require("backend_getInterface") {
            Ok(_) => self.inner.backend_get_interface(),
            Err(_) => Vec::new(),
        }
    }

    async fn backend_info(&self) -> anyhow::Result<BackendInfo> {
        self.require("backend_info")?;
        self.inner.backend_info().await
    }
}

#[async_trait]
impl ExtendedBackend for ProtectedBackend {
    async fn config_state_get_client_to_depotserver(
        &self,
        depot_ids: Vec<String>,
        client_ids: Vec<String>,
        master_only: bool,
        product_ids: Vec<String>,
    ) -> anyhow::Result<Vec<ClientToDepotserver>> {
        let access = self.require("configState_getClientToDepotserver")?;
        let rows = self
            .inner
            .config_state_get_client_to_depotserver(depot_ids, client_ids, master_only, product_ids)
            .await?;
        Ok(rows
            .into_iter()
            .filter(|row| access.permits_owner(&self.context.identity, &row.client_id))
            .collect())
    }

    async fn license_on_client_get_or_create(
        &self,
        client_id: &str,
        selector: PoolSelector,
    ) -> anyhow::Result<LicenseOnClient> {
        self.require_owner("licenseOnClient_getOrCreate", client_id)?;
        self.inner
            .license_on_client_get_or_create(client_id, selector)
            .await
    }

    async fn audit_hardware_on_host_set_obsolete(&self, host_id: &str) -> anyhow::Result<()> {
        self.require_owner("auditHardwareOnHost_setObsolete", host_id)?;
        self.inner.audit_hardware_on_host_set_obsolete(host_id).await
    }
}
