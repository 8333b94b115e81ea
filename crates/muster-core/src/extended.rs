//! The extended (business-layer) backend
//!
//! Wraps a single storage backend, which may itself be a dispatcher, and
//! layers computed defaults, referential integrity, cascades, state-machine
//! transitions, and the insert-or-update convenience operations on top.
//! Behaviors are toggled per instance through `BackendOptions`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use muster_api::entity::{
    AuditHardwareOnHost, AuditSoftware, AuditSoftwareOnClient, Config, ConfigState, Group, Host,
    LicenseContract, LicenseOnClient, LicensePool, ObjectToGroup, Product, ProductDependency,
    ProductOnClient, ProductOnDepot, ProductProperty, ProductPropertyState, SoftwareLicense,
    SoftwareLicenseToLicensePool,
};
use muster_api::{Entity, Filter, entity::object_to_map};
use muster_backend::contract::{
    BackendInfo, ClientToDepotserver, ConfigDataBackend, ExtendedBackend, ObjectBackend,
    ObjectBackendExt, PoolSelector,
};
use muster_backend::operation::{MethodInterface, extended_interface};
use muster_backend::options::BackendOptions;

use crate::sequence;
use crate::service::{audit, config, host, license, product};

/// Business layer over one storage backend
pub struct ExtendedConfigDataBackend {
    inner: Arc<dyn ConfigDataBackend>,
    options: RwLock<BackendOptions>,
    interface: Vec<MethodInterface>,
}

impl ExtendedConfigDataBackend {
    pub fn new(inner: Arc<dyn ConfigDataBackend>) -> Self {
        ExtendedConfigDataBackend {
            inner,
            options: RwLock::new(BackendOptions::default()),
            interface: extended_interface(),
        }
    }

    pub fn with_options(inner: Arc<dyn ConfigDataBackend>, options: BackendOptions) -> Self {
        ExtendedConfigDataBackend {
            inner,
            options: RwLock::new(options),
            interface: extended_interface(),
        }
    }

    fn opts(&self) -> BackendOptions {
        *self.options.read()
    }

    /// Exact-ident filter over the string-valued ident attributes
    fn ident_filter<E: Entity>(obj: &E) -> Filter {
        let map = object_to_map(obj);
        let mut filter = Filter::new();
        for attr in E::IDENT_ATTRIBUTES {
            if let Some(Value::String(s)) = map.get(*attr) {
                filter = filter.with(*attr, s.clone());
            }
        }
        filter
    }

    async fn exists<E: Entity>(&self, obj: &E) -> anyhow::Result<bool>
    where
        dyn ConfigDataBackend: ObjectBackend<E>,
    {
        let rows: Vec<E> = self
            .inner
            .get_objects(&[], Self::ident_filter(obj))
            .await?;
        Ok(rows.iter().any(|row| row.ident() == obj.ident()))
    }

    /// Insert-or-update each object by ident probe, optionally re-reading
    /// the affected rows
    async fn create_or_update<E: Entity>(&self, objs: Vec<E>) -> anyhow::Result<Vec<E>>
    where
        Self: ObjectBackend<E>,
        dyn ConfigDataBackend: ObjectBackend<E>,
    {
        let mut written = Vec::with_capacity(objs.len());
        for obj in objs {
            if self.exists(&obj).await? {
                <Self as ObjectBackend<E>>::update_object(self, obj.clone()).await?;
            } else {
                <Self as ObjectBackend<E>>::insert_object(self, obj.clone()).await?;
            }
            written.push(obj);
        }

        if !self.opts().return_objects_on_update_and_create {
            return Ok(Vec::new());
        }
        let mut rows = Vec::with_capacity(written.len());
        for obj in &written {
            let fetched: Vec<E> =
                <Self as ObjectBackend<E>>::get_objects(self, &[], Self::ident_filter(obj))
                    .await?;
            rows.extend(fetched.into_iter().filter(|r| r.ident() == obj.ident()));
        }
        Ok(rows)
    }
}

macro_rules! impl_passthrough_object_backend {
    ($ty:ty) => {
        #[async_trait]
        impl ObjectBackend<$ty> for ExtendedConfigDataBackend {
            async fn insert_object(&self, obj: $ty) -> anyhow::Result<()> {
                obj.validate()?;
                self.inner.insert_object(obj).await
            }

            async fn update_object(&self, obj: $ty) -> anyhow::Result<()> {
                obj.validate()?;
                self.inner.update_object(obj).await
            }

            async fn get_objects(
                &self,
                attributes: &[String],
                filter: Filter,
            ) -> anyhow::Result<Vec<$ty>> {
                self.inner.get_objects(attributes, filter).await
            }

            async fn delete_objects(&self, objs: Vec<$ty>) -> anyhow::Result<()> {
                self.inner.delete_objects(objs).await
            }
        }
    };
}

impl_passthrough_object_backend!(ObjectToGroup);
impl_passthrough_object_backend!(LicenseContract);
impl_passthrough_object_backend!(AuditSoftware);

#[async_trait]
impl ObjectBackend<Host> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: Host) -> anyhow::Result<()> {
        let host = host::normalize(obj);
        host.validate()?;
        self.inner.insert_object(host).await
    }

    async fn update_object(&self, mut obj: Host) -> anyhow::Result<()> {
        obj.id = muster_common::forced_host_id(&obj.id);
        self.inner.update_object(obj).await
    }

    async fn get_objects(&self, attributes: &[String], filter: Filter) -> anyhow::Result<Vec<Host>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<Host>) -> anyhow::Result<()> {
        host::delete_hosts(&*self.inner, objs).await
    }
}

#[async_trait]
impl ObjectBackend<Config> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: Config) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: Config) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<Config>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<Config>) -> anyhow::Result<()> {
        for obj in &objs {
            let states: Vec<ConfigState> = self
                .inner
                .get_objects(&[], Filter::new().with("configId", obj.id.clone()))
                .await?;
            self.inner.delete_objects(states).await?;
        }
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<ConfigState> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ConfigState) -> anyhow::Result<()> {
        config::write_config_state(&*self.inner, obj, self.opts().delete_config_state_if_default)
            .await
            .map(|_| ())
    }

    async fn update_object(&self, obj: ConfigState) -> anyhow::Result<()> {
        config::write_config_state(&*self.inner, obj, self.opts().delete_config_state_if_default)
            .await
            .map(|_| ())
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ConfigState>> {
        let stored = self.inner.get_objects(attributes, filter.clone()).await?;
        if !self.opts().add_config_state_defaults {
            return Ok(stored);
        }
        config::add_config_state_defaults(&*self.inner, stored, attributes, &filter).await
    }

    async fn delete_objects(&self, objs: Vec<ConfigState>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<Product> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: Product) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: Product) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<Product>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<Product>) -> anyhow::Result<()> {
        product::delete_products(&*self.inner, objs).await
    }
}

#[async_trait]
impl ObjectBackend<ProductProperty> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ProductProperty) -> anyhow::Result<()> {
        obj.validate()?;
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.insert_object(obj.clone()).await?;
        product::adjust_property_states(&*self.inner, &obj).await
    }

    async fn update_object(&self, obj: ProductProperty) -> anyhow::Result<()> {
        obj.validate()?;
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.update_object(obj.clone()).await?;

        // Reconcile states against the merged row
        let merged: Vec<ProductProperty> = self
            .inner
            .get_objects(&[], Self::ident_filter(&obj))
            .await?;
        if let Some(property) = merged.into_iter().find(|p| p.ident() == obj.ident()) {
            product::adjust_property_states(&*self.inner, &property).await?;
        }
        Ok(())
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductProperty>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<ProductProperty>) -> anyhow::Result<()> {
        product::delete_product_properties(&*self.inner, objs).await
    }
}

#[async_trait]
impl ObjectBackend<ProductDependency> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ProductDependency) -> anyhow::Result<()> {
        obj.validate()?;
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: ProductDependency) -> anyhow::Result<()> {
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductDependency>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<ProductDependency>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<ProductOnDepot> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ProductOnDepot) -> anyhow::Result<()> {
        obj.validate()?;
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: ProductOnDepot) -> anyhow::Result<()> {
        product::require_product(
            &*self.inner,
            &obj.product_id,
            &obj.product_version,
            &obj.package_version,
        )
        .await?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductOnDepot>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<ProductOnDepot>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<ProductOnClient> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ProductOnClient) -> anyhow::Result<()> {
        if obj.is_generated {
            return Ok(());
        }
        obj.validate()?;
        let row = product::apply_product_on_client_transition(&*self.inner, obj).await?;
        self.inner.insert_object(row).await
    }

    async fn update_object(&self, obj: ProductOnClient) -> anyhow::Result<()> {
        if obj.is_generated {
            return Ok(());
        }
        obj.validate()?;
        if !self.exists(&obj).await? {
            return Ok(());
        }
        let row = product::apply_product_on_client_transition(&*self.inner, obj).await?;
        self.inner.insert_object(row).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductOnClient>> {
        let mut rows = self.inner.get_objects(attributes, filter.clone()).await?;
        let options = self.opts();
        if options.add_product_on_client_defaults {
            rows =
                product::add_product_on_client_defaults(&*self.inner, rows, attributes, &filter)
                    .await?;
        }
        if options.process_product_on_client_sequence {
            rows = sequence::sequence(&*self.inner, rows).await?;
        }
        Ok(rows)
    }

    async fn delete_objects(&self, objs: Vec<ProductOnClient>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<ProductPropertyState> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: ProductPropertyState) -> anyhow::Result<()> {
        if obj.is_generated {
            return Ok(());
        }
        obj.validate()?;
        product::require_product_property(&*self.inner, &obj.product_id, &obj.property_id).await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: ProductPropertyState) -> anyhow::Result<()> {
        if obj.is_generated {
            return Ok(());
        }
        product::require_product_property(&*self.inner, &obj.product_id, &obj.property_id).await?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductPropertyState>> {
        let stored = self.inner.get_objects(attributes, filter.clone()).await?;
        if !self.opts().add_product_property_state_defaults {
            return Ok(stored);
        }
        product::add_product_property_state_defaults(&*self.inner, stored, attributes, &filter)
            .await
    }

    async fn delete_objects(&self, objs: Vec<ProductPropertyState>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<Group> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: Group) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: Group) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(&self, attributes: &[String], filter: Filter) -> anyhow::Result<Vec<Group>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<Group>) -> anyhow::Result<()> {
        for group in &objs {
            let memberships: Vec<ObjectToGroup> = self
                .inner
                .get_objects(
                    &[],
                    Filter::new()
                        .with("groupType", group.group_type.to_string())
                        .with("groupId", group.id.clone()),
                )
                .await?;
            self.inner.delete_objects(memberships).await?;
        }
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<SoftwareLicense> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: SoftwareLicense) -> anyhow::Result<()> {
        obj.validate()?;
        license::require_license_contract(&*self.inner, &obj.license_contract_id).await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: SoftwareLicense) -> anyhow::Result<()> {
        if !obj.license_contract_id.is_empty() {
            license::require_license_contract(&*self.inner, &obj.license_contract_id).await?;
        }
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<SoftwareLicense>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<SoftwareLicense>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<LicensePool> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: LicensePool) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: LicensePool) -> anyhow::Result<()> {
        obj.validate()?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<LicensePool>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<LicensePool>) -> anyhow::Result<()> {
        license::delete_license_pools(&*self.inner, objs).await
    }
}

#[async_trait]
impl ObjectBackend<SoftwareLicenseToLicensePool> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: SoftwareLicenseToLicensePool) -> anyhow::Result<()> {
        obj.validate()?;
        license::require_license_and_pool(
            &*self.inner,
            &obj.software_license_id,
            &obj.license_pool_id,
        )
        .await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: SoftwareLicenseToLicensePool) -> anyhow::Result<()> {
        license::require_license_and_pool(
            &*self.inner,
            &obj.software_license_id,
            &obj.license_pool_id,
        )
        .await?;
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<SoftwareLicenseToLicensePool>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<SoftwareLicenseToLicensePool>) -> anyhow::Result<()> {
        license::delete_pool_assignments(&*self.inner, objs).await
    }
}

#[async_trait]
impl ObjectBackend<LicenseOnClient> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: LicenseOnClient) -> anyhow::Result<()> {
        obj.validate()?;
        license::require_pool_assignment(
            &*self.inner,
            &obj.software_license_id,
            &obj.license_pool_id,
        )
        .await?;
        self.inner.insert_object(obj).await
    }

    async fn update_object(&self, obj: LicenseOnClient) -> anyhow::Result<()> {
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<LicenseOnClient>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<LicenseOnClient>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<AuditSoftwareOnClient> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: AuditSoftwareOnClient) -> anyhow::Result<()> {
        obj.validate()?;
        audit::write_audit_software_on_client(&*self.inner, obj).await
    }

    async fn update_object(&self, obj: AuditSoftwareOnClient) -> anyhow::Result<()> {
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<AuditSoftwareOnClient>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<AuditSoftwareOnClient>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

#[async_trait]
impl ObjectBackend<AuditHardwareOnHost> for ExtendedConfigDataBackend {
    async fn insert_object(&self, obj: AuditHardwareOnHost) -> anyhow::Result<()> {
        obj.validate()?;
        audit::write_audit_hardware_on_host(&*self.inner, obj).await
    }

    async fn update_object(&self, obj: AuditHardwareOnHost) -> anyhow::Result<()> {
        self.inner.update_object(obj).await
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<AuditHardwareOnHost>> {
        self.inner.get_objects(attributes, filter).await
    }

    async fn delete_objects(&self, objs: Vec<AuditHardwareOnHost>) -> anyhow::Result<()> {
        self.inner.delete_objects(objs).await
    }
}

macro_rules! impl_object_backend_ext {
    ($ty:ty) => {
        #[async_trait]
        impl ObjectBackendExt<$ty> for ExtendedConfigDataBackend {
            async fn create_objects(&self, objs: Vec<$ty>) -> anyhow::Result<Vec<$ty>> {
                self.create_or_update(objs).await
            }

            async fn update_objects(&self, objs: Vec<$ty>) -> anyhow::Result<Vec<$ty>> {
                self.create_or_update(objs).await
            }
        }
    };
}

impl_object_backend_ext!(Host);
impl_object_backend_ext!(Config);
impl_object_backend_ext!(ConfigState);
impl_object_backend_ext!(Product);
impl_object_backend_ext!(ProductProperty);
impl_object_backend_ext!(ProductDependency);
impl_object_backend_ext!(ProductOnDepot);
impl_object_backend_ext!(ProductPropertyState);
impl_object_backend_ext!(Group);
impl_object_backend_ext!(ObjectToGroup);
impl_object_backend_ext!(LicenseContract);
impl_object_backend_ext!(SoftwareLicense);
impl_object_backend_ext!(LicensePool);
impl_object_backend_ext!(SoftwareLicenseToLicensePool);
impl_object_backend_ext!(LicenseOnClient);
impl_object_backend_ext!(AuditSoftware);
impl_object_backend_ext!(AuditSoftwareOnClient);
impl_object_backend_ext!(AuditHardwareOnHost);

// ProductOnClient batches first run the dependency resolver when the
// option is on.
#[async_trait]
impl ObjectBackendExt<ProductOnClient> for ExtendedConfigDataBackend {
    async fn create_objects(&self, mut objs: Vec<ProductOnClient>) -> anyhow::Result<Vec<ProductOnClient>> {
        if self.opts().add_dependent_product_on_clients {
            objs = sequence::add_dependencies(&*self.inner, objs).await?;
        }
        self.create_or_update(objs).await
    }

    async fn update_objects(&self, mut objs: Vec<ProductOnClient>) -> anyhow::Result<Vec<ProductOnClient>> {
        if self.opts().add_dependent_product_on_clients {
            objs = sequence::add_dependencies(&*self.inner, objs).await?;
        }
        self.create_or_update(objs).await
    }
}

#[async_trait]
impl ConfigDataBackend for ExtendedConfigDataBackend {
    async fn backend_create_base(&self) -> anyhow::Result<()> {
        self.inner.backend_create_base().await
    }

    async fn backend_delete_base(&self) -> anyhow::Result<()> {
        self.inner.backend_delete_base().await
    }

    async fn backend_exit(&self) -> anyhow::Result<()> {
        self.inner.backend_exit().await
    }

    async fn backend_set_options(&self, options: BackendOptions) -> anyhow::Result<()> {
        *self.options.write() = options;
        self.inner.backend_set_options(options).await
    }

    async fn backend_get_options(&self) -> anyhow::Result<BackendOptions> {
        Ok(self.opts())
    }

    fn backend_get_interface(&self) -> Vec<MethodInterface> {
        self.interface.clone()
    }

    async fn backend_info(&self) -> anyhow::Result<BackendInfo> {
        self.inner.backend_info().await
    }
}

#[async_trait]
impl ExtendedBackend for ExtendedConfigDataBackend {
    async fn config_state_get_client_to_depotserver(
        &self,
        depot_ids: Vec<String>,
        client_ids: Vec<String>,
        master_only: bool,
        product_ids: Vec<String>,
    ) -> anyhow::Result<Vec<ClientToDepotserver>> {
        config::client_to_depotserver(&*self.inner, depot_ids, client_ids, master_only, product_ids)
            .await
    }

    async fn license_on_client_get_or_create(
        &self,
        client_id: &str,
        selector: PoolSelector,
    ) -> anyhow::Result<LicenseOnClient> {
        license::get_or_create_license_on_client(&*self.inner, client_id, selector).await
    }

    async fn audit_hardware_on_host_set_obsolete(&self, host_id: &str) -> anyhow::Result<()> {
        audit::set_hardware_obsolete(&*self.inner, host_id).await
    }
}
