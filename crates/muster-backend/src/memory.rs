//! In-memory storage backend
//!
//! The reference implementation of the storage contract, used by every test
//! in the workspace and suitable for ephemeral deployments. Rows live in
//! per-entity `DashMap` tables keyed by joined ident.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use muster_api::entity::{
    AuditHardwareOnHost, AuditSoftware, AuditSoftwareOnClient, Config, ConfigState, Group, Host,
    LicenseContract, LicenseOnClient, LicensePool, ObjectToGroup, Product, ProductDependency,
    ProductOnClient, ProductOnDepot, ProductProperty, ProductPropertyState, SoftwareLicense,
    SoftwareLicenseToLicensePool,
};
use muster_api::{Entity, Filter, entity::merge_objects, project_attributes};

use crate::contract::{BackendInfo, ConfigDataBackend, ObjectBackend};
use crate::operation::{MethodInterface, storage_interface};
use crate::options::BackendOptions;

/// One entity table
struct Table<E: Entity> {
    rows: DashMap<String, E>,
}

impl<E: Entity> Table<E> {
    fn new() -> Self {
        Table {
            rows: DashMap::new(),
        }
    }

    fn insert(&self, mut obj: E) -> anyhow::Result<()> {
        obj.fill_defaults();
        obj.validate()?;
        self.rows.insert(obj.ident().to_string(), obj);
        Ok(())
    }

    fn update(&self, obj: E) -> anyhow::Result<()> {
        obj.validate()?;
        let key = obj.ident().to_string();
        if let Some(mut existing) = self.rows.get_mut(&key) {
            *existing = merge_objects(&*existing, &obj);
        }
        Ok(())
    }

    fn get(&self, attributes: &[String], filter: &Filter) -> anyhow::Result<Vec<E>> {
        let mut rows = Vec::new();
        for entry in self.rows.iter() {
            if filter.matches(entry.value())? {
                rows.push(project_attributes(entry.value(), attributes));
            }
        }
        rows.sort_by_key(|r| r.ident());
        Ok(rows)
    }

    fn delete(&self, objs: &[E]) -> anyhow::Result<()> {
        for obj in objs {
            self.rows.remove(&obj.ident().to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        self.rows.clear();
    }
}

/// In-memory implementation of the storage contract
pub struct MemoryBackend {
    hosts: Table<Host>,
    configs: Table<Config>,
    config_states: Table<ConfigState>,
    products: Table<Product>,
    product_properties: Table<ProductProperty>,
    product_dependencies: Table<ProductDependency>,
    products_on_depot: Table<ProductOnDepot>,
    products_on_client: Table<ProductOnClient>,
    product_property_states: Table<ProductPropertyState>,
    groups: Table<Group>,
    objects_to_groups: Table<ObjectToGroup>,
    license_contracts: Table<LicenseContract>,
    software_licenses: Table<SoftwareLicense>,
    license_pools: Table<LicensePool>,
    licenses_to_pools: Table<SoftwareLicenseToLicensePool>,
    licenses_on_client: Table<LicenseOnClient>,
    audit_software: Table<AuditSoftware>,
    audit_software_on_client: Table<AuditSoftwareOnClient>,
    audit_hardware_on_host: Table<AuditHardwareOnHost>,
    options: RwLock<BackendOptions>,
    interface: Vec<MethodInterface>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            hosts: Table::new(),
            configs: Table::new(),
            config_states: Table::new(),
            products: Table::new(),
            product_properties: Table::new(),
            product_dependencies: Table::new(),
            products_on_depot: Table::new(),
            products_on_client: Table::new(),
            product_property_states: Table::new(),
            groups: Table::new(),
            objects_to_groups: Table::new(),
            license_contracts: Table::new(),
            software_licenses: Table::new(),
            license_pools: Table::new(),
            licenses_to_pools: Table::new(),
            licenses_on_client: Table::new(),
            audit_software: Table::new(),
            audit_software_on_client: Table::new(),
            audit_hardware_on_host: Table::new(),
            options: RwLock::new(BackendOptions::default()),
            interface: storage_interface(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

macro_rules! impl_object_backend {
    ($ty:ty, $table:ident) => {
        #[async_trait]
        impl ObjectBackend<$ty> for MemoryBackend {
            async fn insert_object(&self, obj: $ty) -> anyhow::Result<()> {
                self.$table.insert(obj)
            }

            async fn update_object(&self, obj: $ty) -> anyhow::Result<()> {
                self.$table.update(obj)
            }

            async fn get_objects(
                &self,
                attributes: &[String],
                filter: Filter,
            ) -> anyhow::Result<Vec<$ty>> {
                self.$table.get(attributes, &filter)
            }

            async fn delete_objects(&self, objs: Vec<$ty>) -> anyhow::Result<()> {
                self.$table.delete(&objs)
            }
        }
    };
}

impl_object_backend!(Host, hosts);
impl_object_backend!(Config, configs);
impl_object_backend!(ConfigState, config_states);
impl_object_backend!(Product, products);
impl_object_backend!(ProductProperty, product_properties);
impl_object_backend!(ProductDependency, product_dependencies);
impl_object_backend!(ProductOnClient, products_on_client);
impl_object_backend!(ProductPropertyState, product_property_states);
impl_object_backend!(Group, groups);
impl_object_backend!(ObjectToGroup, objects_to_groups);
impl_object_backend!(LicenseContract, license_contracts);
impl_object_backend!(SoftwareLicense, software_licenses);
impl_object_backend!(LicensePool, license_pools);
impl_object_backend!(SoftwareLicenseToLicensePool, licenses_to_pools);
impl_object_backend!(LicenseOnClient, licenses_on_client);
impl_object_backend!(AuditSoftware, audit_software);
impl_object_backend!(AuditSoftwareOnClient, audit_software_on_client);
impl_object_backend!(AuditHardwareOnHost, audit_hardware_on_host);

// ProductOnDepot is version-locked per (product, depot): inserting another
// version replaces the existing assignment instead of adding a second row.
#[async_trait]
impl ObjectBackend<ProductOnDepot> for MemoryBackend {
    async fn insert_object(&self, obj: ProductOnDepot) -> anyhow::Result<()> {
        let stale: Vec<String> = self
            .products_on_depot
            .rows
            .iter()
            .filter(|e| e.product_id == obj.product_id && e.depot_id == obj.depot_id)
            .map(|e| e.key().clone())
            .collect();
        for key in stale {
            self.products_on_depot.rows.remove(&key);
        }
        self.products_on_depot.insert(obj)
    }

    async fn update_object(&self, obj: ProductOnDepot) -> anyhow::Result<()> {
        self.products_on_depot.update(obj)
    }

    async fn get_objects(
        &self,
        attributes: &[String],
        filter: Filter,
    ) -> anyhow::Result<Vec<ProductOnDepot>> {
        self.products_on_depot.get(attributes, &filter)
    }

    async fn delete_objects(&self, objs: Vec<ProductOnDepot>) -> anyhow::Result<()> {
        self.products_on_depot.delete(&objs)
    }
}

#[async_trait]
impl ConfigDataBackend for MemoryBackend {
    async fn backend_create_base(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn backend_delete_base(&self) -> anyhow::Result<()> {
        self.hosts.clear();
        self.configs.clear();
        self.config_states.clear();
        self.products.clear();
        self.product_properties.clear();
        self.product_dependencies.clear();
        self.products_on_depot.clear();
        self.products_on_client.clear();
        self.product_property_states.clear();
        self.groups.clear();
        self.objects_to_groups.clear();
        self.license_contracts.clear();
        self.software_licenses.clear();
        self.license_pools.clear();
        self.licenses_to_pools.clear();
        self.licenses_on_client.clear();
        self.audit_software.clear();
        self.audit_software_on_client.clear();
        self.audit_hardware_on_host.clear();
        Ok(())
    }

    async fn backend_exit(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn backend_set_options(&self, options: BackendOptions) -> anyhow::Result<()> {
        *self.options.write() = options;
        Ok(())
    }

    async fn backend_get_options(&self) -> anyhow::Result<BackendOptions> {
        Ok(*self.options.read())
    }

    fn backend_get_interface(&self) -> Vec<MethodInterface> {
        self.interface.clone()
    }

    async fn backend_info(&self) -> anyhow::Result<BackendInfo> {
        Ok(BackendInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            modules: serde_json::Map::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::FilterValue;

    #[tokio::test]
    async fn test_insert_and_filter() {
        let backend = MemoryBackend::new();
        backend
            .insert_object(Host::new_client("client1.example.org"))
            .await
            .unwrap();
        backend
            .insert_object(Host::new_depotserver("depot.example.org"))
            .await
            .unwrap();

        let clients: Vec<Host> = backend
            .get_objects(&[], Filter::new().with("type", "Client"))
            .await
            .unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "client1.example.org");
    }

    #[tokio::test]
    async fn test_update_merges_and_ignores_unknown() {
        let backend = MemoryBackend::new();
        let mut host = Host::new_client("client1.example.org");
        host.description = Some("workstation".to_string());
        backend.insert_object(host).await.unwrap();

        let mut patch = Host::new_client("client1.example.org");
        patch.notes = Some("repaired".to_string());
        backend.update_object(patch).await.unwrap();

        let rows: Vec<Host> = backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows[0].description.as_deref(), Some("workstation"));
        assert_eq!(rows[0].notes.as_deref(), Some("repaired"));

        // Unknown ident: silent no-op
        backend
            .update_object(Host::new_client("ghost.example.org"))
            .await
            .unwrap();
        let rows: Vec<Host> = backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_insert_fails() {
        let backend = MemoryBackend::new();
        let result = backend.insert_object(Host::new_client("not-an-fqdn")).await;
        assert!(result.is_err());
        let rows: Vec<Host> = backend.get_objects(&[], Filter::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_filter_attribute_is_error() {
        let backend = MemoryBackend::new();
        backend
            .insert_object(Host::new_client("client1.example.org"))
            .await
            .unwrap();
        let result: anyhow::Result<Vec<Host>> = backend
            .get_objects(&[], Filter::new().with("bogus", FilterValue::Null))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_product_on_depot_version_locking() {
        let backend = MemoryBackend::new();
        backend
            .insert_object(ProductOnDepot::new("product1", "1.0", "1", "depot.example.org"))
            .await
            .unwrap();
        backend
            .insert_object(ProductOnDepot::new("product1", "1.1", "1", "depot.example.org"))
            .await
            .unwrap();

        let rows: Vec<ProductOnDepot> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_version, "1.1");

        // A second depot keeps its own assignment
        backend
            .insert_object(ProductOnDepot::new("product1", "1.0", "1", "depot2.example.org"))
            .await
            .unwrap();
        let rows: Vec<ProductOnDepot> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_objects() {
        let backend = MemoryBackend::new();
        let host = Host::new_client("client1.example.org");
        backend.insert_object(host.clone()).await.unwrap();
        backend.delete_objects(vec![host]).await.unwrap();
        let rows: Vec<Host> = backend.get_objects(&[], Filter::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_projection() {
        let backend = MemoryBackend::new();
        let mut host = Host::new_client("client1.example.org");
        host.description = Some("workstation".to_string());
        host.notes = Some("repaired".to_string());
        backend.insert_object(host).await.unwrap();

        let rows: Vec<Host> = backend
            .get_objects(&["notes".to_string()], Filter::new())
            .await
            .unwrap();
        assert_eq!(rows[0].id, "client1.example.org");
        assert_eq!(rows[0].notes.as_deref(), Some("repaired"));
        assert_eq!(rows[0].description, None);
    }
}
