//! Shared fixtures for the integration tests
//!
//! Builds a composed stack (memory backends, dispatcher, business layer,
//! ACL) seeded with a small fleet: one config server acting as master
//! depot, two clients, and a product with a dependency.

use std::sync::Arc;

use serde_json::Value;

use muster_api::entity::{
    ActionRequest, Config, Host, InstallationStatus, Product, ProductDependency, ProductOnDepot,
    RequirementType,
};
use muster_backend::{ConfigDataBackend, MemoryBackend, ObjectBackend};
use muster_common::CONFIG_ID_DEPOT;
use muster_core::BackendManager;

pub const DEPOT: &str = "depot.example.org";
pub const CLIENT1: &str = "client1.example.org";
pub const CLIENT2: &str = "client2.example.org";

/// A manager over a single seeded in-memory backend
pub async fn seeded_manager() -> BackendManager {
    let storage: Arc<dyn ConfigDataBackend> = Arc::new(MemoryBackend::new());
    seed(&*storage).await;
    BackendManager::builder()
        .backend("memory", storage)
        .build()
        .expect("manager construction")
}

pub async fn seed(backend: &dyn ConfigDataBackend) {
    backend
        .insert_object(Host::new_configserver(DEPOT))
        .await
        .unwrap();
    for client in [CLIENT1, CLIENT2] {
        let mut host = Host::new_client(client);
        host.host_key = Some(muster_common::generate_host_key());
        backend.insert_object(host).await.unwrap();
    }

    let mut depot_config = Config::new(CONFIG_ID_DEPOT);
    depot_config.default_values = Some(vec![Value::String(DEPOT.to_string())]);
    backend.insert_object(depot_config).await.unwrap();

    for (id, priority) in [("firefox", 0), ("vcredist", 30)] {
        let mut product = Product::new(id, "1.0", "1");
        product.priority = Some(priority);
        backend.insert_object(product).await.unwrap();
        backend
            .insert_object(ProductOnDepot::new(id, "1.0", "1", DEPOT))
            .await
            .unwrap();
    }

    backend
        .insert_object(ProductDependency {
            product_id: "firefox".to_string(),
            product_version: "1.0".to_string(),
            package_version: "1".to_string(),
            product_action: ActionRequest::Setup,
            required_product_id: "vcredist".to_string(),
            required_installation_status: Some(InstallationStatus::Installed),
            requirement_type: Some(RequirementType::Before),
            ..Default::default()
        })
        .await
        .unwrap();
}

/// The stored host key of a seeded host
pub async fn host_key(backend: &dyn ConfigDataBackend, host_id: &str) -> String {
    let hosts: Vec<Host> = backend
        .get_objects(&[], muster_api::Filter::new().with("id", host_id))
        .await
        .unwrap();
    hosts[0].host_key.clone().unwrap()
}
