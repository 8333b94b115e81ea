//! Host logic
//!
//! Normalization and key generation on insert, cascading removal of every
//! row referencing a host on delete.

use tracing::info;

use muster_api::entity::{
    ConfigState, Host, HostType, ObjectToGroup, ProductOnClient, ProductOnDepot,
    ProductPropertyState,
};
use muster_api::Filter;
use muster_backend::contract::{ConfigDataBackend, ObjectBackend};

/// Prepare a host row for writing
pub fn normalize(mut host: Host) -> Host {
    host.id = muster_common::forced_host_id(&host.id);
    if host.host_key.is_none() {
        host.host_key = Some(muster_common::generate_host_key());
    }
    host
}

/// Delete hosts and everything referencing them
///
/// Removes group memberships, per-client product and property states, the
/// depot's product assignments, and config states.
pub async fn delete_hosts(
    backend: &dyn ConfigDataBackend,
    hosts: Vec<Host>,
) -> anyhow::Result<()> {
    for host in &hosts {
        let memberships: Vec<ObjectToGroup> = backend
            .get_objects(&[], Filter::new().with("objectId", host.id.clone()))
            .await?;
        backend.delete_objects(memberships).await?;

        match host.host_type {
            HostType::Client => {
                let on_client: Vec<ProductOnClient> = backend
                    .get_objects(&[], Filter::new().with("clientId", host.id.clone()))
                    .await?;
                backend.delete_objects(on_client).await?;
            }
            HostType::Depotserver | HostType::Configserver => {
                let on_depot: Vec<ProductOnDepot> = backend
                    .get_objects(&[], Filter::new().with("depotId", host.id.clone()))
                    .await?;
                backend.delete_objects(on_depot).await?;
            }
        }

        let property_states: Vec<ProductPropertyState> = backend
            .get_objects(&[], Filter::new().with("objectId", host.id.clone()))
            .await?;
        backend.delete_objects(property_states).await?;

        let config_states: Vec<ConfigState> = backend
            .get_objects(&[], Filter::new().with("objectId", host.id.clone()))
            .await?;
        backend.delete_objects(config_states).await?;

        info!(host = %host.id, "host deleted with dependent rows");
    }

    backend.delete_objects(hosts).await
}
