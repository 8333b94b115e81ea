//! Config and config-state logic
//!
//! Referential integrity of config states, drop-if-default handling,
//! default synthesis, and the depot resolution every derived computation
//! builds on.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use muster_api::entity::{Config, ConfigState, Host, ProductOnDepot};
use muster_api::{Entity, Filter, FilterValue, project_attributes};
use muster_backend::contract::{ClientToDepotserver, ConfigDataBackend, ObjectBackend};
use muster_common::{CONFIG_ID_DEPOT, MusterError};

use super::string_values;

/// Fetch a config, raising a referential-integrity error when absent
pub async fn require_config(
    backend: &dyn ConfigDataBackend,
    config_id: &str,
) -> anyhow::Result<Config> {
    let configs: Vec<Config> = backend
        .get_objects(&[], Filter::new().with("id", config_id))
        .await?;
    configs
        .into_iter()
        .next()
        .ok_or_else(|| MusterError::referential_integrity("Config", config_id).into())
}

/// Extra validation for depot-assignment states: the referenced host must
/// exist and be a master depot
pub async fn validate_depot_assignment(
    backend: &dyn ConfigDataBackend,
    state: &ConfigState,
) -> anyhow::Result<()> {
    let depot_ids = string_values(&state.values);
    for depot_id in depot_ids {
        let hosts: Vec<Host> = backend
            .get_objects(&[], Filter::new().with("id", depot_id.clone()))
            .await?;
        let depot = hosts
            .into_iter()
            .next()
            .ok_or_else(|| MusterError::referential_integrity("Host", &depot_id))?;
        if !depot.host_type.is_depot() || depot.is_master_depot != Some(true) {
            return Err(MusterError::bad_value(format!(
                "host '{}' is not a master depot",
                depot_id
            ))
            .into());
        }
    }
    Ok(())
}

/// Write a config state, enforcing integrity and the drop-if-default option
///
/// Returns true when a row was persisted.
pub async fn write_config_state(
    backend: &dyn ConfigDataBackend,
    mut state: ConfigState,
    delete_if_default: bool,
) -> anyhow::Result<bool> {
    if state.is_generated {
        debug!(ident = %state.ident(), "skipping write of generated config state");
        return Ok(false);
    }

    let config = require_config(backend, &state.config_id).await?;
    if state.config_id == CONFIG_ID_DEPOT {
        validate_depot_assignment(backend, &state).await?;
    }

    state.fill_defaults();
    if delete_if_default && state.values == config.default_values {
        backend.delete_objects(vec![state]).await?;
        return Ok(false);
    }

    backend.insert_object(state).await?;
    Ok(true)
}

/// Synthesize a generated default state for every (config x client) pair
/// without an explicit row, honoring the call's filter and projection
pub async fn add_config_state_defaults(
    backend: &dyn ConfigDataBackend,
    stored: Vec<ConfigState>,
    attributes: &[String],
    filter: &Filter,
) -> anyhow::Result<Vec<ConfigState>> {
    let configs: Vec<Config> = backend.get_objects(&[], Filter::new()).await?;
    let clients: Vec<Host> = backend
        .get_objects(&[], Filter::new().with("type", "Client"))
        .await?;

    let mut rows: BTreeMap<String, ConfigState> = stored
        .into_iter()
        .map(|s| (s.ident().to_string(), s))
        .collect();

    for config in &configs {
        for client in &clients {
            let generated = ConfigState::generated_default(config, &client.id);
            let key = generated.ident().to_string();
            if rows.contains_key(&key) {
                continue;
            }
            if filter.matches(&generated)? {
                rows.insert(key, project_attributes(&generated, attributes));
            }
        }
    }

    Ok(rows.into_values().collect())
}

/// Effective values of a config for one object: explicit state first, then
/// the config's defaults
pub async fn effective_config_values(
    backend: &dyn ConfigDataBackend,
    config_id: &str,
    object_id: &str,
) -> anyhow::Result<Vec<Value>> {
    let states: Vec<ConfigState> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("configId", config_id)
                .with("objectId", object_id),
        )
        .await?;
    if let Some(state) = states.into_iter().next()
        && let Some(values) = state.values
        && !values.is_empty()
    {
        return Ok(values);
    }

    let configs: Vec<Config> = backend
        .get_objects(&[], Filter::new().with("id", config_id))
        .await?;
    Ok(configs
        .into_iter()
        .next()
        .and_then(|c| c.default_values)
        .unwrap_or_default())
}

/// Resolve the depot serving a client
///
/// Reads the client's depot-assignment state, materializing the config
/// default when no explicit state exists. No assignment at all is a
/// missing-data error.
pub async fn resolve_depot_id(
    backend: &dyn ConfigDataBackend,
    client_id: &str,
) -> anyhow::Result<String> {
    let values = effective_config_values(backend, CONFIG_ID_DEPOT, client_id).await?;
    values
        .first()
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            MusterError::missing_data(format!("client '{}' has no depot assigned", client_id))
                .into()
        })
}

/// The (product, version) vector a depot serves, restricted to a product-id
/// set when one is given
async fn depot_product_vector(
    backend: &dyn ConfigDataBackend,
    depot_id: &str,
    product_ids: &[String],
) -> anyhow::Result<Vec<(String, String, String)>> {
    let rows: Vec<ProductOnDepot> = backend
        .get_objects(&[], Filter::new().with("depotId", depot_id))
        .await?;
    let mut vector: Vec<(String, String, String)> = rows
        .into_iter()
        .filter(|pod| product_ids.is_empty() || product_ids.contains(&pod.product_id))
        .map(|pod| (pod.product_id, pod.product_version, pod.package_version))
        .collect();
    vector.sort();
    Ok(vector)
}

/// Resolve the assigned depot of each client, with interchangeable
/// alternatives
///
/// Two depots are interchangeable when their product version vectors are
/// byte-identical for the constraining product-id set (the full vector when
/// the set is empty).
pub async fn client_to_depotserver(
    backend: &dyn ConfigDataBackend,
    depot_ids: Vec<String>,
    client_ids: Vec<String>,
    master_only: bool,
    product_ids: Vec<String>,
) -> anyhow::Result<Vec<ClientToDepotserver>> {
    let clients: Vec<Host> = if client_ids.is_empty() {
        backend
            .get_objects(&[], Filter::new().with("type", "Client"))
            .await?
    } else {
        backend
            .get_objects(
                &[],
                Filter::new().with(
                    "id",
                    FilterValue::List(client_ids.iter().map(|c| c.as_str().into()).collect()),
                ),
            )
            .await?
    };

    let depots: Vec<Host> = backend
        .get_objects(
            &[],
            Filter::new().with("type", vec!["Depotserver", "Configserver"]),
        )
        .await?;

    let mut vectors: BTreeMap<String, Vec<(String, String, String)>> = BTreeMap::new();
    for depot in &depots {
        vectors.insert(
            depot.id.clone(),
            depot_product_vector(backend, &depot.id, &product_ids).await?,
        );
    }

    let mut result = Vec::new();
    for client in clients {
        let mut depot_id = resolve_depot_id(backend, &client.id).await?;

        if master_only
            && let Some(depot) = depots.iter().find(|d| d.id == depot_id)
            && depot.is_master_depot != Some(true)
            && let Some(master) = &depot.master_depot_id
        {
            depot_id = master.clone();
        }
        if !depot_ids.is_empty() && !depot_ids.contains(&depot_id) {
            continue;
        }

        let vector = vectors.get(&depot_id);
        let alternative_depot_ids = depots
            .iter()
            .filter(|d| d.id != depot_id && vectors.get(&d.id) == vector && vector.is_some())
            .map(|d| d.id.clone())
            .collect();

        result.push(ClientToDepotserver {
            client_id: client.id,
            depot_id,
            alternative_depot_ids,
        });
    }
    Ok(result)
}
