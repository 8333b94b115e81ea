//! Product family logic
//!
//! Referential integrity of the version-scoped rows, the ProductOnClient
//! state machine, orphan purging on product deletion, and the default
//! synthesis for client rows and property states.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use muster_api::entity::{
    ActionRequest, Host, InstallationStatus, Product, ProductDependency, ProductOnClient,
    ProductOnDepot, ProductProperty, ProductPropertyState, TargetConfiguration, merge_objects,
};
use muster_api::{Entity, Filter, FilterValue, project_attributes};
use muster_backend::contract::{ConfigDataBackend, ObjectBackend};
use muster_common::MusterError;

use super::config::resolve_depot_id;

/// Fetch one product version, raising a referential-integrity error when
/// absent
pub async fn require_product(
    backend: &dyn ConfigDataBackend,
    product_id: &str,
    product_version: &str,
    package_version: &str,
) -> anyhow::Result<Product> {
    let products: Vec<Product> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("id", product_id)
                .with("productVersion", product_version)
                .with("packageVersion", package_version),
        )
        .await?;
    products.into_iter().next().ok_or_else(|| {
        MusterError::referential_integrity(
            "Product",
            format!("{};{};{}", product_id, product_version, package_version),
        )
        .into()
    })
}

/// Check that some version of a product property exists
pub async fn require_product_property(
    backend: &dyn ConfigDataBackend,
    product_id: &str,
    property_id: &str,
) -> anyhow::Result<()> {
    let properties: Vec<ProductProperty> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("productId", product_id)
                .with("propertyId", property_id),
        )
        .await?;
    if properties.is_empty() {
        return Err(MusterError::referential_integrity(
            "ProductProperty",
            format!("{};{}", product_id, property_id),
        )
        .into());
    }
    Ok(())
}

/// The depot's assignment of a product, if any
pub async fn product_on_depot(
    backend: &dyn ConfigDataBackend,
    depot_id: &str,
    product_id: &str,
) -> anyhow::Result<Option<ProductOnDepot>> {
    let rows: Vec<ProductOnDepot> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("depotId", depot_id)
                .with("productId", product_id),
        )
        .await?;
    Ok(rows.into_iter().next())
}

/// Apply the ProductOnClient transition rules to a write
///
/// The supplied row is merged with the prior row by ident; fields not
/// supplied keep their prior value. An installed status without versions
/// pulls them from the ProductOnDepot of the client's resolved depot.
pub async fn apply_product_on_client_transition(
    backend: &dyn ConfigDataBackend,
    obj: ProductOnClient,
) -> anyhow::Result<ProductOnClient> {
    let existing: Vec<ProductOnClient> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("productId", obj.product_id.clone())
                .with("clientId", obj.client_id.clone()),
        )
        .await?;

    let mut row = match existing.into_iter().next() {
        Some(prior) => merge_objects(&prior, &obj),
        None => {
            let mut row = obj;
            row.fill_defaults();
            row
        }
    };

    if row.installation_status_or_default() == InstallationStatus::Installed {
        if row.product_version.is_none() || row.package_version.is_none() {
            let depot_id = resolve_depot_id(backend, &row.client_id).await?;
            let pod = product_on_depot(backend, &depot_id, &row.product_id)
                .await?
                .ok_or_else(|| {
                    MusterError::missing_data(format!(
                        "product '{}' is not available on depot '{}'",
                        row.product_id, depot_id
                    ))
                })?;
            row.product_version = Some(pod.product_version.clone());
            row.package_version = Some(pod.package_version.clone());
            row.product_type = pod.product_type;
        }
    } else {
        row.product_version = None;
        row.package_version = None;
    }

    if row.action_request_or_none() != ActionRequest::None && row.last_action.is_none() {
        row.last_action = row.action_request;
        if row.target_configuration.is_none() {
            row.target_configuration = Some(match row.action_request_or_none() {
                ActionRequest::Setup => TargetConfiguration::Installed,
                ActionRequest::Always => TargetConfiguration::Always,
                _ => TargetConfiguration::Undefined,
            });
        }
        if row.action_result.is_none() {
            row.action_result = Some(muster_api::entity::ActionResult::None);
        }
        if row.action_progress.is_none() {
            row.action_progress = Some(String::new());
        }
    }

    row.modification_time = Some(muster_common::timestamp());
    Ok(row)
}

/// Delete product versions with their dependent rows
///
/// Version-scoped rows (properties, dependencies, depot assignments) go
/// with each version; client rows and property states are purged once no
/// version of the product remains anywhere.
pub async fn delete_products(
    backend: &dyn ConfigDataBackend,
    products: Vec<Product>,
) -> anyhow::Result<()> {
    for product in &products {
        let version_filter = Filter::new()
            .with("productId", product.id.clone())
            .with("productVersion", product.product_version.clone())
            .with("packageVersion", product.package_version.clone());

        let properties: Vec<ProductProperty> =
            backend.get_objects(&[], version_filter.clone()).await?;
        backend.delete_objects(properties).await?;

        let dependencies: Vec<ProductDependency> =
            backend.get_objects(&[], version_filter.clone()).await?;
        backend.delete_objects(dependencies).await?;

        let on_depot: Vec<ProductOnDepot> =
            backend.get_objects(&[], version_filter.clone()).await?;
        backend.delete_objects(on_depot).await?;
    }

    backend.delete_objects(products.clone()).await?;

    for product in &products {
        let remaining: Vec<Product> = backend
            .get_objects(&[], Filter::new().with("id", product.id.clone()))
            .await?;
        if !remaining.is_empty() {
            continue;
        }

        let states: Vec<ProductPropertyState> = backend
            .get_objects(&[], Filter::new().with("productId", product.id.clone()))
            .await?;
        backend.delete_objects(states).await?;

        let on_client: Vec<ProductOnClient> = backend
            .get_objects(&[], Filter::new().with("productId", product.id.clone()))
            .await?;
        backend.delete_objects(on_client).await?;

        debug!(product = %product.id, "last version removed, purged dependent rows");
    }
    Ok(())
}

/// Delete product properties and, when no version of a property remains,
/// its states
pub async fn delete_product_properties(
    backend: &dyn ConfigDataBackend,
    properties: Vec<ProductProperty>,
) -> anyhow::Result<()> {
    backend.delete_objects(properties.clone()).await?;

    for property in &properties {
        let remaining: Vec<ProductProperty> = backend
            .get_objects(
                &[],
                Filter::new()
                    .with("productId", property.product_id.clone())
                    .with("propertyId", property.property_id.clone()),
            )
            .await?;
        if remaining.is_empty() {
            let states: Vec<ProductPropertyState> = backend
                .get_objects(
                    &[],
                    Filter::new()
                        .with("productId", property.product_id.clone())
                        .with("propertyId", property.property_id.clone()),
                )
                .await?;
            backend.delete_objects(states).await?;
        }
    }
    Ok(())
}

fn coerced_match(allowed: &[Value], value: &Value) -> Option<Value> {
    if allowed.contains(value) {
        return Some(value.clone());
    }
    match value {
        Value::String(s) => allowed.iter().find_map(|candidate| match candidate {
            Value::String(c) if c.eq_ignore_ascii_case(s) => Some(candidate.clone()),
            Value::Bool(b) if s.eq_ignore_ascii_case(&b.to_string()) => Some(candidate.clone()),
            _ => None,
        }),
        Value::Bool(b) => allowed.iter().find_map(|candidate| match candidate {
            Value::String(c) if c.eq_ignore_ascii_case(&b.to_string()) => Some(candidate.clone()),
            _ => None,
        }),
        _ => None,
    }
}

/// Reconcile existing property states with a property's (possibly shrunk)
/// allowed-value set
///
/// Values with a case-insensitive or boolean-coercible match are corrected,
/// states left without any valid value are deleted.
pub async fn adjust_property_states(
    backend: &dyn ConfigDataBackend,
    property: &ProductProperty,
) -> anyhow::Result<()> {
    if property.editable == Some(true) {
        return Ok(());
    }
    let Some(allowed) = &property.possible_values else {
        return Ok(());
    };
    if allowed.is_empty() {
        return Ok(());
    }

    let states: Vec<ProductPropertyState> = backend
        .get_objects(
            &[],
            Filter::new()
                .with("productId", property.product_id.clone())
                .with("propertyId", property.property_id.clone()),
        )
        .await?;

    for mut state in states {
        let values = state.values.take().unwrap_or_default();
        let corrected: Vec<Value> = values
            .iter()
            .filter_map(|v| coerced_match(allowed, v))
            .collect();

        if corrected.is_empty() {
            debug!(ident = %state.ident(), "property state has no valid value left, deleting");
            backend.delete_objects(vec![state]).await?;
        } else if corrected != values {
            state.values = Some(corrected);
            backend.insert_object(state).await?;
        }
    }
    Ok(())
}

/// Client ids constrained by a filter attribute, falling back to every
/// known client
pub async fn clients_from_filter(
    backend: &dyn ConfigDataBackend,
    filter: &Filter,
    attribute: &str,
) -> anyhow::Result<Vec<String>> {
    if let Some((_, value)) = filter.iter().find(|(k, _)| k.as_str() == attribute) {
        let mut ids = Vec::new();
        let mut plain = true;
        let collect = |v: &FilterValue, ids: &mut Vec<String>, plain: &mut bool| match v {
            FilterValue::String(s) if !s.contains('*') => ids.push(s.clone()),
            _ => *plain = false,
        };
        match value {
            FilterValue::List(list) => {
                for v in list {
                    collect(v, &mut ids, &mut plain);
                }
            }
            other => collect(other, &mut ids, &mut plain),
        }
        if plain && !ids.is_empty() {
            return Ok(ids);
        }
    }

    let clients: Vec<Host> = backend
        .get_objects(&[], Filter::new().with("type", "Client"))
        .await?;
    Ok(clients.into_iter().map(|c| c.id).collect())
}

/// Synthesize a not_installed/none row for every product available on the
/// client's depot without an explicit row
pub async fn add_product_on_client_defaults(
    backend: &dyn ConfigDataBackend,
    stored: Vec<ProductOnClient>,
    attributes: &[String],
    filter: &Filter,
) -> anyhow::Result<Vec<ProductOnClient>> {
    let clients = clients_from_filter(backend, filter, "clientId").await?;

    let mut rows: BTreeMap<String, ProductOnClient> = stored
        .into_iter()
        .map(|r| (r.ident().to_string(), r))
        .collect();

    for client_id in clients {
        let depot_id = resolve_depot_id(backend, &client_id).await?;
        let pods: Vec<ProductOnDepot> = backend
            .get_objects(&[], Filter::new().with("depotId", depot_id))
            .await?;
        for pod in pods {
            let mut generated = ProductOnClient::new(pod.product_id.clone(), client_id.clone());
            generated.product_type = pod.product_type;
            generated.is_generated = true;
            generated.fill_defaults();

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

/// Synthesize client property states inherited from the client's depot
pub async fn add_product_property_state_defaults(
    backend: &dyn ConfigDataBackend,
    stored: Vec<ProductPropertyState>,
    attributes: &[String],
    filter: &Filter,
) -> anyhow::Result<Vec<ProductPropertyState>> {
    let clients = clients_from_filter(backend, filter, "objectId").await?;

    let mut rows: BTreeMap<String, ProductPropertyState> = stored
        .into_iter()
        .map(|r| (r.ident().to_string(), r))
        .collect();

    for client_id in clients {
        let depot_id = resolve_depot_id(backend, &client_id).await?;
        let depot_states: Vec<ProductPropertyState> = backend
            .get_objects(&[], Filter::new().with("objectId", depot_id))
            .await?;
        for depot_state in depot_states {
            let mut generated = ProductPropertyState::new(
                depot_state.product_id.clone(),
                depot_state.property_id.clone(),
                client_id.clone(),
                depot_state.values.clone().unwrap_or_default(),
            );
            generated.is_generated = true;

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

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::entity::{Config, ConfigState};
    use muster_backend::MemoryBackend;
    use muster_common::CONFIG_ID_DEPOT;

    async fn seed_depot(backend: &MemoryBackend) {
        backend
            .insert_object(Host::new_configserver("depot.example.org"))
            .await
            .unwrap();
        backend
            .insert_object(Host::new_client("client1.example.org"))
            .await
            .unwrap();

        let mut config = Config::new(CONFIG_ID_DEPOT);
        config.default_values = Some(vec![Value::String("depot.example.org".to_string())]);
        backend.insert_object(config).await.unwrap();

        backend
            .insert_object(Product::new("firefox", "140.0", "2"))
            .await
            .unwrap();
        backend
            .insert_object(ProductOnDepot::new("firefox", "140.0", "2", "depot.example.org"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_installed_without_version_pulls_from_depot() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let mut poc = ProductOnClient::new("firefox", "client1.example.org");
        poc.installation_status = Some(InstallationStatus::Installed);
        let row = apply_product_on_client_transition(&backend, poc).await.unwrap();
        assert_eq!(row.product_version.as_deref(), Some("140.0"));
        assert_eq!(row.package_version.as_deref(), Some("2"));
        assert!(row.modification_time.is_some());
    }

    #[tokio::test]
    async fn test_installed_without_depot_mapping_fails() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let mut poc = ProductOnClient::new("ghostproduct", "client1.example.org");
        poc.installation_status = Some(InstallationStatus::Installed);
        let err = apply_product_on_client_transition(&backend, poc)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MusterError>(),
            Some(MusterError::MissingData(_))
        ));
    }

    #[tokio::test]
    async fn test_not_installed_forces_versions_null() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let mut poc = ProductOnClient::new("firefox", "client1.example.org");
        poc.product_version = Some("140.0".to_string());
        poc.package_version = Some("2".to_string());
        let row = apply_product_on_client_transition(&backend, poc).await.unwrap();
        assert!(row.product_version.is_none());
        assert!(row.package_version.is_none());
    }

    #[tokio::test]
    async fn test_action_request_stamps_last_action_and_target() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let poc = ProductOnClient::with_action(
            "firefox",
            "client1.example.org",
            ActionRequest::Setup,
        );
        let row = apply_product_on_client_transition(&backend, poc).await.unwrap();
        assert_eq!(row.last_action, Some(ActionRequest::Setup));
        assert_eq!(row.target_configuration, Some(TargetConfiguration::Installed));
        assert_eq!(row.action_progress.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_transition_merges_with_prior_row() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let mut prior = ProductOnClient::new("firefox", "client1.example.org");
        prior.action_progress = Some("downloading".to_string());
        backend.insert_object(prior).await.unwrap();

        let patch = ProductOnClient::with_action(
            "firefox",
            "client1.example.org",
            ActionRequest::Setup,
        );
        let row = apply_product_on_client_transition(&backend, patch).await.unwrap();
        // Field not supplied keeps its prior value
        assert_eq!(row.action_progress.as_deref(), Some("downloading"));
        assert_eq!(row.action_request, Some(ActionRequest::Setup));
    }

    #[tokio::test]
    async fn test_delete_last_version_purges_states() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;
        backend
            .insert_object(ProductProperty::new("firefox", "140.0", "2", "channel"))
            .await
            .unwrap();
        backend
            .insert_object(ProductPropertyState::new(
                "firefox",
                "channel",
                "client1.example.org",
                vec![Value::String("esr".to_string())],
            ))
            .await
            .unwrap();
        backend
            .insert_object(ProductOnClient::new("firefox", "client1.example.org"))
            .await
            .unwrap();

        delete_products(&backend, vec![Product::new("firefox", "140.0", "2")])
            .await
            .unwrap();

        let states: Vec<ProductPropertyState> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert!(states.is_empty());
        let on_client: Vec<ProductOnClient> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert!(on_client.is_empty());
        let on_depot: Vec<ProductOnDepot> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        assert!(on_depot.is_empty());
    }

    #[tokio::test]
    async fn test_property_state_adjustment() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let mut property = ProductProperty::new("firefox", "140.0", "2", "channel");
        property.editable = Some(false);
        property.possible_values = Some(vec![Value::String("Release".to_string())]);
        backend.insert_object(property.clone()).await.unwrap();

        backend
            .insert_object(ProductPropertyState::new(
                "firefox",
                "channel",
                "client1.example.org",
                vec![Value::String("release".to_string())],
            ))
            .await
            .unwrap();
        backend
            .insert_object(ProductPropertyState::new(
                "firefox",
                "channel",
                "depot.example.org",
                vec![Value::String("nightly".to_string())],
            ))
            .await
            .unwrap();

        adjust_property_states(&backend, &property).await.unwrap();

        let states: Vec<ProductPropertyState> =
            backend.get_objects(&[], Filter::new()).await.unwrap();
        // The case-insensitive match was corrected, the invalid one deleted
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].object_id, "client1.example.org");
        assert_eq!(
            states[0].values,
            Some(vec![Value::String("Release".to_string())])
        );
    }

    #[tokio::test]
    async fn test_product_on_client_default_synthesis() {
        let backend = MemoryBackend::new();
        seed_depot(&backend).await;

        let rows = add_product_on_client_defaults(&backend, vec![], &[], &Filter::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_generated);
        assert_eq!(rows[0].product_id, "firefox");
        assert_eq!(
            rows[0].installation_status,
            Some(InstallationStatus::NotInstalled)
        );
        assert_eq!(rows[0].action_request, Some(ActionRequest::None));
    }
}
