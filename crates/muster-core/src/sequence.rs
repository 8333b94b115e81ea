//! Product action sequencing and dependency resolution
//!
//! Both operate on a batch of ProductOnClient rows grouped by client,
//! against the products, versions, and dependencies visible on each
//! client's resolved depot. Dependency chains are followed transitively,
//! pulling in indirectly-required products not in the original batch.
//!
//! Failure policy: an unavailable required product disables the dependent
//! action (never raises), a conflicting explicit request is skipped with a
//! warning (never overridden), a cycle is cut with a warning.

use std::collections::{BTreeMap, HashSet};

use futures::future::try_join_all;
use tracing::warn;

use muster_api::entity::{
    ActionRequest, InstallationStatus, Product, ProductDependency, ProductOnClient,
    ProductOnDepot, RequirementType,
};
use muster_api::{Entity, Filter};
use muster_backend::contract::{ConfigDataBackend, ObjectBackend};
use muster_common::{CONFIG_ID_PRODUCT_SORT_ALGORITHM, DEFAULT_PRODUCT_SORT_ALGORITHM};

use crate::service::config::{effective_config_values, resolve_depot_id};

/// Products, versions, and dependencies visible on one client's depot
struct DepotView {
    /// Depot assignment by product id
    pods: BTreeMap<String, ProductOnDepot>,
    /// Product rows matching the depot's versions, by product id
    products: BTreeMap<String, Product>,
    /// Dependencies declared by the depot's product versions
    dependencies: Vec<ProductDependency>,
}

impl DepotView {
    fn priority(&self, product_id: &str) -> i32 {
        self.products
            .get(product_id)
            .and_then(|p| p.priority)
            .unwrap_or(0)
    }

    fn dependencies_of(&self, product_id: &str, action: ActionRequest) -> Vec<&ProductDependency> {
        self.dependencies
            .iter()
            .filter(|d| d.product_id == product_id && d.product_action == action)
            .collect()
    }
}

async fn depot_view(backend: &dyn ConfigDataBackend, client_id: &str) -> anyhow::Result<DepotView> {
    let depot_id = resolve_depot_id(backend, client_id).await?;

    let pod_rows: Vec<ProductOnDepot> = backend
        .get_objects(&[], Filter::new().with("depotId", depot_id))
        .await?;
    let product_rows: Vec<Product> = backend.get_objects(&[], Filter::new()).await?;
    let dependency_rows: Vec<ProductDependency> = backend.get_objects(&[], Filter::new()).await?;

    let pods: BTreeMap<String, ProductOnDepot> = pod_rows
        .into_iter()
        .map(|pod| (pod.product_id.clone(), pod))
        .collect();

    let products = product_rows
        .into_iter()
        .filter(|p| {
            pods.get(&p.id).is_some_and(|pod| {
                pod.product_version == p.product_version && pod.package_version == p.package_version
            })
        })
        .map(|p| (p.id.clone(), p))
        .collect();

    let dependencies = dependency_rows
        .into_iter()
        .filter(|d| {
            pods.get(&d.product_id).is_some_and(|pod| {
                pod.product_version == d.product_version && pod.package_version == d.package_version
            })
        })
        .collect();

    Ok(DepotView {
        pods,
        products,
        dependencies,
    })
}

fn group_by_client(pocs: Vec<ProductOnClient>) -> BTreeMap<String, Vec<ProductOnClient>> {
    let mut by_client: BTreeMap<String, Vec<ProductOnClient>> = BTreeMap::new();
    for poc in pocs {
        by_client.entry(poc.client_id.clone()).or_default().push(poc);
    }
    by_client
}

/// Expand a write batch with the ProductOnClient rows its dependencies
/// require
pub async fn add_dependencies(
    backend: &dyn ConfigDataBackend,
    pocs: Vec<ProductOnClient>,
) -> anyhow::Result<Vec<ProductOnClient>> {
    let groups = group_by_client(pocs);
    let results = try_join_all(
        groups
            .into_iter()
            .map(|(client_id, batch)| add_dependencies_for_client(backend, client_id, batch)),
    )
    .await?;
    Ok(results.into_iter().flatten().collect())
}

async fn add_dependencies_for_client(
    backend: &dyn ConfigDataBackend,
    client_id: String,
    batch: Vec<ProductOnClient>,
) -> anyhow::Result<Vec<ProductOnClient>> {
    let view = depot_view(backend, &client_id).await?;

    let stored: Vec<ProductOnClient> = backend
        .get_objects(&[], Filter::new().with("clientId", client_id.clone()))
        .await?;
    let mut state: BTreeMap<String, ProductOnClient> = stored
        .into_iter()
        .map(|poc| (poc.product_id.clone(), poc))
        .collect();

    let batch_ids: Vec<String> = batch.iter().map(|poc| poc.product_id.clone()).collect();
    let mut included: Vec<String> = batch_ids.clone();
    for poc in batch {
        state.insert(poc.product_id.clone(), poc);
    }

    for product_id in &batch_ids {
        if state
            .get(product_id)
            .map(|poc| poc.action_request_or_none())
            .unwrap_or(ActionRequest::None)
            != ActionRequest::None
        {
            let mut visited = HashSet::new();
            resolve_product(
                &view,
                &client_id,
                &mut state,
                &mut included,
                &mut visited,
                product_id,
            );
        }
    }

    Ok(included
        .iter()
        .filter_map(|product_id| state.get(product_id).cloned())
        .collect())
}

/// What a dependency asks of the required product's current state
enum Requirement {
    Satisfied,
    Conflict(ActionRequest),
    Needs(ActionRequest),
}

fn evaluate_dependency(dep: &ProductDependency, current: Option<&ProductOnClient>) -> Requirement {
    let current_action = current
        .map(|poc| poc.action_request_or_none())
        .unwrap_or(ActionRequest::None);
    let current_status = current
        .map(|poc| poc.installation_status_or_default())
        .unwrap_or(InstallationStatus::NotInstalled);

    let needed = if let Some(required_action) = dep.required_action {
        required_action
    } else {
        match dep.required_installation_status {
            Some(InstallationStatus::Installed) => {
                if current_status == InstallationStatus::Installed
                    && current_action != ActionRequest::Uninstall
                {
                    return Requirement::Satisfied;
                }
                ActionRequest::Setup
            }
            Some(InstallationStatus::NotInstalled) => {
                if current_status == InstallationStatus::NotInstalled
                    && current_action == ActionRequest::None
                {
                    return Requirement::Satisfied;
                }
                ActionRequest::Uninstall
            }
            None => return Requirement::Satisfied,
        }
    };

    if current_action == needed {
        Requirement::Satisfied
    } else if current_action != ActionRequest::None {
        Requirement::Conflict(current_action)
    } else {
        Requirement::Needs(needed)
    }
}

fn resolve_product(
    view: &DepotView,
    client_id: &str,
    state: &mut BTreeMap<String, ProductOnClient>,
    included: &mut Vec<String>,
    visited: &mut HashSet<String>,
    product_id: &str,
) {
    if !visited.insert(product_id.to_string()) {
        warn!(
            product = product_id,
            client = client_id,
            "dependency cycle detected, not following"
        );
        return;
    }

    let action = match state.get(product_id) {
        Some(poc) => poc.action_request_or_none(),
        None => return,
    };
    if action == ActionRequest::None {
        return;
    }

    let deps: Vec<ProductDependency> = view
        .dependencies_of(product_id, action)
        .into_iter()
        .cloned()
        .collect();
    for dep in deps {
        let required_id = dep.required_product_id.clone();

        let available = view.pods.get(&required_id).is_some_and(|pod| {
            dep.required_product_version
                .as_ref()
                .is_none_or(|v| v == &pod.product_version)
                && dep
                    .required_package_version
                    .as_ref()
                    .is_none_or(|v| v == &pod.package_version)
        });
        if !available {
            warn!(
                product = product_id,
                required = %required_id,
                client = client_id,
                "required product not available on depot, disabling action"
            );
            if let Some(poc) = state.get_mut(product_id) {
                poc.action_request = Some(ActionRequest::None);
            }
            return;
        }

        match evaluate_dependency(&dep, state.get(&required_id)) {
            Requirement::Satisfied => {}
            Requirement::Conflict(current) => {
                warn!(
                    product = product_id,
                    required = %required_id,
                    current = %current,
                    client = client_id,
                    "conflicting action request already set, not overriding"
                );
            }
            Requirement::Needs(needed) => {
                let mut poc = state.remove(&required_id).unwrap_or_else(|| {
                    let mut poc = ProductOnClient::new(required_id.clone(), client_id);
                    if let Some(pod) = view.pods.get(&required_id) {
                        poc.product_type = pod.product_type;
                    }
                    poc.fill_defaults();
                    poc
                });
                poc.action_request = Some(needed);
                state.insert(required_id.clone(), poc);
                if !included.contains(&required_id) {
                    included.push(required_id.clone());
                }
                resolve_product(view, client_id, state, included, visited, &required_id);
            }
        }
    }
}

/// Stamp every pending action with its 1-based execution position
pub async fn sequence(
    backend: &dyn ConfigDataBackend,
    pocs: Vec<ProductOnClient>,
) -> anyhow::Result<Vec<ProductOnClient>> {
    let groups = group_by_client(pocs);
    let results = try_join_all(
        groups
            .into_iter()
            .map(|(client_id, rows)| sequence_for_client(backend, client_id, rows)),
    )
    .await?;
    Ok(results.into_iter().flatten().collect())
}

async fn sequence_for_client(
    backend: &dyn ConfigDataBackend,
    client_id: String,
    mut rows: Vec<ProductOnClient>,
) -> anyhow::Result<Vec<ProductOnClient>> {
    let pending: Vec<(String, ActionRequest)> = rows
        .iter()
        .filter(|poc| poc.action_request_or_none() != ActionRequest::None)
        .map(|poc| (poc.product_id.clone(), poc.action_request_or_none()))
        .collect();
    if pending.is_empty() {
        for row in &mut rows {
            row.action_sequence = Some(-1);
        }
        return Ok(rows);
    }

    let algorithm = effective_config_values(backend, CONFIG_ID_PRODUCT_SORT_ALGORITHM, &client_id)
        .await
        .ok()
        .and_then(|values| {
            values
                .first()
                .and_then(|v| v.as_str().map(|s| s.to_string()))
        })
        .unwrap_or_else(|| DEFAULT_PRODUCT_SORT_ALGORITHM.to_string());

    let view = depot_view(backend, &client_id).await?;

    let relevant: Vec<&ProductDependency> = pending
        .iter()
        .flat_map(|(product_id, action)| view.dependencies_of(product_id, *action))
        .filter(|dep| {
            dep.requirement_type.is_some()
                && pending.iter().any(|(id, _)| id == &dep.required_product_id)
        })
        .collect();

    let order = if algorithm == "algorithm2" {
        order_topological(&view, &pending, &relevant)
    } else {
        order_by_relocation(&view, &pending, &relevant)
    };

    let positions: BTreeMap<&str, i32> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index as i32 + 1))
        .collect();
    for row in &mut rows {
        row.action_sequence = positions.get(row.product_id.as_str()).copied().or(Some(-1));
    }
    Ok(rows)
}

fn priority_order(view: &DepotView, pending: &[(String, ActionRequest)]) -> Vec<String> {
    let mut order: Vec<String> = pending.iter().map(|(id, _)| id.clone()).collect();
    // Stable: equal priorities keep encounter order
    order.sort_by_key(|id| -view.priority(id));
    order
}

/// Priority order with one relocation pass over the declared constraints
fn order_by_relocation(
    view: &DepotView,
    pending: &[(String, ActionRequest)],
    dependencies: &[&ProductDependency],
) -> Vec<String> {
    let mut order = priority_order(view, pending);

    for dep in dependencies {
        let Some(dependent_pos) = order.iter().position(|id| id == &dep.product_id) else {
            continue;
        };
        let Some(required_pos) = order.iter().position(|id| id == &dep.required_product_id)
        else {
            continue;
        };

        match dep.requirement_type {
            Some(RequirementType::Before) if required_pos > dependent_pos => {
                let required = order.remove(required_pos);
                order.insert(dependent_pos, required);
            }
            Some(RequirementType::After) if required_pos < dependent_pos => {
                let required = order.remove(required_pos);
                order.insert(dependent_pos, required);
            }
            _ => {}
        }
    }
    order
}

/// Priority-seeded topological order over the declared constraints
fn order_topological(
    view: &DepotView,
    pending: &[(String, ActionRequest)],
    dependencies: &[&ProductDependency],
) -> Vec<String> {
    let seed = priority_order(view, pending);

    // requirement "before": required precedes dependent
    // requirement "after": dependent precedes required
    let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = seed.iter().map(|id| (id.as_str(), 0)).collect();
    for dep in dependencies {
        let (earlier, later) = match dep.requirement_type {
            Some(RequirementType::Before) => {
                (dep.required_product_id.as_str(), dep.product_id.as_str())
            }
            Some(RequirementType::After) => {
                (dep.product_id.as_str(), dep.required_product_id.as_str())
            }
            None => continue,
        };
        successors.entry(earlier).or_default().push(later);
        *indegree.entry(later).or_default() += 1;
    }

    let mut order = Vec::with_capacity(seed.len());
    let mut ready: Vec<&str> = seed
        .iter()
        .map(String::as_str)
        .filter(|id| indegree[id] == 0)
        .collect();

    while let Some(next) = ready.first().copied() {
        ready.remove(0);
        order.push(next.to_string());
        for later in successors.get(next).cloned().unwrap_or_default() {
            let entry = indegree.get_mut(later).expect("known node");
            *entry -= 1;
            if *entry == 0 {
                // Reinsert in seed (priority) order
                let seed_pos = |id: &str| seed.iter().position(|s| s == id).unwrap_or(usize::MAX);
                let insert_at = ready
                    .iter()
                    .position(|r| seed_pos(r) > seed_pos(later))
                    .unwrap_or(ready.len());
                ready.insert(insert_at, later);
            }
        }
    }

    if order.len() < seed.len() {
        warn!("dependency constraints contain a cycle, appending remainder in priority order");
        for id in &seed {
            if !order.contains(id) {
                order.push(id.clone());
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::entity::{Config, ConfigState, Host};
    use muster_backend::{MemoryBackend, ObjectBackend};
    use muster_common::CONFIG_ID_DEPOT;
    use serde_json::Value;

    async fn seed(backend: &MemoryBackend) {
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
    }

    async fn add_product(backend: &MemoryBackend, id: &str, priority: i32) {
        let mut product = Product::new(id, "1.0", "1");
        product.priority = Some(priority);
        backend.insert_object(product).await.unwrap();
        backend
            .insert_object(ProductOnDepot::new(id, "1.0", "1", "depot.example.org"))
            .await
            .unwrap();
    }

    fn dependency(
        product_id: &str,
        required: &str,
        requirement_type: Option<RequirementType>,
    ) -> ProductDependency {
        ProductDependency {
            product_id: product_id.to_string(),
            product_version: "1.0".to_string(),
            package_version: "1".to_string(),
            product_action: ActionRequest::Setup,
            required_product_id: required.to_string(),
            required_installation_status: Some(InstallationStatus::Installed),
            requirement_type,
            ..Default::default()
        }
    }

    fn setup_action(product_id: &str) -> ProductOnClient {
        ProductOnClient::with_action(product_id, "client1.example.org", ActionRequest::Setup)
    }

    #[tokio::test]
    async fn test_dependency_addition_pulls_required_product() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "firefox", 0).await;
        add_product(&backend, "vcredist", 0).await;
        backend
            .insert_object(dependency("firefox", "vcredist", None))
            .await
            .unwrap();

        let out = add_dependencies(&backend, vec![setup_action("firefox")])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        let vcredist = out.iter().find(|p| p.product_id == "vcredist").unwrap();
        assert_eq!(vcredist.action_request, Some(ActionRequest::Setup));
    }

    #[tokio::test]
    async fn test_dependency_addition_is_transitive() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "a", 0).await;
        add_product(&backend, "b", 0).await;
        add_product(&backend, "c", 0).await;
        backend
            .insert_object(dependency("a", "b", None))
            .await
            .unwrap();
        backend
            .insert_object(dependency("b", "c", None))
            .await
            .unwrap();

        let out = add_dependencies(&backend, vec![setup_action("a")]).await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|p| p.action_request == Some(ActionRequest::Setup)));
    }

    #[tokio::test]
    async fn test_explicit_request_is_never_downgraded() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "firefox", 0).await;
        add_product(&backend, "vcredist", 0).await;
        backend
            .insert_object(dependency("firefox", "vcredist", None))
            .await
            .unwrap();

        let out = add_dependencies(
            &backend,
            vec![setup_action("firefox"), setup_action("vcredist")],
        )
        .await
        .unwrap();
        assert_eq!(out.len(), 2);
        let vcredist = out.iter().find(|p| p.product_id == "vcredist").unwrap();
        assert_eq!(vcredist.action_request, Some(ActionRequest::Setup));
    }

    #[tokio::test]
    async fn test_conflicting_request_is_skipped_not_overridden() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "firefox", 0).await;
        add_product(&backend, "vcredist", 0).await;
        backend
            .insert_object(dependency("firefox", "vcredist", None))
            .await
            .unwrap();

        let conflicting = ProductOnClient::with_action(
            "vcredist",
            "client1.example.org",
            ActionRequest::Uninstall,
        );
        let out = add_dependencies(&backend, vec![setup_action("firefox"), conflicting])
            .await
            .unwrap();
        let vcredist = out.iter().find(|p| p.product_id == "vcredist").unwrap();
        assert_eq!(vcredist.action_request, Some(ActionRequest::Uninstall));
    }

    #[tokio::test]
    async fn test_unavailable_requirement_disables_dependent() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "firefox", 0).await;
        // vcredist is not on the depot
        backend
            .insert_object(dependency("firefox", "vcredist", None))
            .await
            .unwrap();

        let out = add_dependencies(&backend, vec![setup_action("firefox")])
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].action_request, Some(ActionRequest::None));
    }

    #[tokio::test]
    async fn test_dependency_cycle_is_cut() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "a", 0).await;
        add_product(&backend, "b", 0).await;
        backend
            .insert_object(dependency("a", "b", None))
            .await
            .unwrap();
        backend
            .insert_object(dependency("b", "a", None))
            .await
            .unwrap();

        let out = add_dependencies(&backend, vec![setup_action("a")]).await.unwrap();
        // Terminates, both products requested once
        assert_eq!(out.len(), 2);
    }

    async fn sequence_positions(backend: &MemoryBackend, rows: Vec<ProductOnClient>) -> BTreeMap<String, i32> {
        sequence(backend, rows)
            .await
            .unwrap()
            .into_iter()
            .map(|poc| (poc.product_id.clone(), poc.action_sequence.unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_priority_orders_sequence() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "late", -90).await;
        add_product(&backend, "early", 90).await;
        add_product(&backend, "normal", 0).await;

        let positions = sequence_positions(
            &backend,
            vec![
                setup_action("late"),
                setup_action("early"),
                setup_action("normal"),
            ],
        )
        .await;
        assert!(positions["early"] < positions["normal"]);
        assert!(positions["normal"] < positions["late"]);
    }

    #[tokio::test]
    async fn test_before_constraint_is_satisfied() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        // Higher priority would put the dependent first
        add_product(&backend, "app", 50).await;
        add_product(&backend, "runtime", -50).await;
        backend
            .insert_object(dependency("app", "runtime", Some(RequirementType::Before)))
            .await
            .unwrap();

        let positions =
            sequence_positions(&backend, vec![setup_action("app"), setup_action("runtime")]).await;
        assert!(positions["runtime"] < positions["app"]);
    }

    #[tokio::test]
    async fn test_after_constraint_is_satisfied() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "app", -50).await;
        add_product(&backend, "cleanup", 50).await;
        backend
            .insert_object(dependency("app", "cleanup", Some(RequirementType::After)))
            .await
            .unwrap();

        let positions =
            sequence_positions(&backend, vec![setup_action("app"), setup_action("cleanup")]).await;
        assert!(positions["cleanup"] > positions["app"]);
    }

    #[tokio::test]
    async fn test_algorithm2_satisfies_same_guarantees() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        let mut config = Config::new(CONFIG_ID_PRODUCT_SORT_ALGORITHM);
        config.default_values = Some(vec![Value::String("algorithm2".to_string())]);
        backend.insert_object(config).await.unwrap();

        add_product(&backend, "app", 50).await;
        add_product(&backend, "runtime", -50).await;
        add_product(&backend, "early", 90).await;
        backend
            .insert_object(dependency("app", "runtime", Some(RequirementType::Before)))
            .await
            .unwrap();

        let positions = sequence_positions(
            &backend,
            vec![
                setup_action("app"),
                setup_action("runtime"),
                setup_action("early"),
            ],
        )
        .await;
        assert!(positions["runtime"] < positions["app"]);
        assert_eq!(positions["early"], 1);
    }

    #[tokio::test]
    async fn test_rows_without_pending_action_are_unsequenced() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        add_product(&backend, "app", 0).await;

        let mut installed = ProductOnClient::new("idle", "client1.example.org");
        installed.fill_defaults();
        let out = sequence(&backend, vec![setup_action("app"), installed])
            .await
            .unwrap();
        let idle = out.iter().find(|p| p.product_id == "idle").unwrap();
        assert_eq!(idle.action_sequence, Some(-1));
        let app = out.iter().find(|p| p.product_id == "app").unwrap();
        assert_eq!(app.action_sequence, Some(1));
    }

    #[tokio::test]
    async fn test_algorithm_selection_per_config_state() {
        let backend = MemoryBackend::new();
        seed(&backend).await;
        let mut config = Config::new(CONFIG_ID_PRODUCT_SORT_ALGORITHM);
        config.default_values = Some(vec![Value::String("algorithm1".to_string())]);
        backend.insert_object(config).await.unwrap();
        backend
            .insert_object(ConfigState::new(
                CONFIG_ID_PRODUCT_SORT_ALGORITHM,
                "client1.example.org",
                vec![Value::String("algorithm2".to_string())],
            ))
            .await
            .unwrap();

        add_product(&backend, "a", 10).await;
        add_product(&backend, "b", 0).await;
        let positions =
            sequence_positions(&backend, vec![setup_action("a"), setup_action("b")]).await;
        assert!(positions["a"] < positions["b"]);
    }
}
