//! Method dispatcher
//!
//! Fans the logical backend API out to multiple concrete backends. An
//! ordered rule table maps method-name patterns to backend lists; the table
//! is resolved ONCE at construction into a fixed per-method plan, so no
//! regex runs on the call path.
//!
//! Merge semantics across the backends of one plan:
//! - row sequences concatenate in backend-list order
//! - option/interface maps merge with later backends winning on collision
//! - void results collapse
//! - anything else: the last result wins
//!
//! A method no rule routes is a silent no-op returning an empty result. A
//! failing backend call aborts the whole dispatch immediately.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use muster_common::MusterError;

use muster_api::{Entity, Filter};

use crate::contract::{BackendInfo, ConfigDataBackend, ObjectBackend};
use crate::operation::{MethodInterface, Verb, method_name, storage_interface};
use crate::options::BackendOptions;

/// One dispatch table entry: a method-name regex and the backends to invoke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRule {
    pub pattern: String,
    pub backends: Vec<String>,
}

impl DispatchRule {
    pub fn new(pattern: impl Into<String>, backends: Vec<&str>) -> Self {
        DispatchRule {
            pattern: pattern.into(),
            backends: backends.into_iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// The method dispatcher, itself a storage backend
pub struct Dispatcher {
    backends: Vec<(String, Arc<dyn ConfigDataBackend>)>,
    /// method name -> backend indexes, resolved at construction
    plan: HashMap<String, Vec<usize>>,
    interface: Vec<MethodInterface>,
}

impl Dispatcher {
    /// Resolve the rule table against the named backends
    ///
    /// Fails with a configuration error on a malformed pattern or a rule
    /// referencing an unknown backend name.
    pub fn new(
        rules: &[DispatchRule],
        backends: Vec<(String, Arc<dyn ConfigDataBackend>)>,
    ) -> anyhow::Result<Self> {
        if rules.is_empty() {
            return Err(MusterError::Configuration("empty dispatch rule table".to_string()).into());
        }

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = regex::Regex::new(&format!("^(?:{})$", rule.pattern)).map_err(|e| {
                MusterError::Configuration(format!(
                    "invalid dispatch pattern '{}': {}",
                    rule.pattern, e
                ))
            })?;
            let mut indexes = Vec::with_capacity(rule.backends.len());
            for name in &rule.backends {
                let index = backends.iter().position(|(n, _)| n == name).ok_or_else(|| {
                    MusterError::Configuration(format!(
                        "dispatch rule '{}' references unknown backend '{}'",
                        rule.pattern, name
                    ))
                })?;
                indexes.push(index);
            }
            compiled.push((regex, indexes));
        }

        let mut plan = HashMap::new();
        for method in storage_interface() {
            if let Some((_, indexes)) = compiled.iter().find(|(re, _)| re.is_match(&method.name)) {
                plan.insert(method.name.clone(), indexes.clone());
            } else {
                debug!(method = %method.name, "no dispatch rule, method is a no-op");
            }
        }

        Ok(Dispatcher {
            backends,
            plan,
            interface: storage_interface(),
        })
    }

    fn targets(&self, method: &str) -> &[usize] {
        self.plan.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    fn backend(&self, index: usize) -> &Arc<dyn ConfigDataBackend> {
        &self.backends[index].1
    }
}

#[async_trait]
impl<E: Entity> ObjectBackend<E> for Dispatcher
where
    dyn ConfigDataBackend: ObjectBackend<E>,
{
    async fn insert_object(&self, obj: E) -> anyhow::Result<()> {
        for index in self.targets(&method_name::<E>(Verb::InsertObject)) {
            self.backend(*index).insert_object(obj.clone()).await?;
        }
        Ok(())
    }

    async fn update_object(&self, obj: E) -> anyhow::Result<()> {
        for index in self.targets(&method_name::<E>(Verb::UpdateObject)) {
            self.backend(*index).update_object(obj.clone()).await?;
        }
        Ok(())
    }

    async fn get_objects(&self, attributes: &[String], filter: Filter) -> anyhow::Result<Vec<E>> {
        let mut rows = Vec::new();
        for index in self.targets(&method_name::<E>(Verb::GetObjects)) {
            rows.extend(
                self.backend(*index)
                    .get_objects(attributes, filter.clone())
                    .await?,
            );
        }
        Ok(rows)
    }

    async fn delete_objects(&self, objs: Vec<E>) -> anyhow::Result<()> {
        for index in self.targets(&method_name::<E>(Verb::DeleteObjects)) {
            self.backend(*index).delete_objects(objs.clone()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigDataBackend for Dispatcher {
    async fn backend_create_base(&self) -> anyhow::Result<()> {
        for index in self.targets("backend_createBase") {
            self.backend(*index).backend_create_base().await?;
        }
        Ok(())
    }

    async fn backend_delete_base(&self) -> anyhow::Result<()> {
        for index in self.targets("backend_deleteBase") {
            self.backend(*index).backend_delete_base().await?;
        }
        Ok(())
    }

    async fn backend_exit(&self) -> anyhow::Result<()> {
        for index in self.targets("backend_exit") {
            self.backend(*index).backend_exit().await?;
        }
        Ok(())
    }

    async fn backend_set_options(&self, options: BackendOptions) -> anyhow::Result<()> {
        for index in self.targets("backend_setOptions") {
            self.backend(*index).backend_set_options(options).await?;
        }
        Ok(())
    }

    async fn backend_get_options(&self) -> anyhow::Result<BackendOptions> {
        // Key-wise merge, later backends win
        let mut merged = serde_json::Map::new();
        for index in self.targets("backend_getOptions") {
            let options = self.backend(*index).backend_get_options().await?;
            if let serde_json::Value::Object(map) = serde_json::to_value(options)? {
                merged.extend(map);
            }
        }
        Ok(serde_json::from_value(serde_json::Value::Object(merged)).unwrap_or_default())
    }

    fn backend_get_interface(&self) -> Vec<MethodInterface> {
        self.interface.clone()
    }

    async fn backend_info(&self) -> anyhow::Result<BackendInfo> {
        // Last non-null result wins
        let mut info = BackendInfo::default();
        for index in self.targets("backend_info") {
            info = self.backend(*index).backend_info().await?;
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use muster_api::entity::{Host, Product};

    fn two_backends() -> Vec<(String, Arc<dyn ConfigDataBackend>)> {
        vec![
            ("first".to_string(), Arc::new(MemoryBackend::new()) as _),
            ("second".to_string(), Arc::new(MemoryBackend::new()) as _),
        ]
    }

    #[tokio::test]
    async fn test_sequences_concatenate_in_backend_order() {
        let backends = two_backends();
        backends[0]
            .1
            .insert_object(Host::new_client("a.example.org"))
            .await
            .unwrap();
        backends[1]
            .1
            .insert_object(Host::new_client("b.example.org"))
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(
            &[DispatchRule::new(".*", vec!["first", "second"])],
            backends,
        )
        .unwrap();

        let rows: Vec<Host> = dispatcher.get_objects(&[], Filter::new()).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a.example.org", "b.example.org"]);
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let backends = two_backends();
        let dispatcher = Dispatcher::new(
            &[
                DispatchRule::new("host_.*", vec!["first"]),
                DispatchRule::new(".*", vec!["second"]),
            ],
            backends,
        )
        .unwrap();

        dispatcher
            .insert_object(Host::new_client("a.example.org"))
            .await
            .unwrap();
        dispatcher
            .insert_object(Product::new("firefox", "1.0", "1"))
            .await
            .unwrap();

        // The host went to "first" only, the product to "second" only
        let hosts: Vec<Host> = dispatcher.backend(0).get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(hosts.len(), 1);
        let hosts: Vec<Host> = dispatcher.backend(1).get_objects(&[], Filter::new()).await.unwrap();
        assert!(hosts.is_empty());
        let products: Vec<Product> =
            dispatcher.backend(1).get_objects(&[], Filter::new()).await.unwrap();
        assert_eq!(products.len(), 1);
    }

    #[tokio::test]
    async fn test_unrouted_method_is_noop() {
        let backends = two_backends();
        let dispatcher = Dispatcher::new(
            &[DispatchRule::new("host_.*", vec!["first"])],
            backends,
        )
        .unwrap();

        // No rule matches product methods: writes vanish, reads are empty
        dispatcher
            .insert_object(Product::new("firefox", "1.0", "1"))
            .await
            .unwrap();
        let products: Vec<Product> = dispatcher.get_objects(&[], Filter::new()).await.unwrap();
        assert!(products.is_empty());
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let result = Dispatcher::new(
            &[DispatchRule::new(".*", vec!["nosuchbackend"])],
            two_backends(),
        );
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<MusterError>(),
            Some(MusterError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_pattern_is_configuration_error() {
        let result = Dispatcher::new(&[DispatchRule::new("host_(", vec!["first"])], two_backends());
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_rule_table_is_configuration_error() {
        assert!(Dispatcher::new(&[], two_backends()).is_err());
    }

    #[tokio::test]
    async fn test_options_merge_later_wins() {
        let backends = two_backends();
        backends[0]
            .1
            .backend_set_options(BackendOptions {
                add_config_state_defaults: true,
                return_objects_on_update_and_create: true,
                ..Default::default()
            })
            .await
            .unwrap();
        backends[1]
            .1
            .backend_set_options(BackendOptions {
                add_config_state_defaults: false,
                process_product_on_client_sequence: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(
            &[DispatchRule::new(".*", vec!["first", "second"])],
            backends,
        )
        .unwrap();

        let merged = dispatcher.backend_get_options().await.unwrap();
        // "second" overwrote every key it carries
        assert!(!merged.add_config_state_defaults);
        assert!(merged.process_product_on_client_sequence);
    }

    #[test]
    fn test_rules_parse_from_toml() {
        #[derive(serde::Deserialize)]
        struct RuleFile {
            rules: Vec<DispatchRule>,
        }

        let parsed: RuleFile = toml::from_str(
            r#"
            [[rules]]
            pattern = "audit.*"
            backends = ["file"]

            [[rules]]
            pattern = ".*"
            backends = ["mysql", "file"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.rules.len(), 2);
        assert_eq!(parsed.rules[1].backends, vec!["mysql", "file"]);
    }
}
