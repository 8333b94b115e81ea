//! Operation naming and interface introspection
//!
//! Every public backend method has a stable wire-style name
//! (`host_getObjects`, `backend_setOptions`, ...) used by the dispatch and
//! ACL rule tables. The full method list is generated once and reused both
//! for dispatch-plan resolution and for `backend_get_interface`.

use serde::{Deserialize, Serialize};

use muster_api::Entity;

/// The operation kinds defined for every entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    InsertObject,
    UpdateObject,
    GetObjects,
    DeleteObjects,
    CreateObjects,
    UpdateObjects,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::InsertObject => "insertObject",
            Verb::UpdateObject => "updateObject",
            Verb::GetObjects => "getObjects",
            Verb::DeleteObjects => "deleteObjects",
            Verb::CreateObjects => "createObjects",
            Verb::UpdateObjects => "updateObjects",
        }
    }

    /// Formal parameter names, for interface introspection
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Verb::InsertObject | Verb::UpdateObject => &["object"],
            Verb::GetObjects => &["attributes", "filter"],
            Verb::DeleteObjects | Verb::CreateObjects | Verb::UpdateObjects => &["objects"],
        }
    }

    /// Verbs belonging to the storage contract (the rest belong to the
    /// business layer)
    pub const STORAGE: &'static [Verb] = &[
        Verb::InsertObject,
        Verb::UpdateObject,
        Verb::GetObjects,
        Verb::DeleteObjects,
    ];

    pub const ALL: &'static [Verb] = &[
        Verb::InsertObject,
        Verb::UpdateObject,
        Verb::GetObjects,
        Verb::DeleteObjects,
        Verb::CreateObjects,
        Verb::UpdateObjects,
    ];
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase the first character of an entity type name
fn method_prefix(object_type: &str) -> String {
    let mut chars = object_type.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Wire-style method name of an entity operation
pub fn method_name<E: Entity>(verb: Verb) -> String {
    format!("{}_{}", method_prefix(E::OBJECT_TYPE), verb.as_str())
}

/// Entity method-name prefixes, in contract order
pub const ENTITY_PREFIXES: &'static [&'static str] = &[
    "host",
    "config",
    "configState",
    "product",
    "productProperty",
    "productDependency",
    "productOnDepot",
    "productOnClient",
    "productPropertyState",
    "group",
    "objectToGroup",
    "licenseContract",
    "softwareLicense",
    "licensePool",
    "softwareLicenseToLicensePool",
    "licenseOnClient",
    "auditSoftware",
    "auditSoftwareOnClient",
    "auditHardwareOnHost",
];

/// Lifecycle and introspection methods of the storage contract
pub const BACKEND_METHODS: &'static [(&'static str, &'static [&'static str])] = &[
    ("backend_createBase", &[]),
    ("backend_deleteBase", &[]),
    ("backend_exit", &[]),
    ("backend_setOptions", &["options"]),
    ("backend_getOptions", &[]),
    ("backend_getInterface", &[]),
    ("backend_info", &[]),
];

/// Business-layer methods outside the per-entity scheme
pub const EXTENDED_METHODS: &'static [(&'static str, &'static [&'static str])] = &[
    (
        "configState_getClientToDepotserver",
        &["depotIds", "clientIds", "masterOnly", "productIds"],
    ),
    (
        "licenseOnClient_getOrCreate",
        &["clientId", "selector"],
    ),
    ("auditHardwareOnHost_setObsolete", &["hostId"]),
];

/// Name and formal parameter list of one public method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInterface {
    pub name: String,
    pub params: Vec<String>,
}

impl MethodInterface {
    fn new(name: impl Into<String>, params: &[&str]) -> Self {
        MethodInterface {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The full public method list of the storage contract
pub fn storage_interface() -> Vec<MethodInterface> {
    let mut methods = Vec::new();
    for prefix in ENTITY_PREFIXES {
        for verb in Verb::STORAGE {
            methods.push(MethodInterface::new(
                format!("{}_{}", prefix, verb.as_str()),
                verb.params(),
            ));
        }
    }
    for (name, params) in BACKEND_METHODS {
        methods.push(MethodInterface::new(*name, params));
    }
    methods
}

/// The full public method list of the business layer
pub fn extended_interface() -> Vec<MethodInterface> {
    let mut methods = Vec::new();
    for prefix in ENTITY_PREFIXES {
        for verb in Verb::ALL {
            methods.push(MethodInterface::new(
                format!("{}_{}", prefix, verb.as_str()),
                verb.params(),
            ));
        }
    }
    for (name, params) in BACKEND_METHODS {
        methods.push(MethodInterface::new(*name, params));
    }
    for (name, params) in EXTENDED_METHODS {
        methods.push(MethodInterface::new(*name, params));
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::entity::{Host, ProductOnClient};

    #[test]
    fn test_method_names() {
        assert_eq!(method_name::<Host>(Verb::GetObjects), "host_getObjects");
        assert_eq!(
            method_name::<ProductOnClient>(Verb::CreateObjects),
            "productOnClient_createObjects"
        );
    }

    #[test]
    fn test_storage_interface_is_complete() {
        let interface = storage_interface();
        assert_eq!(interface.len(), ENTITY_PREFIXES.len() * 4 + BACKEND_METHODS.len());
        assert!(interface.iter().any(|m| m.name == "host_insertObject"));
        assert!(
            interface
                .iter()
                .any(|m| m.name == "backend_getInterface" && m.params.is_empty())
        );
    }

    #[test]
    fn test_prefixes_match_entity_types() {
        // Spot-check that the static prefix table agrees with the model
        assert!(ENTITY_PREFIXES.contains(&"auditHardwareOnHost"));
        assert_eq!(
            method_name::<muster_api::entity::AuditHardwareOnHost>(Verb::GetObjects),
            "auditHardwareOnHost_getObjects"
        );
    }
}
