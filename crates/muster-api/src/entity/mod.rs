//! Typed entity records
//!
//! Every entity is identified by a composite natural key (its "ident") and
//! carries its non-key attributes as `Option` fields so that projected or
//! filtered rows can be represented without sentinel values. Polymorphic
//! families (hosts, products, licenses, groups) are modeled as structs with
//! an explicit discriminant enum serialized as the `type` attribute.

mod audit;
mod config;
mod group;
mod host;
mod license;
mod product;

use std::fmt::{Display, Formatter};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use muster_common::MusterError;

pub use audit::{AuditHardwareOnHost, AuditSoftware, AuditSoftwareOnClient};
pub use config::{Config, ConfigState, ConfigType};
pub use group::{Group, GroupType, ObjectToGroup};
pub use host::{Host, HostType};
pub use license::{
    LicenseContract, LicenseOnClient, LicensePool, LicenseType, SoftwareLicense,
    SoftwareLicenseToLicensePool,
};
pub use product::{
    ActionRequest, ActionResult, InstallationStatus, Product, ProductDependency, ProductOnClient,
    ProductOnDepot, ProductProperty, ProductPropertyState, ProductPropertyType, ProductType,
    RequirementType, TargetConfiguration,
};

/// Composite natural key of an entity instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(pub Vec<String>);

impl Ident {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ident(parts.into_iter().map(Into::into).collect())
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(";"))
    }
}

/// Common behavior of every entity record
pub trait Entity:
    Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Entity type name, also the value of the `type` attribute for
    /// non-polymorphic entities
    const OBJECT_TYPE: &'static str;

    /// Attribute names (serialized form) making up the ident, in order
    const IDENT_ATTRIBUTES: &'static [&'static str];

    /// All declared attribute names (serialized form)
    const ATTRIBUTES: &'static [&'static str];

    /// The composite natural key of this instance
    fn ident(&self) -> Ident;

    /// Fill unset attributes with their defaults
    fn fill_defaults(&mut self) {}

    /// Check required fields and value ranges
    fn validate(&self) -> Result<(), MusterError> {
        Ok(())
    }

    /// Whether this row was synthesized by the business layer rather than
    /// read from storage. Synthesized rows are never persisted.
    fn is_generated(&self) -> bool {
        false
    }
}

/// Serialize an entity to its attribute map
pub fn object_to_map<E: Entity>(obj: &E) -> serde_json::Map<String, Value> {
    match serde_json::to_value(obj) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Apply an attribute projection to an entity
///
/// An empty attribute list selects everything. Otherwise all non-selected
/// attributes are cleared, with the ident attributes and the `type`
/// discriminant always retained.
pub fn project_attributes<E: Entity>(obj: &E, attributes: &[String]) -> E {
    if attributes.is_empty() {
        return obj.clone();
    }

    let mut map = object_to_map(obj);
    // Dropped keys are refilled with defaults on deserialization
    map.retain(|key, _| {
        attributes.iter().any(|a| a == key)
            || E::IDENT_ATTRIBUTES.contains(&key.as_str())
            || key == "type"
    });

    serde_json::from_value(Value::Object(map)).unwrap_or_else(|_| obj.clone())
}

/// True when `attribute` is declared for the entity type
pub fn is_known_attribute<E: Entity>(attribute: &str) -> bool {
    E::ATTRIBUTES.contains(&attribute)
}

/// Merge a partial update into an existing row
///
/// Attributes the patch leaves unset keep their prior value; the ident
/// never changes.
pub fn merge_objects<E: Entity>(existing: &E, patch: &E) -> E {
    let mut merged = object_to_map(existing);
    for (key, value) in object_to_map(patch) {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or_else(|_| patch.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_display() {
        let ident = Ident::new(["product1", "client1.example.org"]);
        assert_eq!(ident.to_string(), "product1;client1.example.org");
    }

    #[test]
    fn test_projection_keeps_ident_and_type() {
        let mut host = Host::new_client("client1.example.org");
        host.description = Some("workstation".to_string());
        host.ip_address = Some("192.168.1.10".to_string());

        let projected = project_attributes(&host, &["description".to_string()]);
        assert_eq!(projected.id, "client1.example.org");
        assert_eq!(projected.host_type, HostType::Client);
        assert_eq!(projected.description.as_deref(), Some("workstation"));
        assert_eq!(projected.ip_address, None);
    }

    #[test]
    fn test_projection_empty_selects_all() {
        let mut host = Host::new_client("client1.example.org");
        host.ip_address = Some("192.168.1.10".to_string());

        let projected = project_attributes(&host, &[]);
        assert_eq!(projected, host);
    }
}
