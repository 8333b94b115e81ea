//! Business-logic services
//!
//! Free functions over the raw storage contract, called by the extended
//! backend. Grouped by entity family.

pub mod audit;
pub mod config;
pub mod host;
pub mod license;
pub mod product;

use serde_json::Value;

/// String forms of a value list attribute
pub(crate) fn string_values(values: &Option<Vec<Value>>) -> Vec<String> {
    values
        .as_ref()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
