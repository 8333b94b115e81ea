//! Partial-match filter language for `*_get_objects` operations
//!
//! A filter maps attribute names to match expressions. A value matches
//! exactly, against a list of alternatives, against a `*` wildcard pattern,
//! or against a version comparison (`>=1.2`). Multi-valued attributes match
//! when any element matches.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use muster_common::MusterError;

use crate::entity::{Entity, is_known_attribute, object_to_map};

/// A single match expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Matches rows whose attribute is unset
    Null,
    Bool(bool),
    Int(i64),
    /// Exact value, `*` wildcard pattern, or comparison expression
    String(String),
    /// Alternatives, any of which may match
    List(Vec<FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value as i64)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl FilterValue {
    /// Match one attribute value, honoring multi-valued attributes
    pub fn matches(&self, actual: &Value) -> bool {
        if let Value::Array(elements) = actual {
            return elements.iter().any(|e| self.matches_scalar(e))
                || (elements.is_empty() && matches!(self, FilterValue::Null));
        }
        self.matches_scalar(actual)
    }

    fn matches_scalar(&self, actual: &Value) -> bool {
        match self {
            FilterValue::Null => actual.is_null(),
            FilterValue::Bool(expected) => actual.as_bool() == Some(*expected),
            FilterValue::Int(expected) => match actual {
                Value::Number(n) => n.as_i64() == Some(*expected),
                Value::String(s) => s.parse::<i64>().ok() == Some(*expected),
                _ => false,
            },
            FilterValue::String(expression) => match_string_expression(expression, actual),
            FilterValue::List(alternatives) => {
                alternatives.iter().any(|a| a.matches_scalar(actual))
            }
        }
    }
}

fn match_string_expression(expression: &str, actual: &Value) -> bool {
    let actual_str = match actual {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return false,
        _ => return false,
    };

    for (op, rest) in [
        (">=", expression.strip_prefix(">=")),
        ("<=", expression.strip_prefix("<=")),
        (">", expression.strip_prefix(">")),
        ("<", expression.strip_prefix("<")),
    ] {
        if let Some(wanted) = rest {
            let ordering = compare_versions(&actual_str, wanted.trim());
            return match op {
                ">=" => ordering != Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                "<" => ordering == Ordering::Less,
                _ => unreachable!(),
            };
        }
    }

    if expression.contains('*') {
        return match_wildcard(expression, &actual_str);
    }

    expression == actual_str
}

fn match_wildcard(pattern: &str, actual: &str) -> bool {
    let mut escaped = String::with_capacity(pattern.len() + 8);
    escaped.push('^');
    for c in pattern.chars() {
        if c == '*' {
            escaped.push_str(".*");
        } else {
            escaped.push_str(&regex::escape(&c.to_string()));
        }
    }
    escaped.push('$');
    regex::Regex::new(&escaped)
        .map(|re| re.is_match(actual))
        .unwrap_or(false)
}

/// Compare two version-like strings component-wise
///
/// Components are separated by `.` or `-`; numeric components compare
/// numerically, everything else lexicographically. A missing component
/// compares as empty (so `1.2 < 1.2.1`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a: Vec<&str> = a.split(['.', '-']).collect();
    let parts_b: Vec<&str> = b.split(['.', '-']).collect();
    let len = parts_a.len().max(parts_b.len());

    for i in 0..len {
        let pa = parts_a.get(i).copied().unwrap_or("");
        let pb = parts_b.get(i).copied().unwrap_or("");
        let ordering = match (pa.parse::<u64>(), pb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => pa.cmp(pb),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// An attribute → expression map, all entries must match (AND)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, FilterValue>);

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    /// Builder-style entry addition
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.0.insert(attribute.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    /// Match an entity against this filter
    ///
    /// Referencing an attribute the entity type does not declare is a
    /// bad-value error, not a non-match.
    pub fn matches<E: Entity>(&self, obj: &E) -> Result<bool, MusterError> {
        if self.0.is_empty() {
            return Ok(true);
        }

        let map = object_to_map(obj);
        for (attribute, expression) in &self.0 {
            if !is_known_attribute::<E>(attribute) {
                return Err(MusterError::bad_value(format!(
                    "unknown attribute '{}' for {}",
                    attribute,
                    E::OBJECT_TYPE
                )));
            }
            let actual = map.get(attribute).unwrap_or(&Value::Null);
            if !expression.matches(actual) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Host, Product};

    #[test]
    fn test_exact_and_list_match() {
        let host = Host::new_client("client1.example.org");

        let exact = Filter::new().with("id", "client1.example.org");
        assert!(exact.matches(&host).unwrap());

        let list = Filter::new().with(
            "id",
            vec!["other.example.org", "client1.example.org"],
        );
        assert!(list.matches(&host).unwrap());

        let miss = Filter::new().with("id", "other.example.org");
        assert!(!miss.matches(&host).unwrap());
    }

    #[test]
    fn test_wildcard_match() {
        let host = Host::new_client("client1.example.org");
        let filter = Filter::new().with("id", "client*.example.org");
        assert!(filter.matches(&host).unwrap());

        let miss = Filter::new().with("id", "depot*");
        assert!(!miss.matches(&host).unwrap());
    }

    #[test]
    fn test_null_matches_unset() {
        let host = Host::new_client("client1.example.org");
        let filter = Filter::new().with("description", FilterValue::Null);
        assert!(filter.matches(&host).unwrap());

        let mut described = host.clone();
        described.description = Some("x".to_string());
        assert!(!filter.matches(&described).unwrap());
    }

    #[test]
    fn test_unknown_attribute_is_bad_value() {
        let host = Host::new_client("client1.example.org");
        let filter = Filter::new().with("nosuchattribute", "x");
        assert!(filter.matches(&host).is_err());
    }

    #[test]
    fn test_version_comparison() {
        assert_eq!(compare_versions("1.2", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
        assert_eq!(compare_versions("2.0-3", "2.0-10"), Ordering::Less);

        let product = Product::new("firefox", "140.2", "2");
        let filter = Filter::new().with("productVersion", ">=140.0");
        assert!(filter.matches(&product).unwrap());
        let filter = Filter::new().with("productVersion", "<140.0");
        assert!(!filter.matches(&product).unwrap());
    }

    #[test]
    fn test_int_filter_on_priority() {
        let mut product = Product::new("firefox", "140.2", "2");
        product.priority = Some(80);
        let filter = Filter::new().with("priority", 80);
        assert!(filter.matches(&product).unwrap());
    }
}
