//! Config definitions and per-host config states

use serde::{Deserialize, Serialize};
use serde_json::Value;

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// Config kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigType {
    /// Free-form values, optionally restricted to `possible_values`
    #[default]
    Unicode,
    /// Boolean single-value config
    Bool,
}

impl ConfigType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigType::Unicode => "Unicode",
            ConfigType::Bool => "Bool",
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named setting with allowed and default values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub id: String,
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub description: Option<String>,
    pub possible_values: Option<Vec<Value>>,
    pub default_values: Option<Vec<Value>>,
    pub editable: Option<bool>,
    pub multi_value: Option<bool>,
}

impl Config {
    pub fn new(id: impl Into<String>) -> Self {
        Config {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn new_bool(id: impl Into<String>, default: bool) -> Self {
        Config {
            id: id.into(),
            config_type: ConfigType::Bool,
            possible_values: Some(vec![Value::Bool(true), Value::Bool(false)]),
            default_values: Some(vec![Value::Bool(default)]),
            editable: Some(false),
            multi_value: Some(false),
            ..Default::default()
        }
    }
}

impl Entity for Config {
    const OBJECT_TYPE: &'static str = "Config";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "type",
        "description",
        "possibleValues",
        "defaultValues",
        "editable",
        "multiValue",
    ];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn fill_defaults(&mut self) {
        match self.config_type {
            ConfigType::Bool => {
                self.possible_values = Some(vec![Value::Bool(true), Value::Bool(false)]);
                if self.default_values.is_none() {
                    self.default_values = Some(vec![Value::Bool(false)]);
                }
                self.editable = Some(false);
                self.multi_value = Some(false);
            }
            ConfigType::Unicode => {
                if self.possible_values.is_none() {
                    self.possible_values = Some(Vec::new());
                }
                if self.default_values.is_none() {
                    self.default_values = Some(Vec::new());
                }
                if self.editable.is_none() {
                    self.editable = Some(true);
                }
                if self.multi_value.is_none() {
                    self.multi_value = Some(false);
                }
            }
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id)
            .map_err(|e| MusterError::bad_value(format!("config id '{}': {}", self.id, e.code)))?;
        if self.multi_value == Some(false)
            && let Some(defaults) = &self.default_values
            && defaults.len() > 1
        {
            return Err(MusterError::bad_value(format!(
                "config '{}' is single-valued but has {} default values",
                self.id,
                defaults.len()
            )));
        }
        Ok(())
    }
}

/// The value of a config for one object (host)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigState {
    pub config_id: String,
    pub object_id: String,
    pub values: Option<Vec<Value>>,
    /// Set on rows synthesized from config defaults; such rows are never
    /// persisted
    pub is_generated: bool,
}

impl ConfigState {
    pub fn new(
        config_id: impl Into<String>,
        object_id: impl Into<String>,
        values: Vec<Value>,
    ) -> Self {
        ConfigState {
            config_id: config_id.into(),
            object_id: muster_common::forced_host_id(&object_id.into()),
            values: Some(values),
            is_generated: false,
        }
    }

    /// Synthesize the default state of a config for one object
    pub fn generated_default(config: &Config, object_id: &str) -> Self {
        ConfigState {
            config_id: config.id.clone(),
            object_id: object_id.to_string(),
            values: Some(config.default_values.clone().unwrap_or_default()),
            is_generated: true,
        }
    }
}

impl Entity for ConfigState {
    const OBJECT_TYPE: &'static str = "ConfigState";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["configId", "objectId"];
    const ATTRIBUTES: &'static [&'static str] =
        &["configId", "objectId", "values", "isGenerated"];

    fn ident(&self) -> Ident {
        Ident::new([self.config_id.clone(), self.object_id.clone()])
    }

    fn fill_defaults(&mut self) {
        if self.values.is_none() {
            self.values = Some(Vec::new());
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.config_id).map_err(|e| {
            MusterError::bad_value(format!("config id '{}': {}", self.config_id, e.code))
        })?;
        validation::validate_host_id(&self.object_id).map_err(|e| {
            MusterError::bad_value(format!("object id '{}': {}", self.object_id, e.code))
        })?;
        Ok(())
    }

    fn is_generated(&self) -> bool {
        self.is_generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_config_defaults() {
        let mut config = Config {
            id: "license.use".to_string(),
            config_type: ConfigType::Bool,
            ..Default::default()
        };
        config.fill_defaults();
        assert_eq!(
            config.possible_values,
            Some(vec![Value::Bool(true), Value::Bool(false)])
        );
        assert_eq!(config.default_values, Some(vec![Value::Bool(false)]));
        assert_eq!(config.multi_value, Some(false));
    }

    #[test]
    fn test_single_value_config_rejects_multiple_defaults() {
        let mut config = Config::new("clientconfig.depot.id");
        config.fill_defaults();
        config.default_values = Some(vec![
            Value::String("depot1.example.org".to_string()),
            Value::String("depot2.example.org".to_string()),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generated_default_state() {
        let mut config = Config::new("clientconfig.depot.id");
        config.default_values = Some(vec![Value::String("depot.example.org".to_string())]);

        let state = ConfigState::generated_default(&config, "client1.example.org");
        assert!(state.is_generated);
        assert_eq!(
            state.values,
            Some(vec![Value::String("depot.example.org".to_string())])
        );
        assert_eq!(state.ident().to_string(), "clientconfig.depot.id;client1.example.org");
    }
}
