//! Backend behavior options
//!
//! Every option defaults to off; callers toggle them per composed backend
//! via `backend_set_options`.

use serde::{Deserialize, Serialize};

/// Toggleable behaviors of the business layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendOptions {
    /// `configState_getObjects` synthesizes defaults for every
    /// (config x eligible client) pair without an explicit row
    pub add_config_state_defaults: bool,
    /// `productOnClient_getObjects` synthesizes not_installed/none rows for
    /// products available on the client's depot
    pub add_product_on_client_defaults: bool,
    /// `productPropertyState_getObjects` synthesizes client states
    /// inherited from the client's depot
    pub add_product_property_state_defaults: bool,
    /// Writes of a config state equal to the config's defaults are dropped
    /// (or delete an existing row)
    pub delete_config_state_if_default: bool,
    /// Create/update convenience operations re-read and return the
    /// affected rows
    pub return_objects_on_update_and_create: bool,
    /// ProductOnClient create/update first runs the dependency resolver
    pub add_dependent_product_on_clients: bool,
    /// `productOnClient_getObjects` runs the sequencer and stamps
    /// `actionSequence`
    pub process_product_on_client_sequence: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_options_default_off() {
        let options = BackendOptions::default();
        assert_eq!(options, serde_json::from_str("{}").unwrap());
        assert!(!options.add_config_state_defaults);
        assert!(!options.process_product_on_client_sequence);
    }

    #[test]
    fn test_options_round_trip_uses_camel_case() {
        let options = BackendOptions {
            add_config_state_defaults: true,
            ..Default::default()
        };
        let value = serde_json::to_value(options).unwrap();
        assert_eq!(value["addConfigStateDefaults"], true);
    }
}
