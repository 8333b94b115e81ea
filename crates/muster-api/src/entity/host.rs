//! Host records: managed clients, depot servers, and the config server

use serde::{Deserialize, Serialize};

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// Host kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HostType {
    #[default]
    Client,
    Depotserver,
    Configserver,
}

impl HostType {
    pub fn as_str(self) -> &'static str {
        match self {
            HostType::Client => "Client",
            HostType::Depotserver => "Depotserver",
            HostType::Configserver => "Configserver",
        }
    }

    /// Depot servers and the config server both serve packages
    pub fn is_depot(self) -> bool {
        matches!(self, HostType::Depotserver | HostType::Configserver)
    }
}

impl std::fmt::Display for HostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Client" => Ok(HostType::Client),
            "Depotserver" => Ok(HostType::Depotserver),
            "Configserver" => Ok(HostType::Configserver),
            _ => Err(format!("unknown host type: {}", s)),
        }
    }
}

/// A managed machine record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Host {
    /// Fully-qualified, lowercase host id
    pub id: String,
    #[serde(rename = "type")]
    pub host_type: HostType,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub hardware_address: Option<String>,
    pub ip_address: Option<String>,
    pub inventory_number: Option<String>,
    /// Shared secret used for host authentication
    pub host_key: Option<String>,
    pub created: Option<String>,
    pub last_seen: Option<String>,
    /// Depot servers only: address packages are served from
    pub depot_address: Option<String>,
    pub network_address: Option<String>,
    pub is_master_depot: Option<bool>,
    pub master_depot_id: Option<String>,
}

impl Host {
    pub fn new_client(id: impl Into<String>) -> Self {
        Host {
            id: muster_common::forced_host_id(&id.into()),
            host_type: HostType::Client,
            ..Default::default()
        }
    }

    pub fn new_depotserver(id: impl Into<String>) -> Self {
        Host {
            id: muster_common::forced_host_id(&id.into()),
            host_type: HostType::Depotserver,
            ..Default::default()
        }
    }

    pub fn new_configserver(id: impl Into<String>) -> Self {
        Host {
            id: muster_common::forced_host_id(&id.into()),
            host_type: HostType::Configserver,
            is_master_depot: Some(true),
            ..Default::default()
        }
    }
}

impl Entity for Host {
    const OBJECT_TYPE: &'static str = "Host";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "type",
        "description",
        "notes",
        "hardwareAddress",
        "ipAddress",
        "inventoryNumber",
        "hostKey",
        "created",
        "lastSeen",
        "depotAddress",
        "networkAddress",
        "isMasterDepot",
        "masterDepotId",
    ];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn fill_defaults(&mut self) {
        if self.created.is_none() {
            self.created = Some(muster_common::timestamp());
        }
        if self.host_type.is_depot() && self.is_master_depot.is_none() {
            self.is_master_depot = Some(self.host_type == HostType::Configserver);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_host_id(&self.id)
            .map_err(|e| MusterError::bad_value(format!("host id '{}': {}", self.id, e.code)))?;
        if let Some(key) = &self.host_key {
            validation::validate_host_key(key)
                .map_err(|e| MusterError::bad_value(format!("host key: {}", e.code)))?;
        }
        Ok(())
    }
}
