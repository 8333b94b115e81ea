//! Inventory audit facts reported by clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// A software product observed somewhere in the fleet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditSoftware {
    pub name: String,
    pub version: String,
    pub sub_version: String,
    pub language: String,
    pub architecture: String,
    /// Registry identifier used to map onto license pools
    pub windows_software_id: Option<String>,
    pub windows_display_name: Option<String>,
    pub windows_display_version: Option<String>,
    pub install_size: Option<i64>,
}

impl AuditSoftware {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        sub_version: impl Into<String>,
        language: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        AuditSoftware {
            name: name.into(),
            version: version.into(),
            sub_version: sub_version.into(),
            language: language.into(),
            architecture: architecture.into(),
            ..Default::default()
        }
    }
}

impl Entity for AuditSoftware {
    const OBJECT_TYPE: &'static str = "AuditSoftware";
    const IDENT_ATTRIBUTES: &'static [&'static str] =
        &["name", "version", "subVersion", "language", "architecture"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "version",
        "subVersion",
        "language",
        "architecture",
        "windowsSoftwareId",
        "windowsDisplayName",
        "windowsDisplayVersion",
        "installSize",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.name.clone(),
            self.version.clone(),
            self.sub_version.clone(),
            self.language.clone(),
            self.architecture.clone(),
        ])
    }

    fn validate(&self) -> Result<(), MusterError> {
        if self.name.is_empty() {
            return Err(MusterError::bad_value("audit software requires a name"));
        }
        Ok(())
    }
}

/// Presence of an audited software on one client
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditSoftwareOnClient {
    pub name: String,
    pub version: String,
    pub sub_version: String,
    pub language: String,
    pub architecture: String,
    pub client_id: String,
    pub uninstall_string: Option<String>,
    pub usage_frequency: Option<i64>,
    pub last_used: Option<String>,
    pub state: Option<i32>,
    pub license_key: Option<String>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

impl AuditSoftwareOnClient {
    pub fn new(software: &AuditSoftware, client_id: impl Into<String>) -> Self {
        AuditSoftwareOnClient {
            name: software.name.clone(),
            version: software.version.clone(),
            sub_version: software.sub_version.clone(),
            language: software.language.clone(),
            architecture: software.architecture.clone(),
            client_id: muster_common::forced_host_id(&client_id.into()),
            ..Default::default()
        }
    }
}

impl Entity for AuditSoftwareOnClient {
    const OBJECT_TYPE: &'static str = "AuditSoftwareOnClient";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "version",
        "subVersion",
        "language",
        "architecture",
        "clientId",
    ];
    const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "version",
        "subVersion",
        "language",
        "architecture",
        "clientId",
        "uninstallString",
        "usageFrequency",
        "lastUsed",
        "state",
        "licenseKey",
        "firstSeen",
        "lastSeen",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.name.clone(),
            self.version.clone(),
            self.sub_version.clone(),
            self.language.clone(),
            self.architecture.clone(),
            self.client_id.clone(),
        ])
    }

    fn fill_defaults(&mut self) {
        let now = muster_common::timestamp();
        if self.first_seen.is_none() {
            self.first_seen = Some(now.clone());
        }
        if self.last_seen.is_none() {
            self.last_seen = Some(now);
        }
        if self.state.is_none() {
            self.state = Some(1);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        if self.name.is_empty() {
            return Err(MusterError::bad_value("audit software requires a name"));
        }
        validation::validate_host_id(&self.client_id).map_err(|e| {
            MusterError::bad_value(format!("client id '{}': {}", self.client_id, e.code))
        })
    }
}

/// A hardware fact reported for one host
///
/// Rows are merge-oriented: re-reporting an identical device refreshes
/// `last_seen`, devices no longer reported are flipped to state 0
/// (obsolete) rather than deleted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditHardwareOnHost {
    pub host_id: String,
    pub hardware_class: String,
    /// Device attributes as reported (vendor, model, serial, ...)
    pub info: Option<serde_json::Map<String, Value>>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    /// 1 = present, 0 = obsolete
    pub state: Option<i32>,
}

impl AuditHardwareOnHost {
    pub fn new(host_id: impl Into<String>, hardware_class: impl Into<String>) -> Self {
        AuditHardwareOnHost {
            host_id: muster_common::forced_host_id(&host_id.into()),
            hardware_class: hardware_class.into(),
            ..Default::default()
        }
    }

    /// Canonical serialization of the device attributes, part of the ident
    pub fn info_digest(&self) -> String {
        self.info
            .as_ref()
            .map(|info| serde_json::to_string(info).unwrap_or_default())
            .unwrap_or_default()
    }
}

impl Entity for AuditHardwareOnHost {
    const OBJECT_TYPE: &'static str = "AuditHardwareOnHost";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["hostId", "hardwareClass", "info"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "hostId",
        "hardwareClass",
        "info",
        "firstSeen",
        "lastSeen",
        "state",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.host_id.clone(),
            self.hardware_class.clone(),
            self.info_digest(),
        ])
    }

    fn fill_defaults(&mut self) {
        let now = muster_common::timestamp();
        if self.first_seen.is_none() {
            self.first_seen = Some(now.clone());
        }
        if self.last_seen.is_none() {
            self.last_seen = Some(now);
        }
        if self.state.is_none() {
            self.state = Some(1);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_host_id(&self.host_id).map_err(|e| {
            MusterError::bad_value(format!("host id '{}': {}", self.host_id, e.code))
        })?;
        if self.hardware_class.is_empty() {
            return Err(MusterError::bad_value("hardware class must not be empty"));
        }
        Ok(())
    }
}
