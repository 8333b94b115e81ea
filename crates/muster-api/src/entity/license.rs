//! License management records
//!
//! A `LicenseContract` owns software licenses; licenses are offered to
//! clients through `LicensePool`s via the `SoftwareLicenseToLicensePool`
//! junction, and an actual grant to one client is a `LicenseOnClient`.

use serde::{Deserialize, Serialize};

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// A purchase contract licenses belong to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseContract {
    pub id: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub partner: Option<String>,
    pub conclusion_date: Option<String>,
    pub notification_date: Option<String>,
    pub expiration_date: Option<String>,
}

impl LicenseContract {
    pub fn new(id: impl Into<String>) -> Self {
        LicenseContract {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for LicenseContract {
    const OBJECT_TYPE: &'static str = "LicenseContract";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "description",
        "notes",
        "partner",
        "conclusionDate",
        "notificationDate",
        "expirationDate",
    ];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id).map_err(|e| {
            MusterError::bad_value(format!("license contract id '{}': {}", self.id, e.code))
        })
    }
}

/// License kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LicenseType {
    #[default]
    Retail,
    Oem,
    Volume,
    Concurrent,
}

impl LicenseType {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseType::Retail => "Retail",
            LicenseType::Oem => "OEM",
            LicenseType::Volume => "Volume",
            LicenseType::Concurrent => "Concurrent",
        }
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single software license under a contract
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftwareLicense {
    pub id: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub license_contract_id: String,
    /// 0 means unlimited
    pub max_installations: Option<u32>,
    /// OEM licenses are tied to exactly one host
    pub bound_to_host: Option<String>,
    pub expiration_date: Option<String>,
}

impl SoftwareLicense {
    pub fn new(
        id: impl Into<String>,
        license_type: LicenseType,
        license_contract_id: impl Into<String>,
    ) -> Self {
        SoftwareLicense {
            id: id.into(),
            license_type,
            license_contract_id: license_contract_id.into(),
            ..Default::default()
        }
    }

    /// Installation cap for allocation, `None` meaning unlimited
    pub fn installation_cap(&self) -> Option<u32> {
        match self.license_type {
            LicenseType::Volume => match self.max_installations {
                Some(0) => None,
                other => other.or(Some(1)),
            },
            LicenseType::Concurrent => None,
            LicenseType::Retail | LicenseType::Oem => Some(self.max_installations.unwrap_or(1)),
        }
    }
}

impl Entity for SoftwareLicense {
    const OBJECT_TYPE: &'static str = "SoftwareLicense";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "type",
        "licenseContractId",
        "maxInstallations",
        "boundToHost",
        "expirationDate",
    ];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn fill_defaults(&mut self) {
        if self.max_installations.is_none() {
            self.max_installations = Some(match self.license_type {
                LicenseType::Volume | LicenseType::Concurrent => 0,
                LicenseType::Retail | LicenseType::Oem => 1,
            });
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id).map_err(|e| {
            MusterError::bad_value(format!("software license id '{}': {}", self.id, e.code))
        })?;
        if self.license_contract_id.is_empty() {
            return Err(MusterError::bad_value(format!(
                "software license '{}' has no license contract",
                self.id
            )));
        }
        if self.license_type == LicenseType::Oem && self.bound_to_host.is_none() {
            return Err(MusterError::bad_value(format!(
                "OEM license '{}' must be bound to a host",
                self.id
            )));
        }
        Ok(())
    }
}

/// A group of interchangeable licenses assignable to products
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicensePool {
    pub id: String,
    pub description: Option<String>,
    pub product_ids: Option<Vec<String>>,
}

impl LicensePool {
    pub fn new(id: impl Into<String>) -> Self {
        LicensePool {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for LicensePool {
    const OBJECT_TYPE: &'static str = "LicensePool";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] = &["id", "description", "productIds"];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id).map_err(|e| {
            MusterError::bad_value(format!("license pool id '{}': {}", self.id, e.code))
        })
    }
}

/// Membership of a license in a pool, optionally carrying the license key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftwareLicenseToLicensePool {
    pub software_license_id: String,
    pub license_pool_id: String,
    pub license_key: Option<String>,
}

impl SoftwareLicenseToLicensePool {
    pub fn new(
        software_license_id: impl Into<String>,
        license_pool_id: impl Into<String>,
    ) -> Self {
        SoftwareLicenseToLicensePool {
            software_license_id: software_license_id.into(),
            license_pool_id: license_pool_id.into(),
            license_key: None,
        }
    }
}

impl Entity for SoftwareLicenseToLicensePool {
    const OBJECT_TYPE: &'static str = "SoftwareLicenseToLicensePool";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["softwareLicenseId", "licensePoolId"];
    const ATTRIBUTES: &'static [&'static str] =
        &["softwareLicenseId", "licensePoolId", "licenseKey"];

    fn ident(&self) -> Ident {
        Ident::new([
            self.software_license_id.clone(),
            self.license_pool_id.clone(),
        ])
    }

    fn validate(&self) -> Result<(), MusterError> {
        if self.software_license_id.is_empty() || self.license_pool_id.is_empty() {
            return Err(MusterError::bad_value(
                "license-to-pool assignment requires a license id and a pool id",
            ));
        }
        Ok(())
    }
}

/// The grant of one license to one client out of one pool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseOnClient {
    pub software_license_id: String,
    pub license_pool_id: String,
    pub client_id: String,
    pub license_key: Option<String>,
    pub notes: Option<String>,
}

impl LicenseOnClient {
    pub fn new(
        software_license_id: impl Into<String>,
        license_pool_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        LicenseOnClient {
            software_license_id: software_license_id.into(),
            license_pool_id: license_pool_id.into(),
            client_id: muster_common::forced_host_id(&client_id.into()),
            license_key: None,
            notes: None,
        }
    }
}

impl Entity for LicenseOnClient {
    const OBJECT_TYPE: &'static str = "LicenseOnClient";
    const IDENT_ATTRIBUTES: &'static [&'static str] =
        &["softwareLicenseId", "licensePoolId", "clientId"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "softwareLicenseId",
        "licensePoolId",
        "clientId",
        "licenseKey",
        "notes",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.software_license_id.clone(),
            self.license_pool_id.clone(),
            self.client_id.clone(),
        ])
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_host_id(&self.client_id).map_err(|e| {
            MusterError::bad_value(format!("client id '{}': {}", self.client_id, e.code))
        })
    }
}
