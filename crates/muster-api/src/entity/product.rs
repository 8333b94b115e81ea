//! Product records: versioned products, properties, dependencies, and the
//! per-depot / per-client assignment rows

use serde::{Deserialize, Serialize};
use serde_json::Value;

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// Product kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductType {
    #[default]
    LocalbootProduct,
    NetbootProduct,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::LocalbootProduct => "LocalbootProduct",
            ProductType::NetbootProduct => "NetbootProduct",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Installation status of a product on a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    #[default]
    NotInstalled,
    Installed,
}

impl InstallationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallationStatus::NotInstalled => "not_installed",
            InstallationStatus::Installed => "installed",
        }
    }
}

impl std::fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pending state-change operation for a product on a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequest {
    #[default]
    None,
    Setup,
    Uninstall,
    Update,
    Once,
    Always,
    Custom,
}

impl ActionRequest {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionRequest::None => "none",
            ActionRequest::Setup => "setup",
            ActionRequest::Uninstall => "uninstall",
            ActionRequest::Update => "update",
            ActionRequest::Once => "once",
            ActionRequest::Always => "always",
            ActionRequest::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ActionRequest::None),
            "setup" => Ok(ActionRequest::Setup),
            "uninstall" => Ok(ActionRequest::Uninstall),
            "update" => Ok(ActionRequest::Update),
            "once" => Ok(ActionRequest::Once),
            "always" => Ok(ActionRequest::Always),
            "custom" => Ok(ActionRequest::Custom),
            _ => Err(format!("unknown action request: {}", s)),
        }
    }
}

/// Terminal marker of the last executed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    #[default]
    None,
    Waiting,
    Failed,
    Successful,
}

/// Configuration a client should converge to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetConfiguration {
    #[default]
    Undefined,
    Installed,
    Always,
    Forbidden,
}

/// Ordering hint of a product dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Before,
    After,
}

/// A versioned, installable software product
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: String,
    pub product_version: String,
    pub package_version: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub advice: Option<String>,
    pub license_required: Option<bool>,
    /// Ordering weight, -100 (late) to 100 (early)
    pub priority: Option<i32>,
    pub setup_script: Option<String>,
    pub uninstall_script: Option<String>,
    pub update_script: Option<String>,
    pub always_script: Option<String>,
    pub once_script: Option<String>,
    pub custom_script: Option<String>,
    /// Netboot products only
    pub pxe_config_template: Option<String>,
    /// Software identifiers used to map audit data onto license pools
    pub windows_software_ids: Option<Vec<String>>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        product_version: impl Into<String>,
        package_version: impl Into<String>,
    ) -> Self {
        Product {
            id: id.into(),
            product_version: product_version.into(),
            package_version: package_version.into(),
            ..Default::default()
        }
    }

    /// `productVersion-packageVersion` display form
    pub fn version(&self) -> String {
        format!("{}-{}", self.product_version, self.package_version)
    }
}

impl Entity for Product {
    const OBJECT_TYPE: &'static str = "Product";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id", "productVersion", "packageVersion"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "id",
        "productVersion",
        "packageVersion",
        "type",
        "name",
        "description",
        "advice",
        "licenseRequired",
        "priority",
        "setupScript",
        "uninstallScript",
        "updateScript",
        "alwaysScript",
        "onceScript",
        "customScript",
        "pxeConfigTemplate",
        "windowsSoftwareIds",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.id.clone(),
            self.product_version.clone(),
            self.package_version.clone(),
        ])
    }

    fn fill_defaults(&mut self) {
        if self.priority.is_none() {
            self.priority = Some(0);
        }
        if self.license_required.is_none() {
            self.license_required = Some(false);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id)
            .map_err(|e| MusterError::bad_value(format!("product id '{}': {}", self.id, e.code)))?;
        validation::validate_version(&self.product_version).map_err(|e| {
            MusterError::bad_value(format!(
                "product version '{}': {}",
                self.product_version, e.code
            ))
        })?;
        validation::validate_version(&self.package_version).map_err(|e| {
            MusterError::bad_value(format!(
                "package version '{}': {}",
                self.package_version, e.code
            ))
        })?;
        if let Some(priority) = self.priority {
            validation::validate_priority(priority)
                .map_err(|e| MusterError::bad_value(format!("priority {}: {}", priority, e.code)))?;
        }
        Ok(())
    }
}

/// Product property kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductPropertyType {
    #[default]
    Unicode,
    Bool,
}

/// A configurable property of one specific product version
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductProperty {
    pub product_id: String,
    pub product_version: String,
    pub package_version: String,
    pub property_id: String,
    #[serde(rename = "type")]
    pub property_type: ProductPropertyType,
    pub description: Option<String>,
    pub possible_values: Option<Vec<Value>>,
    pub default_values: Option<Vec<Value>>,
    pub editable: Option<bool>,
    pub multi_value: Option<bool>,
}

impl ProductProperty {
    pub fn new(
        product_id: impl Into<String>,
        product_version: impl Into<String>,
        package_version: impl Into<String>,
        property_id: impl Into<String>,
    ) -> Self {
        ProductProperty {
            product_id: product_id.into(),
            product_version: product_version.into(),
            package_version: package_version.into(),
            property_id: property_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for ProductProperty {
    const OBJECT_TYPE: &'static str = "ProductProperty";
    const IDENT_ATTRIBUTES: &'static [&'static str] =
        &["productId", "productVersion", "packageVersion", "propertyId"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "productId",
        "productVersion",
        "packageVersion",
        "propertyId",
        "type",
        "description",
        "possibleValues",
        "defaultValues",
        "editable",
        "multiValue",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.product_id.clone(),
            self.product_version.clone(),
            self.package_version.clone(),
            self.property_id.clone(),
        ])
    }

    fn fill_defaults(&mut self) {
        match self.property_type {
            ProductPropertyType::Bool => {
                self.possible_values = Some(vec![Value::Bool(true), Value::Bool(false)]);
                if self.default_values.is_none() {
                    self.default_values = Some(vec![Value::Bool(false)]);
                }
                self.editable = Some(false);
                self.multi_value = Some(false);
            }
            ProductPropertyType::Unicode => {
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
        validation::validate_object_id(&self.product_id).map_err(|e| {
            MusterError::bad_value(format!("product id '{}': {}", self.product_id, e.code))
        })?;
        validation::validate_object_id(&self.property_id).map_err(|e| {
            MusterError::bad_value(format!("property id '{}': {}", self.property_id, e.code))
        })?;
        Ok(())
    }
}

/// An action on one product requiring an action or status on another
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDependency {
    pub product_id: String,
    pub product_version: String,
    pub package_version: String,
    pub product_action: ActionRequest,
    pub required_product_id: String,
    pub required_product_version: Option<String>,
    pub required_package_version: Option<String>,
    pub required_action: Option<ActionRequest>,
    pub required_installation_status: Option<InstallationStatus>,
    pub requirement_type: Option<RequirementType>,
}

impl Entity for ProductDependency {
    const OBJECT_TYPE: &'static str = "ProductDependency";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &[
        "productId",
        "productVersion",
        "packageVersion",
        "productAction",
        "requiredProductId",
    ];
    const ATTRIBUTES: &'static [&'static str] = &[
        "productId",
        "productVersion",
        "packageVersion",
        "productAction",
        "requiredProductId",
        "requiredProductVersion",
        "requiredPackageVersion",
        "requiredAction",
        "requiredInstallationStatus",
        "requirementType",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.product_id.clone(),
            self.product_version.clone(),
            self.package_version.clone(),
            self.product_action.to_string(),
            self.required_product_id.clone(),
        ])
    }

    fn validate(&self) -> Result<(), MusterError> {
        if self.product_action == ActionRequest::None {
            return Err(MusterError::bad_value(format!(
                "dependency of product '{}' declared for action 'none'",
                self.product_id
            )));
        }
        if self.required_action.is_none() && self.required_installation_status.is_none() {
            return Err(MusterError::bad_value(format!(
                "dependency of product '{}' on '{}' requires neither an action nor a status",
                self.product_id, self.required_product_id
            )));
        }
        Ok(())
    }
}

/// Assignment of one product version to a depot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductOnDepot {
    pub product_id: String,
    pub product_version: String,
    pub package_version: String,
    pub depot_id: String,
    pub product_type: ProductType,
    pub locked: Option<bool>,
}

impl ProductOnDepot {
    pub fn new(
        product_id: impl Into<String>,
        product_version: impl Into<String>,
        package_version: impl Into<String>,
        depot_id: impl Into<String>,
    ) -> Self {
        ProductOnDepot {
            product_id: product_id.into(),
            product_version: product_version.into(),
            package_version: package_version.into(),
            depot_id: muster_common::forced_host_id(&depot_id.into()),
            ..Default::default()
        }
    }

    pub fn version(&self) -> String {
        format!("{}-{}", self.product_version, self.package_version)
    }
}

impl Entity for ProductOnDepot {
    const OBJECT_TYPE: &'static str = "ProductOnDepot";
    const IDENT_ATTRIBUTES: &'static [&'static str] =
        &["productId", "productVersion", "packageVersion", "depotId"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "productId",
        "productVersion",
        "packageVersion",
        "depotId",
        "productType",
        "locked",
    ];

    fn ident(&self) -> Ident {
        Ident::new([
            self.product_id.clone(),
            self.product_version.clone(),
            self.package_version.clone(),
            self.depot_id.clone(),
        ])
    }

    fn fill_defaults(&mut self) {
        if self.locked.is_none() {
            self.locked = Some(false);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.product_id).map_err(|e| {
            MusterError::bad_value(format!("product id '{}': {}", self.product_id, e.code))
        })?;
        validation::validate_host_id(&self.depot_id).map_err(|e| {
            MusterError::bad_value(format!("depot id '{}': {}", self.depot_id, e.code))
        })?;
        Ok(())
    }
}

/// The actionable installation state of a product on one client
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductOnClient {
    pub product_id: String,
    pub client_id: String,
    pub product_type: ProductType,
    pub installation_status: Option<InstallationStatus>,
    pub action_request: Option<ActionRequest>,
    pub target_configuration: Option<TargetConfiguration>,
    pub last_action: Option<ActionRequest>,
    pub action_progress: Option<String>,
    pub action_result: Option<ActionResult>,
    pub product_version: Option<String>,
    pub package_version: Option<String>,
    pub modification_time: Option<String>,
    /// 1-based position assigned by the sequencer, -1 when unsequenced
    pub action_sequence: Option<i32>,
    /// Set on rows synthesized from depot defaults; never persisted
    pub is_generated: bool,
}

impl ProductOnClient {
    pub fn new(product_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        ProductOnClient {
            product_id: product_id.into(),
            client_id: muster_common::forced_host_id(&client_id.into()),
            ..Default::default()
        }
    }

    pub fn with_action(
        product_id: impl Into<String>,
        client_id: impl Into<String>,
        action_request: ActionRequest,
    ) -> Self {
        ProductOnClient {
            action_request: Some(action_request),
            ..ProductOnClient::new(product_id, client_id)
        }
    }

    pub fn action_request_or_none(&self) -> ActionRequest {
        self.action_request.unwrap_or(ActionRequest::None)
    }

    pub fn installation_status_or_default(&self) -> InstallationStatus {
        self.installation_status
            .unwrap_or(InstallationStatus::NotInstalled)
    }
}

impl Entity for ProductOnClient {
    const OBJECT_TYPE: &'static str = "ProductOnClient";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["productId", "clientId"];
    const ATTRIBUTES: &'static [&'static str] = &[
        "productId",
        "clientId",
        "productType",
        "installationStatus",
        "actionRequest",
        "targetConfiguration",
        "lastAction",
        "actionProgress",
        "actionResult",
        "productVersion",
        "packageVersion",
        "modificationTime",
        "actionSequence",
        "isGenerated",
    ];

    fn ident(&self) -> Ident {
        Ident::new([self.product_id.clone(), self.client_id.clone()])
    }

    fn fill_defaults(&mut self) {
        if self.installation_status.is_none() {
            self.installation_status = Some(InstallationStatus::NotInstalled);
        }
        if self.action_request.is_none() {
            self.action_request = Some(ActionRequest::None);
        }
        if self.action_result.is_none() {
            self.action_result = Some(ActionResult::None);
        }
        if self.action_sequence.is_none() {
            self.action_sequence = Some(-1);
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.product_id).map_err(|e| {
            MusterError::bad_value(format!("product id '{}': {}", self.product_id, e.code))
        })?;
        validation::validate_host_id(&self.client_id).map_err(|e| {
            MusterError::bad_value(format!("client id '{}': {}", self.client_id, e.code))
        })?;
        Ok(())
    }

    fn is_generated(&self) -> bool {
        self.is_generated
    }
}

/// The value of a product property for one object (client or depot)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPropertyState {
    pub product_id: String,
    pub property_id: String,
    pub object_id: String,
    pub values: Option<Vec<Value>>,
    /// Set on rows synthesized from depot states; never persisted
    pub is_generated: bool,
}

impl ProductPropertyState {
    pub fn new(
        product_id: impl Into<String>,
        property_id: impl Into<String>,
        object_id: impl Into<String>,
        values: Vec<Value>,
    ) -> Self {
        ProductPropertyState {
            product_id: product_id.into(),
            property_id: property_id.into(),
            object_id: muster_common::forced_host_id(&object_id.into()),
            values: Some(values),
            is_generated: false,
        }
    }
}

impl Entity for ProductPropertyState {
    const OBJECT_TYPE: &'static str = "ProductPropertyState";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["productId", "propertyId", "objectId"];
    const ATTRIBUTES: &'static [&'static str] =
        &["productId", "propertyId", "objectId", "values", "isGenerated"];

    fn ident(&self) -> Ident {
        Ident::new([
            self.product_id.clone(),
            self.property_id.clone(),
            self.object_id.clone(),
        ])
    }

    fn fill_defaults(&mut self) {
        if self.values.is_none() {
            self.values = Some(Vec::new());
        }
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.product_id).map_err(|e| {
            MusterError::bad_value(format!("product id '{}': {}", self.product_id, e.code))
        })?;
        validation::validate_object_id(&self.property_id).map_err(|e| {
            MusterError::bad_value(format!("property id '{}': {}", self.property_id, e.code))
        })?;
        Ok(())
    }

    fn is_generated(&self) -> bool {
        self.is_generated
    }
}
