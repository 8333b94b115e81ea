//! Groups and group memberships

use serde::{Deserialize, Serialize};

use muster_common::MusterError;

use crate::validation;

use super::{Entity, Ident};

/// Group kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupType {
    #[default]
    HostGroup,
    ProductGroup,
}

impl GroupType {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupType::HostGroup => "HostGroup",
            GroupType::ProductGroup => "ProductGroup",
        }
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named group of hosts or products, optionally nested
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Group {
    pub id: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub parent_group_id: Option<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, group_type: GroupType) -> Self {
        Group {
            id: id.into(),
            group_type,
            ..Default::default()
        }
    }
}

impl Entity for Group {
    const OBJECT_TYPE: &'static str = "Group";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["id"];
    const ATTRIBUTES: &'static [&'static str] =
        &["id", "type", "description", "notes", "parentGroupId"];

    fn ident(&self) -> Ident {
        Ident::new([self.id.clone()])
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.id)
            .map_err(|e| MusterError::bad_value(format!("group id '{}': {}", self.id, e.code)))?;
        if self.parent_group_id.as_deref() == Some(self.id.as_str()) {
            return Err(MusterError::bad_value(format!(
                "group '{}' cannot be its own parent",
                self.id
            )));
        }
        Ok(())
    }
}

/// Membership of one object in one group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectToGroup {
    pub group_type: GroupType,
    pub group_id: String,
    pub object_id: String,
}

impl ObjectToGroup {
    pub fn new(
        group_type: GroupType,
        group_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        ObjectToGroup {
            group_type,
            group_id: group_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl Entity for ObjectToGroup {
    const OBJECT_TYPE: &'static str = "ObjectToGroup";
    const IDENT_ATTRIBUTES: &'static [&'static str] = &["groupType", "groupId", "objectId"];
    const ATTRIBUTES: &'static [&'static str] = &["groupType", "groupId", "objectId"];

    fn ident(&self) -> Ident {
        Ident::new([
            self.group_type.to_string(),
            self.group_id.clone(),
            self.object_id.clone(),
        ])
    }

    fn validate(&self) -> Result<(), MusterError> {
        validation::validate_object_id(&self.group_id).map_err(|e| {
            MusterError::bad_value(format!("group id '{}': {}", self.group_id, e.code))
        })?;
        if self.object_id.is_empty() {
            return Err(MusterError::bad_value("object id must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_parent_is_rejected() {
        let mut group = Group::new("clients", GroupType::HostGroup);
        group.parent_group_id = Some("clients".to_string());
        assert!(group.validate().is_err());
    }

    #[test]
    fn test_membership_ident_includes_group_type() {
        let otg = ObjectToGroup::new(GroupType::HostGroup, "clients", "client1.example.org");
        assert_eq!(otg.ident().to_string(), "HostGroup;clients;client1.example.org");
    }
}
