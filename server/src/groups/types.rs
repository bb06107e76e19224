//! Group and role type table.
//!
//! Which group types exist, which of them are layers, what may be nested
//! below what, and which role types each group type offers. The table is plain
//! data, loaded from JSON at startup or assembled in code.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::TreeError;
use crate::permissions::RolePermissions;

/// Read-only view of the role type table used by the visibility resolver.
pub trait RoleRegistry {
    /// Whether roles of this type are disclosed to viewers reading a layer above.
    fn is_role_visible_from_above(&self, role_type: &str) -> bool;

    /// Whether a group of `group_type` may hold roles of `role_type`.
    fn group_type_allows_role(&self, group_type: &str, role_type: &str) -> bool;

    /// All role types flagged visible from above, in table order.
    fn visible_from_above_role_types(&self) -> Vec<String>;

    /// Permissions granted by a role type, `None` for unknown types.
    fn role_permissions(&self, role_type: &str) -> Option<RolePermissions>;
}

/// Type table loading errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read type table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse type table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid type table: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTypeDef {
    pub name: String,
    /// Whether groups of this type are layers.
    #[serde(default)]
    pub layer: bool,
    /// Child group types, in display order.
    #[serde(default)]
    pub children: Vec<String>,
    /// Child groups created together with a group of this type.
    #[serde(default)]
    pub default_children: Vec<String>,
    /// Role types available in groups of this type.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl GroupTypeDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer: false,
            children: Vec::new(),
            default_children: Vec::new(),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn layer(name: impl Into<String>) -> Self {
        Self {
            layer: true,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn children<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children.extend(types.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn default_children<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_children
            .extend(types.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn roles<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(types.into_iter().map(Into::into));
        self
    }
}

const fn default_visible_from_above() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTypeDef {
    pub name: String,
    /// Whether viewers reading a layer above the role's group may see holders.
    #[serde(default = "default_visible_from_above")]
    pub visible_from_above: bool,
    #[serde(default)]
    pub permissions: RolePermissions,
}

impl RoleTypeDef {
    #[must_use]
    pub fn new(name: impl Into<String>, permissions: RolePermissions) -> Self {
        Self {
            name: name.into(),
            visible_from_above: true,
            permissions,
        }
    }

    #[must_use]
    pub const fn hidden_from_above(mut self) -> Self {
        self.visible_from_above = false;
        self
    }
}

/// The full type table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    /// Group types allowed at the root of the tree.
    pub root_types: Vec<String>,
    pub group_types: Vec<GroupTypeDef>,
    pub role_types: Vec<RoleTypeDef>,
}

impl TypeRegistry {
    /// Parse and validate a JSON type table.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let registry: Self = serde_json::from_str(json)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Read, parse and validate a JSON type table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn with_root(mut self, name: impl Into<String>) -> Self {
        self.root_types.push(name.into());
        self
    }

    #[must_use]
    pub fn with_group_type(mut self, group_type: GroupTypeDef) -> Self {
        self.group_types.push(group_type);
        self
    }

    #[must_use]
    pub fn with_role_type(mut self, role_type: RoleTypeDef) -> Self {
        self.role_types.push(role_type);
        self
    }

    /// Check that every referenced type exists and every root type is a layer.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut group_names = HashSet::new();
        for group_type in &self.group_types {
            if !group_names.insert(group_type.name.as_str()) {
                return Err(RegistryError::Invalid(format!(
                    "group type {} is defined twice",
                    group_type.name
                )));
            }
        }

        let mut role_names = HashSet::new();
        for role_type in &self.role_types {
            if !role_names.insert(role_type.name.as_str()) {
                return Err(RegistryError::Invalid(format!(
                    "role type {} is defined twice",
                    role_type.name
                )));
            }
        }

        if self.root_types.is_empty() {
            return Err(RegistryError::Invalid("no root group type".into()));
        }

        for root in &self.root_types {
            match self.group_type(root) {
                None => {
                    return Err(RegistryError::Invalid(format!(
                        "root type {root} is not defined"
                    )))
                }
                Some(def) if !def.layer => {
                    return Err(RegistryError::Invalid(format!(
                        "root type {root} must be a layer"
                    )))
                }
                Some(_) => {}
            }
        }

        for group_type in &self.group_types {
            for child in group_type.children.iter().chain(&group_type.default_children) {
                if !group_names.contains(child.as_str()) {
                    return Err(RegistryError::Invalid(format!(
                        "group type {} references unknown child type {child}",
                        group_type.name
                    )));
                }
            }
            for child in &group_type.default_children {
                if !group_type.children.contains(child) {
                    return Err(RegistryError::Invalid(format!(
                        "default child {child} of {} is not a possible child",
                        group_type.name
                    )));
                }
            }
            for role in &group_type.roles {
                if !role_names.contains(role.as_str()) {
                    return Err(RegistryError::Invalid(format!(
                        "group type {} references unknown role type {role}",
                        group_type.name
                    )));
                }
            }
        }

        let mut finished = HashSet::new();
        for group_type in &self.group_types {
            self.check_default_children(&group_type.name, &mut Vec::new(), &mut finished)?;
        }

        Ok(())
    }

    /// Depth-first walk over `default_children`; creating a group must terminate.
    fn check_default_children<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        finished: &mut HashSet<&'a str>,
    ) -> Result<(), RegistryError> {
        if finished.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            path.push(name);
            return Err(RegistryError::Invalid(format!(
                "default children form a cycle: {}",
                path.join(" > ")
            )));
        }
        let Some(def) = self.group_type(name) else {
            return Ok(());
        };

        path.push(name);
        for child in &def.default_children {
            self.check_default_children(child, path, finished)?;
        }
        path.pop();
        finished.insert(name);
        Ok(())
    }

    #[must_use]
    pub fn group_type(&self, name: &str) -> Option<&GroupTypeDef> {
        self.group_types.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn role_type(&self, name: &str) -> Option<&RoleTypeDef> {
        self.role_types.iter().find(|t| t.name == name)
    }

    /// Look up a group type, failing for unknown names.
    pub fn find_group_type(&self, name: &str) -> Result<&GroupTypeDef, TreeError> {
        self.group_type(name)
            .ok_or_else(|| TreeError::UnknownGroupType(name.to_string()))
    }

    /// Look up a role type offered by the given group type.
    pub fn find_role_type(
        &self,
        group_type: &str,
        role_type: &str,
    ) -> Result<&RoleTypeDef, TreeError> {
        let group_def = self.find_group_type(group_type)?;
        if !group_def.roles.iter().any(|r| r == role_type) {
            return Err(TreeError::UnknownRoleType(role_type.to_string()));
        }
        self.role_type(role_type)
            .ok_or_else(|| TreeError::UnknownRoleType(role_type.to_string()))
    }

    pub fn is_layer(&self, group_type: &str) -> Result<bool, TreeError> {
        Ok(self.find_group_type(group_type)?.layer)
    }

    /// All group types reachable from the root types, depth first.
    ///
    /// A type reachable along several paths is listed once, at the position of
    /// its last occurrence.
    #[must_use]
    pub fn all_types(&self) -> Vec<&GroupTypeDef> {
        let mut all = Vec::new();
        let roots: Vec<&str> = self.root_types.iter().map(String::as_str).collect();
        self.collect_types(&mut all, &roots);
        all
    }

    /// The given type and every type that may appear beneath it.
    #[must_use]
    pub fn child_types(&self, name: &str) -> Vec<&GroupTypeDef> {
        let mut all = Vec::new();
        self.collect_types(&mut all, &[name]);
        all
    }

    fn collect_types<'a>(&'a self, all: &mut Vec<&'a GroupTypeDef>, names: &[&str]) {
        for name in names {
            let Some(def) = self.group_type(name) else {
                continue;
            };
            let previous = all.iter().position(|t| t.name == def.name);
            if let Some(index) = previous {
                all.remove(index);
            }
            all.push(def);
            if previous.is_none() {
                let children: Vec<&str> = def.children.iter().map(String::as_str).collect();
                self.collect_types(all, &children);
            }
        }
    }
}

impl RoleRegistry for TypeRegistry {
    fn is_role_visible_from_above(&self, role_type: &str) -> bool {
        self.role_type(role_type)
            .is_some_and(|def| def.visible_from_above)
    }

    fn group_type_allows_role(&self, group_type: &str, role_type: &str) -> bool {
        self.find_role_type(group_type, role_type).is_ok()
    }

    fn visible_from_above_role_types(&self) -> Vec<String> {
        self.role_types
            .iter()
            .filter(|def| def.visible_from_above)
            .map(|def| def.name.clone())
            .collect()
    }

    fn role_permissions(&self, role_type: &str) -> Option<RolePermissions> {
        self.role_type(role_type).map(|def| def.permissions)
    }
}
