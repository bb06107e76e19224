//! Per-viewer permission context.
//!
//! Built once from the viewer's roles and handed to the resolver, which never
//! mutates it.

use std::collections::BTreeSet;

use roster_common::Person;
use tracing::debug;
use uuid::Uuid;

use super::flags::RolePermissions;
use crate::groups::{GroupTree, RoleRegistry, TreeError};
use crate::people::Role;

/// What a viewer may read, resolved down to group and layer ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: Uuid,

    /// Bypasses every check.
    pub is_root: bool,

    /// Opens the contact-data branches. Set by the person's own flag or by an
    /// active role granting `CONTACT_DATA`.
    pub contact_data_visible: bool,

    /// Groups the viewer reads directly.
    pub groups_group_read: BTreeSet<Uuid>,

    /// Layer groups the viewer reads, with everything beneath them.
    pub layers_read: BTreeSet<Uuid>,
}

impl UserContext {
    /// A context with no grants at all.
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Derive the grant sets from the person's roles.
    ///
    /// Revoked roles and roles in deleted groups grant nothing. Roles of
    /// other people are ignored. The stored person is never changed by a role.
    pub fn for_person<R: RoleRegistry>(
        person: &Person,
        roles: &[Role],
        tree: &GroupTree,
        registry: &R,
    ) -> Result<Self, TreeError> {
        let mut context = Self::new(person.id).with_contact_data_visible(person.contact_data_visible);

        for role in roles.iter().filter(|r| r.person_id == person.id) {
            let group = tree
                .find(role.group_id)
                .ok_or(TreeError::UnknownGroup(role.group_id))?;
            if role.is_deleted() || group.is_deleted() {
                continue;
            }

            let permissions = registry
                .role_permissions(&role.role_type)
                .ok_or_else(|| TreeError::UnknownRoleType(role.role_type.clone()))?;
            context.grant(group.id, permissions, tree)?;
        }

        debug!(
            user_id = %context.user_id,
            groups = context.groups_group_read.len(),
            layers = context.layers_read.len(),
            "Built user context"
        );
        Ok(context)
    }

    fn grant(
        &mut self,
        group_id: Uuid,
        permissions: RolePermissions,
        tree: &GroupTree,
    ) -> Result<(), TreeError> {
        if permissions.grants_group_read() {
            self.groups_group_read.insert(group_id);
        }
        if permissions.grants_layer_read() {
            self.layers_read.insert(tree.layer_group_of(group_id)?.id);
        }
        if permissions.grants_contact_data() {
            self.contact_data_visible = true;
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    #[must_use]
    pub const fn with_contact_data_visible(mut self, visible: bool) -> Self {
        self.contact_data_visible = visible;
        self
    }

    #[must_use]
    pub fn with_group_read(mut self, group_id: Uuid) -> Self {
        self.groups_group_read.insert(group_id);
        self
    }

    #[must_use]
    pub fn with_layer_read(mut self, layer_id: Uuid) -> Self {
        self.layers_read.insert(layer_id);
        self
    }
}
